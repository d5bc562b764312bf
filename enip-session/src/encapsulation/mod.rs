//! Encapsulation layer: the 24 byte header every TCP frame starts with, the
//! command-specific data that follows it, and builders for the frames the
//! originator sends.

pub mod command_specific;
pub mod frame;
pub mod header;

pub use command_specific::CommandSpecific;
pub use header::{Command, EncapsulationHeader, ENCAPSULATION_HEADER_LENGTH};
