//! Error re-exports for the transport crate

pub use enip_core::{EnipError, EnipResult};
