//! Error re-exports for the codec crate

pub use enip_core::{EnipError, EnipResult};
