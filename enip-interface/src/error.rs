//! Error types for the object models

pub use enip_core::error::{EnipError, EnipResult};
