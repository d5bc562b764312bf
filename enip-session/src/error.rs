//! Error types for the session layer

pub use enip_core::error::{EnipError, EnipResult};
