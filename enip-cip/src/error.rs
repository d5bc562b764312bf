//! Error types for the CIP layer

pub use enip_core::error::{EnipError, EnipResult};
