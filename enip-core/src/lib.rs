//! Core types and utilities for the EtherNet/IP client stack
//!
//! This crate provides the error taxonomy shared by every layer of the
//! implementation (codec, transport, session, CIP, client).

pub mod error;

pub use error::{EnipError, EnipResult};
