//! Connection management module

pub mod builder;
pub mod client;
pub mod lifecycle;

pub use builder::{ClientBuilder, ClientConfig, MessagingMode};
pub use client::CipClient;
pub use lifecycle::{Connection, ConnectionState};
