//! Per-frame transport metadata

use std::fmt;
use std::net::SocketAddr;
use std::time::Instant;

/// Socket protocol a frame arrived on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Protocol {
    Tcp,
    Udp,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::Tcp => f.write_str("tcp"),
            Protocol::Udp => f.write_str("udp"),
        }
    }
}

/// Where and when a frame was received
///
/// Addresses are optional because in-memory streams have none.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportMetadata {
    pub local: Option<SocketAddr>,
    pub peer: Option<SocketAddr>,
    pub protocol: Protocol,
    pub received_at: Instant,
}

impl TransportMetadata {
    /// Metadata stamped with the current instant
    pub fn now(local: Option<SocketAddr>, peer: Option<SocketAddr>, protocol: Protocol) -> Self {
        Self {
            local,
            peer,
            protocol,
            received_at: Instant::now(),
        }
    }
}
