//! Transport layer module for the EtherNet/IP client stack
//!
//! This crate establishes the sockets owned by the session worker:
//! a TCP stream for encapsulated explicit messaging and UDP datagram
//! sockets for implicit I/O.

pub mod error;
pub mod metadata;
pub mod tcp;
pub mod udp;

pub use error::{EnipError, EnipResult};
pub use metadata::{Protocol, TransportMetadata};
pub use tcp::{TcpSettings, TcpTransport, DEFAULT_EXPLICIT_PORT};
pub use udp::{UdpSettings, UdpTransport, DEFAULT_IO_PORT, MAX_UDP_PAYLOAD_SIZE};
