//! EtherNet/IP explicit messaging client
//!
//! Connects to a target, registers an encapsulation session and exchanges
//! CIP explicit messages, unconnected or over a forward-opened connection.
//!
//! - [x] Connection builder
//! - [x] Connection lifecycle (open, close, state)
//! - [x] Unconnected and connected explicit messaging
//! - [x] Get_Attribute_Single / Get_Attributes_All
//! - [x] Device Level Ring object read
//! - [x] Implicit I/O datagram socket
//! - [ ] Forward close on `close()` (connections currently time out on the target)

pub mod connection;

pub use connection::{
    CipClient, ClientBuilder, ClientConfig, Connection, ConnectionState, MessagingMode,
};
pub use enip_core::{EnipError, EnipResult};
