//! CIP explicit messaging for the EtherNet/IP client stack
//!
//! - [`MessageRouterRequest`] / [`MessageRouterResponse`]: Message Router
//!   request and response shapes (connected and unconnected)
//! - [`CipMessenger`]: explicit messages over an
//!   [`EncapsulationTransport`](enip_session::EncapsulationTransport),
//!   with `get_attribute_single` / `get_attribute_all` helpers
//! - [`forward_open`]: Connection Manager handshake producing a [`CipConnection`]

pub mod connection;
pub mod error;
pub mod explicit;
pub mod forward_open;
pub mod message_router;
pub mod service;

pub use connection::{CipConnection, SequenceSlot};
pub use error::{EnipError, EnipResult};
pub use explicit::{CipMessenger, CipReply, MessengerConfig};
pub use forward_open::{forward_open, ForwardOpenParams, ForwardOpenReply, ForwardOpenRequest};
pub use message_router::{MessageRouterRequest, MessageRouterResponse};
pub use service::{general_status, ServiceCode, REPLY_FLAG};
