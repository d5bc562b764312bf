//! Connection trait and lifecycle state
//!
//! A connection moves through the layers bottom-up when opened:
//! TCP stream, encapsulation session, then (for connected messaging) the
//! CIP connection made by forward open. Closing tears everything down in
//! one step.

use bytes::Bytes;
use enip_cip::{CipReply, ServiceCode};
use enip_codec::EPath;
use enip_core::EnipResult;

/// Explicit messaging operations of an EtherNet/IP client connection
#[async_trait::async_trait]
pub trait Connection: Send + Sync {
    /// Open the TCP stream, register the session and, in connected mode,
    /// forward open the CIP connection
    ///
    /// Opening an open connection is a no-op.
    async fn open(&mut self) -> EnipResult<()>;

    /// Unregister the session and release the stream
    async fn close(&mut self) -> EnipResult<()>;

    fn is_open(&self) -> bool;

    /// Send `service` with request data `data` to the object at `path` and
    /// wait for the reply
    ///
    /// A nonzero general status is reported inside the reply.
    async fn request(&self, service: ServiceCode, path: &EPath, data: Bytes) -> EnipResult<CipReply>;

    /// Get_Attribute_Single
    async fn get_attribute_single(&self, class: u8, instance: u8, attribute: u8)
        -> EnipResult<CipReply>;

    /// Get_Attributes_All
    async fn get_attribute_all(&self, class: u8, instance: u8) -> EnipResult<CipReply>;
}

/// Connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Nothing open (initial state)
    Closed,
    /// TCP stream up, session worker running, no session handle yet
    TransportOpen,
    /// Session registered; forward open pending in connected mode
    SessionOpen,
    /// Explicit messages can be sent
    Ready,
}

impl ConnectionState {
    pub fn is_ready(&self) -> bool {
        matches!(self, ConnectionState::Ready)
    }

    pub fn can_close(&self) -> bool {
        !matches!(self, ConnectionState::Closed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_predicates() {
        assert!(!ConnectionState::Closed.can_close());
        assert!(ConnectionState::TransportOpen.can_close());
        assert!(!ConnectionState::SessionOpen.is_ready());
        assert!(ConnectionState::Ready.is_ready());
    }
}
