//! Encapsulation transport abstraction
//!
//! Explicit messaging only needs to send a payload and get a waiter for the
//! reply. Putting that behind a trait lets the CIP layer run over the
//! session [`Originator`] or over a scripted stand-in in tests.

use crate::correlator::PendingReply;
use crate::error::EnipResult;
use crate::originator::Originator;
use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;

/// Sends encapsulated explicit messages and hands back reply waiters
#[async_trait]
pub trait EncapsulationTransport: Send + Sync {
    /// Allocate a response identifier for an unconnected request
    fn next_response_id(&self) -> u64;

    /// Send `data`, connected when `send_id` is given, and register a waiter
    /// under `receive_id` when one is given
    async fn send_encap(
        &self,
        data: Bytes,
        send_id: Option<u32>,
        receive_id: Option<u64>,
    ) -> EnipResult<Option<PendingReply>>;
}

#[async_trait]
impl EncapsulationTransport for Originator {
    fn next_response_id(&self) -> u64 {
        Originator::next_response_id(self)
    }

    async fn send_encap(
        &self,
        data: Bytes,
        send_id: Option<u32>,
        receive_id: Option<u64>,
    ) -> EnipResult<Option<PendingReply>> {
        Originator::send_encap(self, data, send_id, receive_id).await
    }
}

#[async_trait]
impl<T: EncapsulationTransport + ?Sized> EncapsulationTransport for Arc<T> {
    fn next_response_id(&self) -> u64 {
        (**self).next_response_id()
    }

    async fn send_encap(
        &self,
        data: Bytes,
        send_id: Option<u32>,
        receive_id: Option<u64>,
    ) -> EnipResult<Option<PendingReply>> {
        (**self).send_encap(data, send_id, receive_id).await
    }
}
