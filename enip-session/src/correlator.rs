//! Request/reply correlation
//!
//! Requesters register interest in a response identifier before their request
//! is sent; the worker publishes each correlated inbound frame to the oldest
//! live waiter on its identifier. Waiters on different identifiers never see
//! each other's frames.

use crate::error::{EnipError, EnipResult};
use crate::packet::TransportPacket;
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::oneshot;

#[derive(Debug, Default)]
struct Waiters {
    by_id: HashMap<u64, VecDeque<oneshot::Sender<TransportPacket>>>,
    closed: Option<String>,
}

/// Registry of outstanding replies keyed by response identifier
#[derive(Debug, Default)]
pub struct Correlator {
    inner: Mutex<Waiters>,
}

impl Correlator {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Waiters> {
        // a panic while holding the lock leaves the map consistent
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Register a waiter for `response_id`
    ///
    /// # Errors
    /// `SessionClosed` once the session has ended.
    pub fn register(&self, response_id: u64) -> EnipResult<PendingReply> {
        let mut waiters = self.lock();
        if let Some(reason) = &waiters.closed {
            return Err(EnipError::SessionClosed(reason.clone()));
        }
        let (sender, receiver) = oneshot::channel();
        let queue = waiters.by_id.entry(response_id).or_default();
        queue.retain(|waiter| !waiter.is_closed());
        queue.push_back(sender);
        Ok(PendingReply {
            response_id,
            receiver,
        })
    }

    /// Hand `packet` to the oldest live waiter on `response_id`
    ///
    /// # Returns
    /// `false` when nobody was waiting; the packet is dropped.
    pub fn publish(&self, response_id: u64, packet: TransportPacket) -> bool {
        let mut waiters = self.lock();
        let Some(queue) = waiters.by_id.get_mut(&response_id) else {
            return false;
        };
        let mut packet = packet;
        let delivered = loop {
            let Some(waiter) = queue.pop_front() else {
                break false;
            };
            // a waiter that timed out has dropped its receiver
            match waiter.send(packet) {
                Ok(()) => break true,
                Err(returned) => packet = returned,
            }
        };
        if queue.is_empty() {
            waiters.by_id.remove(&response_id);
        }
        delivered
    }

    /// Whether a live waiter exists for `response_id`
    pub fn is_pending(&self, response_id: u64) -> bool {
        self.lock()
            .by_id
            .get(&response_id)
            .is_some_and(|queue| queue.iter().any(|waiter| !waiter.is_closed()))
    }

    /// Number of live waiters across all identifiers
    pub fn pending_count(&self) -> usize {
        self.lock()
            .by_id
            .values()
            .flatten()
            .filter(|waiter| !waiter.is_closed())
            .count()
    }

    /// End the session: wake every waiter with `SessionClosed` and refuse new ones
    pub fn close(&self, reason: &str) {
        let mut waiters = self.lock();
        if waiters.closed.is_none() {
            waiters.closed = Some(reason.to_string());
        }
        // dropping the senders wakes the receivers
        waiters.by_id.clear();
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed.is_some()
    }
}

/// A registered interest in one reply
#[derive(Debug)]
pub struct PendingReply {
    response_id: u64,
    receiver: oneshot::Receiver<TransportPacket>,
}

impl PendingReply {
    /// Identifier the reply is expected under
    pub fn response_id(&self) -> u64 {
        self.response_id
    }

    /// Wait for the reply
    ///
    /// # Errors
    /// - `Timeout` if nothing arrives within `timeout`
    /// - `SessionClosed` if the session ends first
    pub async fn wait(self, timeout: Duration) -> EnipResult<TransportPacket> {
        match tokio::time::timeout(timeout, self.receiver).await {
            Ok(Ok(packet)) => Ok(packet),
            Ok(Err(_)) => Err(EnipError::SessionClosed(format!(
                "session ended while waiting for reply {}",
                self.response_id
            ))),
            Err(_) => Err(EnipError::Timeout(timeout)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use enip_transport::{Protocol, TransportMetadata};

    fn packet(response_id: u64, data: &'static [u8]) -> TransportPacket {
        TransportPacket {
            transport: TransportMetadata::now(None, None, Protocol::Tcp),
            header: None,
            command_specific: None,
            items: None,
            data: Bytes::from_static(data),
            response_id,
        }
    }

    #[tokio::test]
    async fn test_replies_in_reverse_order_reach_their_waiters() {
        let correlator = Correlator::new();
        let first = correlator.register(10).unwrap();
        let second = correlator.register(11).unwrap();

        assert!(correlator.publish(11, packet(11, b"second")));
        assert!(correlator.publish(10, packet(10, b"first")));

        let timeout = Duration::from_millis(100);
        assert_eq!(first.wait(timeout).await.unwrap().data.as_ref(), b"first");
        assert_eq!(second.wait(timeout).await.unwrap().data.as_ref(), b"second");
        assert_eq!(correlator.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_waiters_on_same_id_are_served_in_order() {
        let correlator = Correlator::new();
        let first = correlator.register(5).unwrap();
        let second = correlator.register(5).unwrap();

        correlator.publish(5, packet(5, b"a"));
        correlator.publish(5, packet(5, b"b"));

        let timeout = Duration::from_millis(100);
        assert_eq!(first.wait(timeout).await.unwrap().data.as_ref(), b"a");
        assert_eq!(second.wait(timeout).await.unwrap().data.as_ref(), b"b");
    }

    #[tokio::test]
    async fn test_unmatched_publish_is_dropped() {
        let correlator = Correlator::new();
        assert!(!correlator.publish(99, packet(99, b"stray")));
    }

    #[tokio::test]
    async fn test_timed_out_waiter_is_skipped() {
        let correlator = Correlator::new();
        let stale = correlator.register(3).unwrap();
        let result = stale.wait(Duration::from_millis(10)).await;
        assert!(matches!(result, Err(EnipError::Timeout(_))));
        assert!(!correlator.is_pending(3));

        let live = correlator.register(3).unwrap();
        assert!(correlator.publish(3, packet(3, b"late")));
        let reply = live.wait(Duration::from_millis(100)).await.unwrap();
        assert_eq!(reply.data.as_ref(), b"late");
    }

    #[tokio::test]
    async fn test_close_wakes_waiters() {
        let correlator = Correlator::new();
        let pending = correlator.register(4).unwrap();
        correlator.close("socket reset");

        let result = pending.wait(Duration::from_secs(5)).await;
        assert!(matches!(result, Err(EnipError::SessionClosed(_))));
        assert!(matches!(
            correlator.register(4),
            Err(EnipError::SessionClosed(reason)) if reason == "socket reset"
        ));
    }
}
