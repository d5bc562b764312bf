//! Bounded outbound frame queues
//!
//! Producers await a free slot when the queue is full; the worker is the
//! only consumer. Once the worker stops, enqueueing fails with
//! `SessionClosed` and frames still queued are discarded.

use crate::error::{EnipError, EnipResult};
use bytes::Bytes;
use tokio::sync::mpsc;

/// Create a queue holding at most `capacity` frames
///
/// `name` identifies the queue in the `SessionClosed` error.
pub fn outbound_queue(name: &'static str, capacity: usize) -> (OutboundQueue, OutboundReceiver) {
    let (sender, receiver) = mpsc::channel(capacity);
    (OutboundQueue { sender, name }, OutboundReceiver { receiver })
}

/// Producer half
///
/// Cloned into every task that sends on the session.
#[derive(Debug, Clone)]
pub struct OutboundQueue {
    sender: mpsc::Sender<Bytes>,
    name: &'static str,
}

impl OutboundQueue {
    /// Enqueue a frame, waiting while the queue is full
    ///
    /// # Errors
    /// `SessionClosed` once the worker has stopped.
    pub async fn enqueue(&self, frame: Bytes) -> EnipResult<()> {
        self.sender.send(frame).await.map_err(|_| self.closed())
    }

    /// Enqueue without waiting
    ///
    /// # Returns
    /// `false` if the queue is full
    ///
    /// # Errors
    /// `SessionClosed` once the worker has stopped.
    pub fn try_enqueue(&self, frame: Bytes) -> EnipResult<bool> {
        match self.sender.try_send(frame) {
            Ok(()) => Ok(true),
            Err(mpsc::error::TrySendError::Full(_)) => Ok(false),
            Err(mpsc::error::TrySendError::Closed(_)) => Err(self.closed()),
        }
    }

    /// Free slots
    pub fn available(&self) -> usize {
        self.sender.capacity()
    }

    /// Whether the worker has dropped the consumer half
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    fn closed(&self) -> EnipError {
        EnipError::SessionClosed(format!("{} queue closed, worker stopped", self.name))
    }
}

/// Consumer half, owned by the worker
#[derive(Debug)]
pub struct OutboundReceiver {
    receiver: mpsc::Receiver<Bytes>,
}

impl OutboundReceiver {
    /// Next frame in FIFO order; `None` once every producer is gone
    pub async fn recv(&mut self) -> Option<Bytes> {
        self.receiver.recv().await
    }

    /// Next frame if one is already queued
    pub fn try_recv(&mut self) -> Option<Bytes> {
        self.receiver.try_recv().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_pending, assert_ready, assert_ready_ok, task};

    #[tokio::test]
    async fn test_full_queue_blocks_producer() {
        let (queue, mut receiver) = outbound_queue("explicit", 2);
        queue.enqueue(Bytes::from_static(b"1")).await.unwrap();
        queue.enqueue(Bytes::from_static(b"2")).await.unwrap();
        assert_eq!(queue.available(), 0);
        assert!(!queue.try_enqueue(Bytes::from_static(b"x")).unwrap());

        let mut blocked = task::spawn(queue.enqueue(Bytes::from_static(b"3")));
        assert_pending!(blocked.poll());

        assert_eq!(receiver.recv().await.unwrap().as_ref(), b"1");
        assert!(blocked.is_woken());
        assert_ready_ok!(blocked.poll());

        assert_eq!(receiver.recv().await.unwrap().as_ref(), b"2");
        assert_eq!(receiver.recv().await.unwrap().as_ref(), b"3");
    }

    #[tokio::test]
    async fn test_enqueue_after_worker_gone() {
        let (queue, receiver) = outbound_queue("datagram", 4);
        drop(receiver);
        assert!(queue.is_closed());

        let mut send = task::spawn(queue.enqueue(Bytes::from_static(b"late")));
        let result = assert_ready!(send.poll());
        assert!(matches!(result, Err(EnipError::SessionClosed(_))));
    }
}
