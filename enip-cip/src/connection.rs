//! Connection-oriented channel established by forward open

use crate::forward_open::ForwardOpenReply;
use tokio::sync::{Mutex, MutexGuard};

/// First sequence count used on a new connection
pub const INITIAL_SEQUENCE_COUNT: u16 = 1;

/// An open CIP connection
///
/// The identifiers are the ones the target returned in its forward-open
/// reply, which supersede whatever was requested.
///
/// Sequence counts are handed out through [`SequenceSlot`]: only one slot
/// exists at a time, so messages leave in sequence order, and a count is
/// only used up once its message has been queued.
#[derive(Debug)]
pub struct CipConnection {
    reply: ForwardOpenReply,
    sequence: Mutex<u16>,
}

/// Exclusive hold on the next sequence count of a connection
///
/// Dropping the slot without [`SequenceSlot::commit`] leaves the count
/// unused for the next message.
#[derive(Debug)]
pub struct SequenceSlot<'a> {
    next: MutexGuard<'a, u16>,
}

impl SequenceSlot<'_> {
    /// Sequence count to put on the message
    pub fn count(&self) -> u16 {
        *self.next
    }

    /// Mark the count used; wraps at 16 bits
    pub fn commit(mut self) {
        *self.next = self.next.wrapping_add(1);
    }
}

impl CipConnection {
    pub fn new(reply: ForwardOpenReply) -> Self {
        Self {
            reply,
            sequence: Mutex::new(INITIAL_SEQUENCE_COUNT),
        }
    }

    /// Originator to target connection id (connected address of outbound messages)
    pub fn ot_connection_id(&self) -> u32 {
        self.reply.ot_connection_id
    }

    /// Target to originator connection id (connected address of replies)
    pub fn to_connection_id(&self) -> u32 {
        self.reply.to_connection_id
    }

    pub fn connection_serial(&self) -> u16 {
        self.reply.connection_serial
    }

    /// Full forward-open reply
    pub fn forward_open_reply(&self) -> &ForwardOpenReply {
        &self.reply
    }

    /// Wait for exclusive use of the next sequence count
    ///
    /// Hold the slot until the message carrying the count is queued, then
    /// commit it.
    pub async fn reserve_sequence(&self) -> SequenceSlot<'_> {
        SequenceSlot {
            next: self.sequence.lock().await,
        }
    }
}
