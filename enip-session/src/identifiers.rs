//! Response identifier allocation
//!
//! Two sender-context values are reserved: [`INTERNAL_CONTEXT`] for session
//! control traffic and [`IGNORING_CONTEXT`] for requests whose reply nobody
//! waits for. Allocated identifiers start above both and wrap back to
//! [`FIRST_RESPONSE_ID`] after the configured ceiling.
//!
//! Connected replies are not keyed by the bare T->O connection id: several
//! requests can be in flight on one connection, so the key also carries the
//! sequence count the reply echoes (see [`connected_response_id`]).

use std::sync::Mutex;

/// Sender context of session control frames (RegisterSession)
pub const INTERNAL_CONTEXT: u64 = 0;

/// Sender context of requests sent without a waiter
pub const IGNORING_CONTEXT: u64 = 1;

/// First identifier handed out
pub const FIRST_RESPONSE_ID: u64 = 2;

/// Response id of a connected explicit reply
///
/// The T->O connection id fills the upper bits and the echoed sequence
/// count the low 16, so each request on a connection has its own key.
pub fn connected_response_id(connection_id: u32, sequence_count: u16) -> u64 {
    (u64::from(connection_id) << 16) | u64::from(sequence_count)
}

/// Wrapping allocator of response identifiers
#[derive(Debug)]
pub struct ResponseIdAllocator {
    next: Mutex<u64>,
    ceiling: u64,
}

impl ResponseIdAllocator {
    /// Allocator wrapping after `ceiling` (values below the first id are raised to it)
    pub fn new(ceiling: u64) -> Self {
        Self {
            next: Mutex::new(FIRST_RESPONSE_ID),
            ceiling: ceiling.max(FIRST_RESPONSE_ID),
        }
    }

    /// Next identifier in sequence
    pub fn allocate(&self) -> u64 {
        self.allocate_free(|_| false)
    }

    /// Next identifier for which `in_use` is false
    ///
    /// Gives up after one full cycle and returns the next value regardless.
    pub fn allocate_free(&self, in_use: impl Fn(u64) -> bool) -> u64 {
        let mut next = self.next.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let window = self.ceiling - FIRST_RESPONSE_ID + 1;
        let mut candidate = *next;
        for _ in 0..window {
            candidate = *next;
            *next = if candidate >= self.ceiling {
                FIRST_RESPONSE_ID
            } else {
                candidate + 1
            };
            if !in_use(candidate) {
                break;
            }
        }
        candidate
    }

    pub fn ceiling(&self) -> u64 {
        self.ceiling
    }
}
