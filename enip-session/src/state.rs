//! Session lifecycle state
//!
//! ```text
//! Unregistered -> Registered (RegisterSession reply, status 0)
//! Unregistered -> Rejected   (RegisterSession reply, nonzero status)
//! any          -> Closed     (worker stopped)
//! ```
//! The worker publishes the state on a watch channel; the originator reads
//! the session handle from it and waits on it during registration.

/// Session state as seen by the worker
///
/// Transitions are checked with [`SessionState::can_transition_to`];
/// `Closed` is terminal and carries the reason the worker stopped.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    /// Connected, no handle assigned yet
    #[default]
    Unregistered,
    /// Handle assigned by the target
    Registered {
        /// Handle placed in every later header
        session_handle: u32,
    },
    /// The target answered RegisterSession with a nonzero status
    Rejected {
        /// Encapsulation status from the reply header
        status: u32,
    },
    /// Worker stopped; every socket is closed
    Closed {
        /// Why the worker stopped
        reason: String,
    },
}

impl SessionState {
    /// Assigned session handle, `None` unless registered
    pub fn session_handle(&self) -> Option<u32> {
        match self {
            SessionState::Registered { session_handle } => Some(*session_handle),
            _ => None,
        }
    }

    /// Whether the target has assigned a handle
    pub fn is_registered(&self) -> bool {
        matches!(self, SessionState::Registered { .. })
    }

    /// Whether the worker has stopped
    pub fn is_closed(&self) -> bool {
        matches!(self, SessionState::Closed { .. })
    }

    /// Whether a transition to `next` is allowed
    ///
    /// The handle is write-once: a registered session never returns to
    /// another registered or unregistered state.
    pub fn can_transition_to(&self, next: &SessionState) -> bool {
        match (self, next) {
            (SessionState::Closed { .. }, _) => false,
            (_, SessionState::Closed { .. }) => true,
            (SessionState::Unregistered, SessionState::Registered { .. })
            | (SessionState::Unregistered, SessionState::Rejected { .. }) => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_is_write_once() {
        let registered = SessionState::Registered {
            session_handle: 0x12345678,
        };
        assert!(SessionState::Unregistered.can_transition_to(&registered));
        assert!(!registered.can_transition_to(&SessionState::Registered { session_handle: 1 }));
        assert!(!registered.can_transition_to(&SessionState::Unregistered));
        assert_eq!(registered.session_handle(), Some(0x12345678));
    }

    #[test]
    fn test_closed_is_terminal() {
        let closed = SessionState::Closed {
            reason: "unregistered".to_string(),
        };
        assert!(SessionState::Rejected { status: 1 }.can_transition_to(&closed));
        assert!(!closed.can_transition_to(&SessionState::Unregistered));
        assert!(!closed.can_transition_to(&closed.clone()));
        assert_eq!(closed.session_handle(), None);
    }
}
