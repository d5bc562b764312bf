use std::time::Duration;
use thiserror::Error;

/// Main error type for EtherNet/IP and CIP operations
#[derive(Error, Debug)]
pub enum EnipError {
    #[error("Connection error: {0}")]
    Connection(#[from] std::io::Error),

    /// Malformed or truncated frame
    #[error("Format error: {0}")]
    Format(String),

    /// Nonzero general status in a Message-Router response
    #[error("CIP service 0x{service:02X} failed with general status 0x{general_status:02X} (additional: {additional_status:04X?})")]
    ProtocolStatus {
        service: u8,
        general_status: u8,
        additional_status: Vec<u16>,
    },

    #[error("No RegisterSession reply within {0:?}")]
    RegistrationTimeout(Duration),

    #[error("RegisterSession rejected with encapsulation status 0x{0:08X}")]
    RegistrationRejected(u32),

    /// Explicit traffic attempted before a session handle was assigned
    #[error("No session registered")]
    NotRegistered,

    #[error("Forward open failed: {0}")]
    HandshakeFailure(String),

    /// The session ended (unregistered, timed out or faulted) while an
    /// operation was pending on it
    #[error("Session closed: {0}")]
    SessionClosed(String),

    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    #[error("Invalid data: {0}")]
    InvalidData(String),
}

impl EnipError {
    /// Whether the error terminates the owning session
    pub fn is_session_fatal(&self) -> bool {
        matches!(
            self,
            EnipError::Connection(_)
                | EnipError::RegistrationTimeout(_)
                | EnipError::RegistrationRejected(_)
                | EnipError::SessionClosed(_)
        )
    }
}

/// Result type alias for EtherNet/IP operations
pub type EnipResult<T> = Result<T, EnipError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_fatal_classification() {
        assert!(EnipError::SessionClosed("worker stopped".to_string()).is_session_fatal());
        assert!(EnipError::RegistrationTimeout(Duration::from_secs(5)).is_session_fatal());
        assert!(!EnipError::Timeout(Duration::from_millis(10)).is_session_fatal());
        assert!(!EnipError::Format("short".to_string()).is_session_fatal());
    }

    #[test]
    fn test_protocol_status_display() {
        let err = EnipError::ProtocolStatus {
            service: 0x8E,
            general_status: 0x14,
            additional_status: vec![],
        };
        let text = err.to_string();
        assert!(text.contains("0x8E"));
        assert!(text.contains("0x14"));
    }
}
