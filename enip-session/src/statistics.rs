//! Session statistics

/// Counters maintained by the session worker
///
/// Tracks traffic and error counts for monitoring a session and for
/// diagnosing a misbehaving target.
///
/// # Usage
/// Only the worker updates the counters. A snapshot can be read at any time
/// through the originator; reading never blocks the worker for longer than
/// one clone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionStatistics {
    /// Encapsulated frames written to the stream
    pub frames_sent: u64,
    /// Encapsulated frames decoded from the stream
    pub frames_received: u64,
    /// NOP keep-alives sent
    pub keep_alives_sent: u64,
    /// Frames or datagrams that failed to decode
    pub format_errors: u64,
    /// Frames with a command this client does not handle
    pub unsupported_commands: u64,
    /// Correlated frames nobody was waiting for
    pub unmatched_replies: u64,
    /// Datagrams written to the UDP sockets
    pub datagrams_sent: u64,
    /// Datagrams read from the UDP sockets
    pub datagrams_received: u64,
    /// Datagrams dropped (too short, not sequenced, or no socket to send on)
    pub datagrams_dropped: u64,
}

impl SessionStatistics {
    /// Create statistics with every counter at zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset every counter to zero
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Increment frames sent counter
    pub fn increment_frames_sent(&mut self) {
        self.frames_sent += 1;
    }

    /// Increment frames received counter
    pub fn increment_frames_received(&mut self) {
        self.frames_received += 1;
    }

    /// Increment keep-alive counter; the NOP also counts as a sent frame
    pub fn increment_keep_alives_sent(&mut self) {
        self.keep_alives_sent += 1;
    }

    /// Increment format error counter
    pub fn increment_format_errors(&mut self) {
        self.format_errors += 1;
    }

    /// Increment unsupported command counter
    pub fn increment_unsupported_commands(&mut self) {
        self.unsupported_commands += 1;
    }

    /// Increment unmatched reply counter
    pub fn increment_unmatched_replies(&mut self) {
        self.unmatched_replies += 1;
    }

    /// Increment datagrams sent counter
    pub fn increment_datagrams_sent(&mut self) {
        self.datagrams_sent += 1;
    }

    /// Increment datagrams received counter
    pub fn increment_datagrams_received(&mut self) {
        self.datagrams_received += 1;
    }

    /// Increment dropped datagram counter
    pub fn increment_datagrams_dropped(&mut self) {
        self.datagrams_dropped += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clear() {
        let mut stats = SessionStatistics::new();
        stats.increment_frames_sent();
        stats.increment_keep_alives_sent();
        assert_eq!(stats.frames_sent, 1);
        stats.clear();
        assert_eq!(stats, SessionStatistics::default());
    }
}
