//! Observable application state types.
//!
//! [`Session`] is the conversation the operator is having with the agent and
//! outlives any single connection. [`ConnectionState`] is the app's view of
//! the link, fed by supervisor events.

use std::time::Duration;

/// Connection state as seen by the app.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    /// Nothing attempted yet.
    Idle,
    /// Attempt in progress.
    Connecting {
        /// Attempt being opened
        attempt: u64,
    },
    /// Session acknowledged by the server.
    Connected {
        /// Acknowledged attempt
        attempt: u64,
    },
    /// Connection lost, retry scheduled.
    Reconnecting {
        /// Close or failure reason
        reason: String,
        /// Retry count since the last acknowledgment
        retry: u32,
        /// Delay the retry was scheduled with
        retry_in: Duration,
    },
}

impl ConnectionState {
    /// Whether frames can be sent.
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected { .. })
    }
}

/// Conversation state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// Client-owned conversation thread. Survives reconnects; `/new` replaces
    /// it.
    pub thread_id: String,
    /// Server-owned session identifier. `None` until acknowledged, cleared on
    /// disconnect.
    pub session_id: Option<String>,
    /// Number of `connected` acknowledgments seen.
    pub connects: u64,
    /// A message was sent and no reply has arrived yet.
    pub pending: bool,
    /// Echo every inbound frame as a diagnostic line.
    pub monitor: bool,
}

impl Session {
    /// Fresh session on the given thread.
    pub fn new(thread_id: String, monitor: bool) -> Self {
        Self { thread_id, session_id: None, connects: 0, pending: false, monitor }
    }

    /// Switch to a new thread, dropping any pending request.
    pub fn new_thread(&mut self, thread_id: String) {
        self.thread_id = thread_id;
        self.pending = false;
    }

    /// Whether a `connected` frame has been seen before the current one.
    pub fn is_reconnect(&self) -> bool {
        self.connects > 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_thread_clears_pending() {
        let mut session = Session::new("t1".into(), false);
        session.pending = true;

        session.new_thread("t2".into());
        assert_eq!(session.thread_id, "t2");
        assert!(!session.pending);
    }

    #[test]
    fn only_connected_state_can_send() {
        assert!(ConnectionState::Connected { attempt: 1 }.is_connected());
        assert!(!ConnectionState::Connecting { attempt: 1 }.is_connected());
        assert!(!ConnectionState::Idle.is_connected());
    }
}
