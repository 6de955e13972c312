//! Application input events.
//!
//! This module defines [`AppEvent`], the inputs that drive the
//! [`crate::App`] state machine.
//!
//! Events originate from two sources:
//! - The operator: submitted lines, interrupt, end of input.
//! - The connection supervisor: lifecycle changes and inbound frames.

use std::time::Duration;

/// Events processed by the App state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    /// Operator submitted a line.
    Line(String),

    /// Operator pressed Ctrl-C.
    Interrupt,

    /// Operator input ended (Ctrl-D or stdin EOF).
    InputClosed,

    /// Connection attempt in progress.
    Connecting {
        /// Attempt being opened
        attempt: u64,
    },

    /// Server acknowledged the session.
    Connected {
        /// Acknowledged attempt
        attempt: u64,
    },

    /// Connection lost, retry scheduled.
    Disconnected {
        /// Close or failure reason
        reason: String,
        /// Delay until the retry
        retry_in: Duration,
        /// Retry count since the last acknowledgment
        retry: u32,
    },

    /// Raw frame from the live session.
    Frame(String),

    /// A [`crate::AppAction::Send`] was refused because no session is open.
    SendRejected {
        /// Why the frame was not sent
        reason: String,
    },
}
