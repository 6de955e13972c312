//! Error types for the tether core.
//!
//! Connection errors describe why a connection attempt did not become
//! session-ready. None of them are fatal to the supervisor: it converts them
//! into a scheduled retry unless it has been stopped.

use std::time::Duration;

use thiserror::Error;

use crate::{gate::CompletionError, supervisor::SupervisorState};

/// Errors settling a connection attempt or rejecting a supervisor input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConnectionError {
    /// Input is not valid in the current state
    #[error("invalid state transition: cannot {operation} from {state:?}")]
    InvalidState {
        /// Current state when error occurred
        state: SupervisorState,
        /// Operation that was attempted
        operation: &'static str,
    },

    /// Transport closed or failed before the server acknowledged the session
    #[error("connection closed before acknowledgment: {reason}")]
    ClosedBeforeAck {
        /// Reason reported by the transport
        reason: String,
    },

    /// The supervisor has been stopped
    #[error("supervisor is shutting down")]
    ShuttingDown,

    /// A manual reconnect replaced this attempt
    #[error("attempt superseded by a manual reconnect")]
    Superseded,

    /// The attempt was dropped without being settled
    #[error("connection attempt abandoned")]
    Abandoned,
}

impl ConnectionError {
    /// Returns true if a later attempt may succeed.
    ///
    /// Shutdown and state errors are never transient: retrying them
    /// reproduces the same rejection.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::ClosedBeforeAck { .. } | Self::Superseded)
    }
}

impl From<CompletionError> for ConnectionError {
    fn from(err: CompletionError) -> Self {
        match err {
            CompletionError::Abandoned => Self::Abandoned,
        }
    }
}

/// Invalid configuration values.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Initial backoff delay rounds to zero milliseconds
    #[error("initial delay must be at least 1ms")]
    ZeroInitialDelay,

    /// Backoff multiplier does not grow
    #[error("backoff multiplier must be greater than 1, got {0}")]
    MultiplierTooSmall(f64),

    /// Cap is below the first delay
    #[error("max delay {max:?} is below initial delay {initial:?}")]
    MaxBelowInitial {
        /// Configured initial delay
        initial: Duration,
        /// Configured cap
        max: Duration,
    },
}
