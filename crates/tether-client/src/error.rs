//! Client error types.

use tether_proto::FrameError;
use thiserror::Error;

/// Transport errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Connection could not be established
    #[error("connection failed: {0}")]
    Connection(String),

    /// Read or write on an established connection failed
    #[error("stream error: {0}")]
    Stream(String),

    /// The link's I/O task has already finished
    #[error("link closed")]
    Closed,
}

/// Errors sending a frame through the supervisor.
#[derive(Debug, Error)]
pub enum SendError {
    /// No session is open; the frame was dropped without touching the
    /// transport
    #[error("not connected")]
    NotConnected,

    /// Frame could not be serialized
    #[error(transparent)]
    Encode(#[from] FrameError),

    /// The live link went away between the state check and the write
    #[error("link closed while sending")]
    LinkClosed,
}

impl From<TransportError> for SendError {
    fn from(_: TransportError) -> Self {
        Self::LinkClosed
    }
}
