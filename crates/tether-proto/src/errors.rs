//! Frame errors.
//!
//! A malformed frame is always recoverable: the caller drops it and keeps
//! processing the next one. None of these errors carry connection state.

use thiserror::Error;

/// Result alias for frame operations.
pub type Result<T> = std::result::Result<T, FrameError>;

/// Errors produced while decoding or encoding frames.
#[derive(Error, Debug)]
pub enum FrameError {
    /// Text was not valid JSON.
    #[error("invalid JSON: {0}")]
    Json(#[source] serde_json::Error),

    /// JSON value was not an object.
    #[error("frame is not a JSON object")]
    NotAnObject,

    /// Object had no string `type` field.
    #[error("frame has no string \"type\" field")]
    MissingType,

    /// Payload did not match the shape required by its tag.
    #[error("invalid {kind} payload: {source}")]
    Payload {
        /// Frame tag whose payload failed to decode.
        kind: String,
        /// Underlying decode error.
        #[source]
        source: serde_json::Error,
    },

    /// Frame could not be serialized.
    #[error("failed to encode frame: {0}")]
    Encode(#[source] serde_json::Error),
}

impl FrameError {
    /// Frame tag the error relates to, if it was read before failing.
    pub fn kind(&self) -> Option<&str> {
        match self {
            Self::Payload { kind, .. } => Some(kind),
            Self::Json(_) | Self::NotAnObject | Self::MissingType | Self::Encode(_) => None,
        }
    }
}
