//! Client → server frames.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::{FrameError, Result};

/// Frames sent to the server.
///
/// Serialized as a flat JSON object with the variant name in `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundFrame {
    /// Handshake, sent as soon as the transport reports ready.
    Connect(Connect),
    /// One operator-submitted line.
    Message(Message),
    /// Local command forwarded to the server.
    Command(Command),
    /// Keepalive, answered with `pong`.
    Ping,
}

impl OutboundFrame {
    /// Serialize to JSON text.
    pub fn encode(&self) -> Result<String> {
        serde_json::to_string(self).map_err(FrameError::Encode)
    }

    /// The frame's `type` tag.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Connect(_) => "connect",
            Self::Message(_) => "message",
            Self::Command(_) => "command",
            Self::Ping => "ping",
        }
    }
}

/// `connect` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connect {
    /// Client name.
    pub client: String,
    /// Client version.
    pub version: String,
    /// Domain this client talks to.
    pub domain: String,
    /// Client capability flags.
    pub capabilities: Vec<String>,
}

/// `message` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Client-generated message ID.
    pub id: String,
    /// Target domain.
    pub domain: String,
    /// Message text.
    pub text: String,
    /// Client-owned conversation thread.
    #[serde(rename = "chatId")]
    pub chat_id: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp: u64,
}

/// `command` payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    /// Client-generated command ID.
    pub id: String,
    /// Target domain.
    pub domain: String,
    /// Command name, e.g. `new_thread` or `monitor`.
    pub command: String,
    /// Command arguments.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<Value>,
}
