//! Server → client frames.
//!
//! Decoding reads the `type` tag before anything else, then decodes the payload
//! registered for that tag. The payload structs ignore fields they do not
//! know, so servers can add fields without breaking older clients.

use std::fmt;

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;

use crate::errors::{FrameError, Result};

/// Tag of the session acknowledgment frame.
pub const TAG_CONNECTED: &str = "connected";
/// Tag of a conversational reply.
pub const TAG_RESPONSE: &str = "response";
/// Tag of an incremental progress update.
pub const TAG_AGENT_PROGRESS: &str = "agent_progress";
/// Tag of a terminal agent reply.
pub const TAG_SEND: &str = "send";
/// Tag of a server-reported failure.
pub const TAG_ERROR: &str = "error";
/// Tag of a keepalive acknowledgment.
pub const TAG_PONG: &str = "pong";
/// Tag of an agent capability manifest.
pub const TAG_AGENT_INFO: &str = "agent_info";

/// Frames received from the server.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundFrame {
    /// Session acknowledgment.
    Connected(Connected),
    /// Conversational reply.
    Response(Reply),
    /// Incremental status while the agent works.
    AgentProgress(AgentProgress),
    /// Final agent reply.
    Send(Reply),
    /// Server-reported failure.
    Error(ErrorFrame),
    /// Keepalive acknowledgment.
    Pong,
    /// Capability manifest, may arrive any time after `connected`.
    AgentInfo(AgentDescriptor),
    /// Well-formed frame with a tag this client does not know.
    Unrecognized {
        /// Value of the `type` field.
        kind: String,
        /// Entire frame as received.
        raw: Value,
    },
}

impl InboundFrame {
    /// Decode a frame from its JSON text.
    ///
    /// # Errors
    ///
    /// - `FrameError::Json` if the text is not JSON
    /// - `FrameError::NotAnObject` / `FrameError::MissingType` if there is no
    ///   tag to dispatch on
    /// - `FrameError::Payload` if the payload does not match its tag
    pub fn decode(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text).map_err(FrameError::Json)?;
        Self::from_value(value)
    }

    /// Decode a frame from an already parsed JSON value.
    pub fn from_value(value: Value) -> Result<Self> {
        let Value::Object(map) = &value else {
            return Err(FrameError::NotAnObject);
        };
        let kind = map
            .get("type")
            .and_then(Value::as_str)
            .ok_or(FrameError::MissingType)?
            .to_owned();

        let frame = match kind.as_str() {
            TAG_CONNECTED => Self::Connected(payload(&kind, value)?),
            TAG_RESPONSE => Self::Response(payload(&kind, value)?),
            TAG_AGENT_PROGRESS => Self::AgentProgress(payload(&kind, value)?),
            TAG_SEND => Self::Send(payload(&kind, value)?),
            TAG_ERROR => Self::Error(payload(&kind, value)?),
            TAG_PONG => Self::Pong,
            TAG_AGENT_INFO => Self::AgentInfo(payload(&kind, value)?),
            _ => Self::Unrecognized { kind, raw: value },
        };

        Ok(frame)
    }

    /// The frame's `type` tag.
    pub fn kind(&self) -> &str {
        match self {
            Self::Connected(_) => TAG_CONNECTED,
            Self::Response(_) => TAG_RESPONSE,
            Self::AgentProgress(_) => TAG_AGENT_PROGRESS,
            Self::Send(_) => TAG_SEND,
            Self::Error(_) => TAG_ERROR,
            Self::Pong => TAG_PONG,
            Self::AgentInfo(_) => TAG_AGENT_INFO,
            Self::Unrecognized { kind, .. } => kind,
        }
    }
}

fn payload<T: DeserializeOwned>(kind: &str, value: Value) -> Result<T> {
    serde_json::from_value(value)
        .map_err(|source| FrameError::Payload { kind: kind.to_owned(), source })
}

/// `connected` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connected {
    /// Server-assigned session identifier.
    pub session_id: String,
    /// Domains the server accepts messages for.
    pub domains: Vec<DomainInfo>,
    /// Agent behind the session, when the server announces one up front.
    #[serde(default, alias = "agentInfo", skip_serializing_if = "Option::is_none")]
    pub agent: Option<AgentDescriptor>,
    /// Server capability flags.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub capabilities: Vec<String>,
}

/// A domain the server routes messages for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainInfo {
    /// Domain identifier used in outbound frames.
    pub id: String,
    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Agent capability descriptor. Payload of `agent_info` and the optional
/// `agent` field of `connected`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentDescriptor {
    /// Agent display title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Agent name, used when no title is present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Short description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Tools the agent can call.
    #[serde(default)]
    pub tools: Vec<ToolInfo>,
}

impl AgentDescriptor {
    /// Title for display: `title`, else `name`, else `"agent"`.
    pub fn display_title(&self) -> &str {
        self.title.as_deref().or(self.name.as_deref()).unwrap_or("agent")
    }
}

/// A tool exposed by the agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolInfo {
    /// Tool name.
    pub name: String,
    /// Tool description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// `response` and `send` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reply {
    /// Reply text.
    #[serde(alias = "message")]
    pub text: String,
    /// Sender attribution.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    /// Conversation thread the reply belongs to.
    #[serde(default, rename = "chatId", skip_serializing_if = "Option::is_none")]
    pub chat_id: Option<String>,
}

/// `agent_progress` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentProgress {
    /// Status text.
    #[serde(alias = "status")]
    pub message: String,
    /// Tool currently running.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool: Option<String>,
}

/// `error` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorFrame {
    /// Human-readable error message.
    pub message: String,
    /// Error code, numeric or symbolic.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<ErrorCode>,
}

/// Error code as sent by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ErrorCode {
    /// Numeric code.
    Number(i64),
    /// Symbolic code.
    Text(String),
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(code) => write!(f, "{code}"),
            Self::Text(code) => f.write_str(code),
        }
    }
}
