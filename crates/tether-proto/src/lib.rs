//! Tether wire protocol
//!
//! Every message on the wire is a JSON object carrying a `type` discriminator.
//! Inbound frames are decoded in two steps: the tag is read first, then the
//! payload for that tag is decoded into its own struct. Unknown tags are not an
//! error, they decode to [`InboundFrame::Unrecognized`] so the dispatcher can
//! surface them in monitor mode.
//!
//! # Components
//!
//! - [`InboundFrame`]: server → client frames
//! - [`OutboundFrame`]: client → server frames
//! - [`FrameError`]: decode/encode failures

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod errors;
pub mod inbound;
pub mod outbound;

pub use errors::{FrameError, Result};
pub use inbound::{
    AgentDescriptor, AgentProgress, Connected, DomainInfo, ErrorCode, ErrorFrame,
    InboundFrame, Reply, ToolInfo,
};
pub use outbound::{Command, Connect, Message, OutboundFrame};
