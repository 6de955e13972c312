//! Client
//!
//! Async half of the tether connection layer. [`ConnectionSupervisor`] runs the
//! Sans-IO [`tether_core::Supervisor`] on tokio, executing its actions against
//! a [`Transport`] and turning transport events into [`SupervisorOutput`]s.
//!
//! # Components
//!
//! - [`ConnectionSupervisor`]: lifecycle, retry timer, keepalive, per-attempt
//!   completion
//! - [`Transport`] / [`Link`]: the seam between the supervisor and real I/O
//! - [`SendError`] / [`TransportError`]: failure types
//!
//! # Transport (optional)
//!
//! With the `transport` feature enabled, this crate also provides
//! [`websocket::WebSocketTransport`], a `tokio-tungstenite` implementation.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod error;
mod supervisor;
mod transport;

#[cfg(feature = "transport")]
pub mod websocket;

pub use error::{SendError, TransportError};
pub use supervisor::{ConnectAttempt, ConnectionSupervisor, SupervisorOutput, SupervisorStatus};
pub use tether_core::{
    AttemptId, Backoff, ConnectionError, SupervisorConfig, SupervisorState,
};
pub use transport::{AttemptEvent, EventSender, Link, Transport, TransportEvent};
