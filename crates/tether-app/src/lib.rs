//! Application layer for tether
//!
//! Pure state machine for the interactive session: operator commands,
//! inbound frame dispatch, and the output model. No terminal and no socket,
//! so the same code runs under tests and in the binary.
//!
//! # Components
//!
//! - [`App`]: session state machine (lines in, actions out)
//! - [`dispatch`]: per-tag handlers for inbound frames
//! - [`Command`]: slash-command parsing
//! - [`OutputLine`]: what the operator sees, independent of rendering

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod action;
mod app;
mod command;
mod config;
pub mod dispatch;
mod event;
mod output;
mod state;

pub use action::AppAction;
pub use app::{App, PENDING_PROMPT, PROMPT};
pub use command::{Command, HELP};
pub use config::AppConfig;
pub use event::AppEvent;
pub use output::{LineKind, OutputLine};
pub use state::{ConnectionState, Session};
