//! Terminal client for tether
//!
//! Wires the [`tether_app::App`] state machine and the
//! [`tether_client::ConnectionSupervisor`] to a real terminal. This crate only
//! handles terminal I/O: line input, output composition, and the event loop.
//!
//! # Components
//!
//! - [`runtime::Runtime`]: single-task event loop
//! - [`terminal::Compositor`]: the only writer to the terminal
//! - [`input`]: raw-mode line editor and piped stdin
//! - [`cli::Args`]: command-line configuration

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod cli;
pub mod input;
pub mod runtime;
pub mod terminal;

pub use cli::{Args, Endpoint};
pub use input::{InputEvent, InputSource, LineEditor, PipedInput, TerminalInput};
pub use runtime::{Runtime, RuntimeError};
pub use terminal::{Compositor, Reprompt};
