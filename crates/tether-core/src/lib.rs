//! Tether core
//!
//! Sans-IO pieces of the connection layer. Nothing in this crate opens a
//! socket, sleeps, or spawns a task: the [`supervisor::Supervisor`] consumes
//! inputs and returns actions, and the async driver in `tether-client`
//! executes them.
//!
//! # Components
//!
//! - [`backoff::Backoff`]: attempt count → retry delay
//! - [`gate::CompletionGate`]: settle-once completion shared by racing paths
//! - [`supervisor::Supervisor`]: reconnection state machine
//! - [`env::Environment`]: wall clock and randomness
//! - [`error`]: connection and configuration errors

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod backoff;
pub mod env;
pub mod error;
pub mod gate;
pub mod supervisor;

pub use backoff::Backoff;
pub use env::{Environment, SystemEnv};
pub use error::{ConfigError, ConnectionError};
pub use gate::{Completion, CompletionError, CompletionGate};
pub use supervisor::{
    AttemptId, LinkEvent, Supervisor, SupervisorAction, SupervisorConfig, SupervisorInput,
    SupervisorState,
};
