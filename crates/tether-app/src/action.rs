//! Application side-effects and intents.
//!
//! This module defines the [`AppAction`] enum, which represents instructions
//! produced by the [`crate::App`] state machine for the runtime to execute.

use tether_proto::OutboundFrame;

use crate::OutputLine;

/// Actions produced by the App state machine.
#[derive(Debug, Clone, PartialEq)]
pub enum AppAction {
    /// Show a line to the operator.
    Print(OutputLine),

    /// Show a transient status line, replaced by the next output.
    Progress(String),

    /// Send a frame on the live session.
    ///
    /// If no session is open the runtime reports back with
    /// [`crate::AppEvent::SendRejected`].
    Send(OutboundFrame),

    /// Store the server-assigned session ID on the live connection.
    RecordSession(String),

    /// Print the `/status` report.
    ///
    /// The runtime supplies the time left on the pending retry and prints
    /// [`crate::App::status_report`].
    ReportStatus,

    /// Drop the connection and reconnect immediately.
    Reconnect,

    /// Quit the application.
    Quit,
}
