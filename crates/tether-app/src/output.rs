//! Operator-facing output lines.
//!
//! The app never writes to the terminal. It describes what to show as
//! [`OutputLine`]s and the runtime hands them to the terminal compositor.

/// How a line should be presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    /// Agent or server reply
    Reply,
    /// Client notice (connection changes, command feedback)
    Notice,
    /// Something went wrong
    Error,
    /// Monitor-mode frame trace and decode diagnostics
    Diagnostic,
}

/// One line of operator output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLine {
    /// Presentation
    pub kind: LineKind,
    /// Text, without trailing newline. May span several lines.
    pub text: String,
}

impl OutputLine {
    /// Reply line.
    pub fn reply(text: impl Into<String>) -> Self {
        Self { kind: LineKind::Reply, text: text.into() }
    }

    /// Notice line.
    pub fn notice(text: impl Into<String>) -> Self {
        Self { kind: LineKind::Notice, text: text.into() }
    }

    /// Error line.
    pub fn error(text: impl Into<String>) -> Self {
        Self { kind: LineKind::Error, text: text.into() }
    }

    /// Diagnostic line.
    pub fn diagnostic(text: impl Into<String>) -> Self {
        Self { kind: LineKind::Diagnostic, text: text.into() }
    }
}
