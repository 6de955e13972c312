//! Application state machine.
//!
//! This module defines the [`App`] state machine, which manages the interactive
//! session completely decoupled from I/O and connection mechanics.
//!
//! This is a pure state machine: it consumes [`crate::AppEvent`] inputs and
//! produces [`crate::AppAction`] instructions for the runtime to execute.
//!
//! # Responsibilities
//!
//! - Turns operator lines into commands or outbound `message` frames.
//! - Dispatches inbound frames (see [`crate::dispatch`]).
//! - Tracks the conversation thread, pending request, and monitor mode.
//! - Tracks high-level connection state for status and prompt feedback.

use std::time::Duration;

use serde_json::json;
use tether_core::Environment;
use tether_proto::{Command as CommandFrame, Message, OutboundFrame};

use crate::{
    AppAction, AppConfig, AppEvent, ConnectionState, OutputLine, Session,
    command::{Command, HELP},
};

/// Prompt while idle.
pub const PROMPT: &str = "> ";

/// Prompt while a request is pending.
pub const PENDING_PROMPT: &str = "… ";

/// Application state machine.
///
/// Pure state machine that processes events and produces actions.
/// No I/O dependencies - fully testable without a terminal or server.
#[derive(Debug, Clone)]
pub struct App<E: Environment> {
    pub(crate) env: E,
    pub(crate) config: AppConfig,
    pub(crate) session: Session,
    pub(crate) state: ConnectionState,
}

impl<E: Environment> App<E> {
    /// Create a new App. The first conversation thread is allocated here.
    pub fn new(env: E, config: AppConfig) -> Self {
        let session = Session::new(env.new_id(), config.monitor);
        Self { env, config, session, state: ConnectionState::Idle }
    }

    /// Process an event and return actions.
    pub fn handle(&mut self, event: AppEvent) -> Vec<AppAction> {
        match event {
            AppEvent::Line(line) => self.handle_line(&line),
            AppEvent::Interrupt | AppEvent::InputClosed => vec![AppAction::Quit],
            AppEvent::Connecting { attempt } => {
                self.state = ConnectionState::Connecting { attempt };
                if attempt > 1 {
                    vec![AppAction::Progress(format!("reconnecting (attempt {attempt})..."))]
                } else {
                    vec![AppAction::Progress("connecting...".to_string())]
                }
            },
            AppEvent::Connected { attempt } => {
                self.state = ConnectionState::Connected { attempt };
                vec![]
            },
            AppEvent::Disconnected { reason, retry_in, retry } => {
                let was_connected = self.state.is_connected();
                self.session.session_id = None;
                self.state =
                    ConnectionState::Reconnecting { reason: reason.clone(), retry, retry_in };

                let secs = retry_in.as_secs_f64();
                let text = if was_connected {
                    format!("disconnected: {reason}; reconnecting in {secs:.1}s")
                } else {
                    format!("connection failed: {reason}; retry {retry} in {secs:.1}s")
                };
                vec![AppAction::Print(OutputLine::notice(text))]
            },
            AppEvent::Frame(text) => self.dispatch(&text),
            AppEvent::SendRejected { reason } => {
                self.session.pending = false;
                vec![AppAction::Print(OutputLine::error(format!("{reason}: input discarded")))]
            },
        }
    }

    fn handle_line(&mut self, line: &str) -> Vec<AppAction> {
        let line = line.trim();
        if line.is_empty() {
            return vec![];
        }

        match Command::parse(line) {
            Some(command) => self.run_command(command),
            None => self.send_message(line),
        }
    }

    fn run_command(&mut self, command: Command) -> Vec<AppAction> {
        match command {
            Command::Help => {
                HELP.iter().map(|line| AppAction::Print(OutputLine::notice(*line))).collect()
            },
            Command::New => {
                let thread_id = self.env.new_id();
                self.session.new_thread(thread_id.clone());
                tracing::debug!(%thread_id, "new thread");

                let frame = self.command_frame("new_thread", Some(json!({ "chatId": thread_id })));
                vec![
                    AppAction::Print(OutputLine::notice(format!("new thread {thread_id}"))),
                    AppAction::Send(frame),
                ]
            },
            Command::Monitor => {
                self.session.monitor = !self.session.monitor;
                let enabled = self.session.monitor;
                let label = if enabled { "on" } else { "off" };

                let frame = self.command_frame("monitor", Some(json!({ "enabled": enabled })));
                vec![
                    AppAction::Print(OutputLine::notice(format!("monitor mode {label}"))),
                    AppAction::Send(frame),
                ]
            },
            Command::Status => vec![AppAction::ReportStatus],
            Command::Reconnect => {
                vec![AppAction::Print(OutputLine::notice("reconnecting now")), AppAction::Reconnect]
            },
            Command::Quit => vec![AppAction::Quit],
            Command::Unknown(name) => vec![AppAction::Print(OutputLine::notice(format!(
                "unknown command /{name}; /help lists commands"
            )))],
        }
    }

    fn send_message(&mut self, text: &str) -> Vec<AppAction> {
        let frame = OutboundFrame::Message(Message {
            id: self.env.new_id(),
            domain: self.config.domain.clone(),
            text: text.to_string(),
            chat_id: self.session.thread_id.clone(),
            timestamp: self.env.wall_clock_millis(),
        });
        self.session.pending = true;
        vec![AppAction::Send(frame)]
    }

    pub(crate) fn command_frame(
        &self,
        command: &str,
        args: Option<serde_json::Value>,
    ) -> OutboundFrame {
        OutboundFrame::Command(CommandFrame {
            id: self.env.new_id(),
            domain: self.config.domain.clone(),
            command: command.to_string(),
            args,
        })
    }

    /// Lines of the `/status` report.
    ///
    /// `retry_in` is the time left on the pending retry timer, if one is
    /// armed.
    pub fn status_report(&self, retry_in: Option<Duration>) -> Vec<OutputLine> {
        let connection = match &self.state {
            ConnectionState::Idle => "not connected".to_string(),
            ConnectionState::Connecting { attempt } => format!("connecting (attempt {attempt})"),
            ConnectionState::Connected { .. } => match &self.session.session_id {
                Some(id) => format!("connected, session {id}"),
                None => "connected".to_string(),
            },
            ConnectionState::Reconnecting { reason, retry, .. } => format!(
                "reconnecting after \"{reason}\" (retry {retry} in {:.1}s)",
                retry_in.unwrap_or_default().as_secs_f64()
            ),
        };
        let monitor = if self.session.monitor { "on" } else { "off" };
        let pending = if self.session.pending { "yes" } else { "no" };

        [
            format!("connection: {connection}"),
            format!("thread: {}", self.session.thread_id),
            format!("domain: {}", self.config.domain),
            format!("monitor: {monitor}"),
            format!("awaiting reply: {pending}"),
        ]
        .into_iter()
        .map(OutputLine::notice)
        .collect()
    }

    /// Prompt glyph for the current state.
    pub fn prompt(&self) -> &'static str {
        if self.session.pending { PENDING_PROMPT } else { PROMPT }
    }

    /// Conversation state.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Current connection state.
    pub fn connection_state(&self) -> &ConnectionState {
        &self.state
    }

    /// Configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use tether_core::env::test_utils::MockEnv;

    use super::*;

    fn app() -> App<MockEnv> {
        App::new(MockEnv::new(1_700_000_000_000), AppConfig::default())
    }

    fn sent(actions: &[AppAction]) -> Vec<&OutboundFrame> {
        actions
            .iter()
            .filter_map(|a| match a {
                AppAction::Send(frame) => Some(frame),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn text_becomes_message_on_current_thread() {
        let mut app = app();
        let thread = app.session().thread_id.clone();

        let actions = app.handle(AppEvent::Line("  hello  ".into()));
        let [AppAction::Send(OutboundFrame::Message(message))] = actions.as_slice() else {
            panic!("expected one message frame, got {actions:?}");
        };

        assert_eq!(message.text, "hello");
        assert_eq!(message.chat_id, thread);
        assert_eq!(message.domain, "cli");
        assert_eq!(message.timestamp, 1_700_000_000_000);
        assert!(app.session().pending);
        assert_eq!(app.prompt(), PENDING_PROMPT);
    }

    #[test]
    fn empty_lines_are_ignored() {
        let mut app = app();
        assert!(app.handle(AppEvent::Line("   ".into())).is_empty());
        assert!(!app.session().pending);
    }

    #[test]
    fn new_replaces_thread_and_notifies_server() {
        let mut app = app();
        let before = app.session().thread_id.clone();

        let actions = app.handle(AppEvent::Line("/n".into()));
        let after = app.session().thread_id.clone();
        assert_ne!(before, after);

        let frames = sent(&actions);
        let [OutboundFrame::Command(command)] = frames.as_slice() else {
            panic!("expected command frame");
        };
        assert_eq!(command.command, "new_thread");
        assert_eq!(command.args, Some(json!({ "chatId": after })));
    }

    #[test]
    fn monitor_toggles() {
        let mut app = app();

        app.handle(AppEvent::Line("/monitor".into()));
        assert!(app.session().monitor);

        let actions = app.handle(AppEvent::Line("/m".into()));
        assert!(!app.session().monitor);
        let frames = sent(&actions);
        let [OutboundFrame::Command(command)] = frames.as_slice() else {
            panic!("expected command frame");
        };
        assert_eq!(command.args, Some(json!({ "enabled": false })));
    }

    #[test]
    fn reconnect_and_quit_commands() {
        let mut app = app();
        assert!(app.handle(AppEvent::Line("/r".into())).contains(&AppAction::Reconnect));
        assert_eq!(app.handle(AppEvent::Line("/quit".into())), vec![AppAction::Quit]);
        assert_eq!(app.handle(AppEvent::Interrupt), vec![AppAction::Quit]);
        assert_eq!(app.handle(AppEvent::InputClosed), vec![AppAction::Quit]);
    }

    #[test]
    fn unknown_command_gets_one_notice() {
        let mut app = app();
        let actions = app.handle(AppEvent::Line("/bogus".into()));

        assert_eq!(actions.len(), 1);
        assert!(matches!(&actions[0], AppAction::Print(line) if line.text.contains("/bogus")));
    }

    #[test]
    fn send_rejection_clears_pending_with_one_notice() {
        let mut app = app();
        app.handle(AppEvent::Line("hello".into()));

        let actions = app.handle(AppEvent::SendRejected { reason: "not connected".into() });
        assert_eq!(actions.len(), 1);
        assert!(!app.session().pending);
    }

    #[test]
    fn disconnect_clears_session_id() {
        let mut app = app();
        app.handle(AppEvent::Connected { attempt: 1 });
        app.session.session_id = Some("s1".into());

        let actions = app.handle(AppEvent::Disconnected {
            reason: "reset".into(),
            retry_in: Duration::from_secs(1),
            retry: 1,
        });

        assert_eq!(app.session().session_id, None);
        assert!(matches!(app.connection_state(), ConnectionState::Reconnecting { retry: 1, .. }));
        assert!(matches!(&actions[0], AppAction::Print(line) if line.text.contains("reset")));
    }

    fn report(app: &App<MockEnv>, retry_in: Option<Duration>) -> Vec<String> {
        app.status_report(retry_in).into_iter().map(|line| line.text).collect()
    }

    #[test]
    fn status_reports_thread_and_monitor() {
        let mut app = app();
        let thread = app.session().thread_id.clone();

        assert_eq!(app.handle(AppEvent::Line("/s".into())), vec![AppAction::ReportStatus]);
        let text = report(&app, None);

        assert!(text.contains(&format!("thread: {thread}")));
        assert!(text.contains(&"monitor: off".to_string()));
        assert!(text.contains(&"connection: not connected".to_string()));
    }

    #[test]
    fn status_counts_down_to_pending_retry() {
        let mut app = app();
        app.handle(AppEvent::Disconnected {
            reason: "refused".into(),
            retry_in: Duration::from_secs(4),
            retry: 3,
        });

        let text = report(&app, Some(Duration::from_millis(1500)));
        assert!(
            text.contains(&"connection: reconnecting after \"refused\" (retry 3 in 1.5s)".to_string()),
            "{text:#?}"
        );

        let text = report(&app, None);
        assert!(text[0].ends_with("(retry 3 in 0.0s)"), "{text:#?}");
    }
}
