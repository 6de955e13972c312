//! Async runtime
//!
//! Event loop that drives operator input and the connection supervisor and
//! coordinates them through the [`App`] state machine. Everything runs on
//! one task: `tokio::select!` waits on input, supervisor output, the
//! outstanding connect attempt, and Ctrl-C, then handles exactly one wake-up
//! to completion before waiting again.

use std::io::{self, Write};

use tether_app::{App, AppAction, AppEvent, OutputLine};
use tether_client::{ConnectAttempt, ConnectionSupervisor, SupervisorOutput, Transport};
use tether_core::{ConfigError, ConnectionError, Environment};
use thiserror::Error;

use crate::{
    input::{InputEvent, InputSource},
    terminal::{Compositor, Reprompt},
};

/// Runtime errors.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// I/O error from terminal or input operations.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Invalid startup configuration.
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
}

/// What woke the event loop.
enum Wake {
    Input(InputEvent),
    Supervisor(SupervisorOutput),
    Attempt(Result<(), ConnectionError>),
}

/// Interactive session runtime.
///
/// Owns the only [`App`], [`ConnectionSupervisor`] and [`Compositor`] of the
/// process.
pub struct Runtime<E, T, I, W>
where
    E: Environment,
    T: Transport,
    I: InputSource,
    W: Write,
{
    app: App<E>,
    supervisor: ConnectionSupervisor<T>,
    compositor: Compositor<W>,
    input: I,
    banner: String,
    /// Latest connect attempt, watched for logging only
    attempt: Option<ConnectAttempt>,
}

impl<E, T, I, W> Runtime<E, T, I, W>
where
    E: Environment,
    T: Transport,
    I: InputSource,
    W: Write,
{
    /// Assemble a runtime. Nothing is opened until [`Self::run`].
    pub fn new(
        app: App<E>,
        supervisor: ConnectionSupervisor<T>,
        compositor: Compositor<W>,
        input: I,
        banner: impl Into<String>,
    ) -> Self {
        Self { app, supervisor, compositor, input, banner: banner.into(), attempt: None }
    }

    /// Run until the operator quits or input ends.
    ///
    /// Connection failures never end the loop; they are reported and
    /// retried. Only terminal or input I/O errors are returned.
    pub async fn run(mut self) -> Result<(), RuntimeError> {
        let result = self.event_loop().await;

        self.supervisor.stop();
        self.compositor.hide_prompt()?;
        result
    }

    /// The compositor, for inspecting output after a run.
    pub fn compositor(&self) -> &Compositor<W> {
        &self.compositor
    }

    async fn event_loop(&mut self) -> Result<(), RuntimeError> {
        let banner = OutputLine::notice(self.banner.clone());
        self.compositor.emit(&banner, Reprompt::No)?;
        self.attempt = Some(self.supervisor.start());
        self.compositor.show_prompt(self.app.prompt())?;

        loop {
            let wake = tokio::select! {
                event = self.input.next() => Wake::Input(event?),
                Some(output) = self.supervisor.next() => Wake::Supervisor(output),
                result = settled(&mut self.attempt) => Wake::Attempt(result),
                _ = tokio::signal::ctrl_c() => Wake::Input(InputEvent::Interrupt),
            };

            let quit = match wake {
                Wake::Input(event) => self.handle_input(event)?,
                Wake::Supervisor(output) => {
                    let actions = self.app.handle(app_event(output));
                    self.process_actions(actions)?
                },
                Wake::Attempt(result) => {
                    self.attempt = None;
                    match result {
                        Ok(()) => tracing::info!("session acknowledged"),
                        Err(e) => tracing::debug!(error = %e, "connect attempt did not complete"),
                    }
                    false
                },
            };
            if quit {
                return Ok(());
            }

            self.compositor.set_prompt(self.app.prompt())?;
        }
    }

    fn handle_input(&mut self, event: InputEvent) -> Result<bool, RuntimeError> {
        let app_event = match event {
            InputEvent::Line(line) => {
                self.compositor.commit_input(&line)?;
                self.redraw_input()?;
                AppEvent::Line(line)
            },
            InputEvent::Edited => {
                self.redraw_input()?;
                return Ok(false);
            },
            InputEvent::Interrupt => AppEvent::Interrupt,
            InputEvent::Eof => AppEvent::InputClosed,
        };

        let actions = self.app.handle(app_event);
        self.process_actions(actions)
    }

    /// Process actions returned by the app. Returns true if should quit.
    ///
    /// Send failures feed back into the app as events, so processing is
    /// iterative.
    fn process_actions(&mut self, initial_actions: Vec<AppAction>) -> Result<bool, RuntimeError> {
        let mut pending_actions = initial_actions;

        while !pending_actions.is_empty() {
            let actions = std::mem::take(&mut pending_actions);

            for action in actions {
                match action {
                    AppAction::Print(line) => self.compositor.emit(&line, Reprompt::Yes)?,
                    AppAction::Progress(text) => self.compositor.status(&text)?,
                    AppAction::Send(frame) => {
                        if let Err(e) = self.supervisor.send(&frame) {
                            tracing::debug!(error = %e, kind = frame.kind(), "frame not sent");
                            let rejected = AppEvent::SendRejected { reason: e.to_string() };
                            pending_actions.extend(self.app.handle(rejected));
                        }
                    },
                    AppAction::ReportStatus => {
                        let retry_in = self.supervisor.status().retry_in();
                        for line in self.app.status_report(retry_in) {
                            self.compositor.emit(&line, Reprompt::Yes)?;
                        }
                    },
                    AppAction::RecordSession(session_id) => {
                        self.supervisor.record_session(session_id);
                    },
                    AppAction::Reconnect => {
                        self.attempt = Some(self.supervisor.force_reconnect());
                    },
                    AppAction::Quit => return Ok(true),
                }
            }
        }
        Ok(false)
    }

    fn redraw_input(&mut self) -> io::Result<()> {
        let (draft, cursor) = self.input.draft().unwrap_or(("", 0));
        self.compositor.redraw_input(draft, cursor)
    }
}

/// Resolve the watched attempt, or never if there is none.
async fn settled(attempt: &mut Option<ConnectAttempt>) -> Result<(), ConnectionError> {
    match attempt {
        Some(attempt) => attempt.await,
        None => std::future::pending().await,
    }
}

fn app_event(output: SupervisorOutput) -> AppEvent {
    match output {
        SupervisorOutput::Frame(text) => AppEvent::Frame(text),
        SupervisorOutput::Connecting { attempt } => AppEvent::Connecting { attempt },
        SupervisorOutput::Connected { attempt } => AppEvent::Connected { attempt },
        SupervisorOutput::Disconnected { reason, retry_in, retry } => {
            AppEvent::Disconnected { reason, retry_in, retry }
        },
    }
}
