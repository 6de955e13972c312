//! Async connection supervisor.
//!
//! [`ConnectionSupervisor`] owns the pure [`Supervisor`] state machine and
//! executes its actions on tokio: opening links, arming the single retry
//! timer, running the keepalive interval, and settling one
//! [`CompletionGate`] per attempt. Callers pull operator-relevant
//! [`SupervisorOutput`]s from [`ConnectionSupervisor::next`].
//!
//! Everything runs on the caller's task. The only concurrency is inside the
//! transport, which talks back exclusively through attempt-tagged events.

use std::{
    collections::VecDeque,
    future::Future,
    pin::Pin,
    task::{Context, Poll},
    time::Duration,
};

use tether_core::{
    AttemptId, Completion, CompletionGate, ConnectionError, LinkEvent, Supervisor,
    SupervisorAction, SupervisorConfig, SupervisorInput, SupervisorState,
};
use tether_proto::{Connect, OutboundFrame};
use tokio::{
    sync::mpsc,
    time::{Instant, Interval, MissedTickBehavior, Sleep},
};

use crate::{
    error::SendError,
    transport::{AttemptEvent, Link, Transport, TransportEvent},
};

/// Operator-relevant outcome of driving the supervisor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SupervisorOutput {
    /// A frame from the live session, in arrival order
    Frame(String),
    /// A new attempt is being opened
    Connecting {
        /// Attempt being opened
        attempt: AttemptId,
    },
    /// The server acknowledged the session
    Connected {
        /// Acknowledged attempt
        attempt: AttemptId,
    },
    /// The connection was lost and a retry is scheduled
    Disconnected {
        /// Close or failure reason
        reason: String,
        /// Delay until the retry
        retry_in: Duration,
        /// Retry count since the last acknowledgment
        retry: u32,
    },
}

/// Snapshot for status reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupervisorStatus {
    /// Lifecycle state
    pub state: SupervisorState,
    /// Latest attempt
    pub attempt: AttemptId,
    /// Failed or dropped connections since the last acknowledgment
    pub retries: u32,
    /// Server-assigned session ID of the live connection
    pub session_id: Option<String>,
    /// Deadline of the pending retry
    pub retry_at: Option<Instant>,
}

impl SupervisorStatus {
    /// Time left until the pending retry, if one is scheduled.
    pub fn retry_in(&self) -> Option<Duration> {
        self.retry_at.map(|at| at.saturating_duration_since(Instant::now()))
    }
}

/// Future for one connection attempt.
///
/// Resolves `Ok` when the server acknowledges the session (its first frame)
/// and `Err` when the attempt closes, is superseded, or the supervisor stops
/// first. Resolves exactly once.
#[derive(Debug)]
pub struct ConnectAttempt {
    attempt: AttemptId,
    completion: Completion<(), ConnectionError>,
}

impl ConnectAttempt {
    /// Attempt this future tracks.
    pub fn attempt(&self) -> AttemptId {
        self.attempt
    }

    fn rejected(attempt: AttemptId, error: ConnectionError) -> Self {
        let (gate, completion) = CompletionGate::new();
        gate.reject(error);
        Self { attempt, completion }
    }
}

impl Future for ConnectAttempt {
    type Output = Result<(), ConnectionError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.completion).poll(cx)
    }
}

/// What woke [`ConnectionSupervisor::next`].
enum Wake {
    Link(AttemptEvent),
    Retry,
    Heartbeat,
}

/// Drives the connection [`Supervisor`] over a [`Transport`].
///
/// Holds at most one link. Sends are refused unless the session is open:
/// nothing is queued across disconnects.
pub struct ConnectionSupervisor<T: Transport> {
    machine: Supervisor,
    transport: T,
    handshake: Connect,
    link: Option<(AttemptId, T::Link)>,
    events_tx: mpsc::UnboundedSender<AttemptEvent>,
    events_rx: mpsc::UnboundedReceiver<AttemptEvent>,
    gate: Option<(AttemptId, CompletionGate<(), ConnectionError>)>,
    /// Future of the most recently opened attempt, claimed by `start`
    opened: Option<ConnectAttempt>,
    retry: Option<Pin<Box<Sleep>>>,
    retry_at: Option<Instant>,
    heartbeat: Option<Interval>,
    close_reason: Option<String>,
    outputs: VecDeque<SupervisorOutput>,
}

impl<T: Transport> ConnectionSupervisor<T> {
    /// Create an idle supervisor. `handshake` is sent on every link once it
    /// reports ready.
    pub fn new(config: SupervisorConfig, transport: T, handshake: Connect) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            machine: Supervisor::new(config),
            transport,
            handshake,
            link: None,
            events_tx,
            events_rx,
            gate: None,
            opened: None,
            retry: None,
            retry_at: None,
            heartbeat: None,
            close_reason: None,
            outputs: VecDeque::new(),
        }
    }

    /// Open a connection. Does not wait for it.
    ///
    /// The returned future settles once: `Ok` on the server's
    /// acknowledgment, `Err` if the attempt closes first. A start while a
    /// connection is already connecting or open, or after [`Self::stop`],
    /// returns an already-rejected attempt.
    pub fn start(&mut self) -> ConnectAttempt {
        self.begin(SupervisorInput::Start)
    }

    /// Drop the current connection and any pending retry, then open a new
    /// connection immediately with the retry counter reset.
    pub fn force_reconnect(&mut self) -> ConnectAttempt {
        self.begin(SupervisorInput::ForceReconnect)
    }

    fn begin(&mut self, input: SupervisorInput) -> ConnectAttempt {
        match self.machine.handle(input) {
            Ok(actions) => {
                self.execute_all(actions, None);
                let attempt = self.machine.attempt();
                self.opened
                    .take()
                    .unwrap_or_else(|| ConnectAttempt::rejected(attempt, ConnectionError::Abandoned))
            },
            Err(e) => {
                tracing::debug!(error = %e, "connect request rejected");
                ConnectAttempt::rejected(self.machine.attempt(), e)
            },
        }
    }

    /// Shut down permanently.
    ///
    /// Synchronous: on return the link is closed, the retry timer is gone,
    /// and [`Self::next`] yields `None` forever. Idempotent.
    pub fn stop(&mut self) {
        match self.machine.handle(SupervisorInput::Stop) {
            Ok(actions) => self.execute_all(actions, None),
            Err(e) => tracing::debug!(error = %e, "stop rejected"),
        }

        self.retry = None;
        self.retry_at = None;
        self.heartbeat = None;
        self.outputs.clear();
        self.opened = None;
        while self.events_rx.try_recv().is_ok() {}
    }

    /// Send a frame on the live session.
    ///
    /// # Errors
    ///
    /// - `SendError::NotConnected` unless the session is open. The transport
    ///   is not touched and the frame is dropped.
    /// - `SendError::Encode` if the frame cannot be serialized
    /// - `SendError::LinkClosed` if the link's task already ended
    pub fn send(&mut self, frame: &OutboundFrame) -> Result<(), SendError> {
        if !self.machine.is_open() {
            return Err(SendError::NotConnected);
        }
        let Some((_, link)) = self.link.as_mut() else {
            return Err(SendError::NotConnected);
        };

        let text = frame.encode()?;
        link.send_text(text)?;
        tracing::debug!(kind = frame.kind(), "frame sent");
        Ok(())
    }

    /// Record the server-assigned session ID for the live connection.
    pub fn record_session(&mut self, session_id: impl Into<String>) {
        self.machine.record_session(session_id);
    }

    /// Whether the session is open.
    pub fn is_open(&self) -> bool {
        self.machine.is_open()
    }

    /// Current status snapshot.
    pub fn status(&self) -> SupervisorStatus {
        SupervisorStatus {
            state: self.machine.state(),
            attempt: self.machine.attempt(),
            retries: self.machine.retries(),
            session_id: self.machine.session_id().map(str::to_owned),
            retry_at: self.retry_at,
        }
    }

    /// Wait for the next operator-relevant output.
    ///
    /// Drives transport events, the retry timer, and the keepalive interval.
    /// Returns `None` once stopped. Cancel-safe: dropping the future loses no
    /// events.
    pub async fn next(&mut self) -> Option<SupervisorOutput> {
        loop {
            if self.machine.state() == SupervisorState::ShuttingDown {
                return None;
            }
            if let Some(output) = self.outputs.pop_front() {
                return Some(output);
            }

            let wake = tokio::select! {
                event = self.events_rx.recv() => match event {
                    Some(event) => Wake::Link(event),
                    // Unreachable while we hold `events_tx`.
                    None => return None,
                },
                () = retry_elapsed(&mut self.retry) => Wake::Retry,
                () = heartbeat_tick(&mut self.heartbeat) => Wake::Heartbeat,
            };

            match wake {
                Wake::Link(event) => self.on_link_event(event),
                Wake::Retry => {
                    self.retry = None;
                    self.retry_at = None;
                    self.apply(SupervisorInput::RetryElapsed, None);
                },
                Wake::Heartbeat => self.apply(SupervisorInput::Heartbeat, None),
            }
        }
    }

    fn on_link_event(&mut self, AttemptEvent { attempt, event }: AttemptEvent) {
        let (event, frame) = match event {
            TransportEvent::Ready => (LinkEvent::Ready, None),
            TransportEvent::Frame(text) => (LinkEvent::Message, Some(text)),
            TransportEvent::Closed { reason } => {
                self.close_reason = Some(reason.clone());
                (LinkEvent::Closed { reason }, None)
            },
        };
        self.apply(SupervisorInput::Link { attempt, event }, frame);
    }

    fn apply(&mut self, input: SupervisorInput, frame: Option<String>) {
        match self.machine.handle(input) {
            Ok(actions) => self.execute_all(actions, frame),
            Err(e) => tracing::debug!(error = %e, "supervisor input rejected"),
        }
        self.close_reason = None;
    }

    fn execute_all(&mut self, actions: Vec<SupervisorAction>, mut frame: Option<String>) {
        for action in actions {
            self.execute(action, &mut frame);
        }
    }

    fn execute(&mut self, action: SupervisorAction, frame: &mut Option<String>) {
        match action {
            SupervisorAction::Open { attempt } => {
                let link = self.transport.open(attempt, self.events_tx.clone());
                self.link = Some((attempt, link));

                let (gate, completion) = CompletionGate::new();
                self.gate = Some((attempt, gate));
                self.opened = Some(ConnectAttempt { attempt, completion });
                self.outputs.push_back(SupervisorOutput::Connecting { attempt });
            },

            SupervisorAction::SendHandshake { attempt } => {
                let frame = OutboundFrame::Connect(self.handshake.clone());
                self.send_on(attempt, &frame);
            },

            SupervisorAction::SendHeartbeat { attempt } => {
                self.send_on(attempt, &OutboundFrame::Ping);
            },

            SupervisorAction::Close { attempt } => {
                match self.link.take() {
                    Some((current, mut link)) if current == attempt => link.close(),
                    other => self.link = other,
                }
                self.heartbeat = None;
            },

            SupervisorAction::Settle { attempt, outcome } => {
                let gate = match &self.gate {
                    Some((current, gate)) if *current == attempt => Some(gate),
                    _ => None,
                };

                match outcome {
                    Ok(()) => {
                        if let Some(gate) = gate {
                            gate.resolve(());
                        }
                        self.start_heartbeat();
                        tracing::info!(attempt, "connected");
                        self.outputs.push_back(SupervisorOutput::Connected { attempt });
                    },
                    Err(e) => {
                        tracing::debug!(attempt, error = %e, "attempt failed");
                        if let Some(gate) = gate {
                            gate.reject(e);
                        }
                    },
                }
            },

            SupervisorAction::Deliver { .. } => {
                if let Some(text) = frame.take() {
                    self.outputs.push_back(SupervisorOutput::Frame(text));
                }
            },

            SupervisorAction::ScheduleRetry { delay, retry } => {
                let deadline = Instant::now() + delay;
                self.retry = Some(Box::pin(tokio::time::sleep_until(deadline)));
                self.retry_at = Some(deadline);

                let reason = self.close_reason.take().unwrap_or_default();
                tracing::info!(?delay, retry, %reason, "reconnect scheduled");
                self.outputs.push_back(SupervisorOutput::Disconnected {
                    reason,
                    retry_in: delay,
                    retry,
                });
            },

            SupervisorAction::CancelRetry => {
                self.retry = None;
                self.retry_at = None;
            },
        }
    }

    fn send_on(&mut self, attempt: AttemptId, frame: &OutboundFrame) {
        let Some((current, link)) = self.link.as_mut() else {
            return;
        };
        if *current != attempt {
            return;
        }

        let result = frame.encode().map_err(SendError::from).and_then(|text| {
            link.send_text(text).map_err(SendError::from)
        });
        if let Err(e) = result {
            tracing::warn!(attempt, kind = frame.kind(), error = %e, "control frame not sent");
        }
    }

    fn start_heartbeat(&mut self) {
        self.heartbeat = self.machine.config().heartbeat_interval.map(|period| {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            interval
        });
    }
}

async fn retry_elapsed(retry: &mut Option<Pin<Box<Sleep>>>) {
    match retry {
        Some(sleep) => sleep.as_mut().await,
        None => std::future::pending().await,
    }
}

async fn heartbeat_tick(heartbeat: &mut Option<Interval>) {
    match heartbeat {
        Some(interval) => {
            interval.tick().await;
        },
        None => std::future::pending().await,
    }
}
