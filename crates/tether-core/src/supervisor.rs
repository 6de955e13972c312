//! Connection supervisor state machine.
//!
//! Owns the lifecycle of the single server connection and the reconnect
//! schedule. Uses the action pattern: [`Supervisor::handle`] takes an input and
//! returns actions for the driver to execute. The supervisor performs no I/O,
//! holds no timers, and never sees frame contents, which keeps every transition
//! testable without a transport.
//!
//! # State Machine
//!
//! ```text
//!            Start                Ready + first Message
//! ┌──────┐ ───────> ┌────────────┐ ───────────────────> ┌──────┐
//! │ Idle │          │ Connecting │                      │ Open │
//! └──────┘          └────────────┘ <──┐                 └──────┘
//!                         │           │ RetryElapsed        │
//!                         │ Closed    │                     │ Closed
//!                         ↓           │                     ↓
//!                   ┌──────────────┐  │                     │
//!                   │ Reconnecting │──┘ <───────────────────┘
//!                   └──────────────┘
//!
//!   Stop from any state ──> ShuttingDown (terminal)
//! ```
//!
//! # Invariants
//!
//! - At most one live connection. Every transport event carries the
//!   [`AttemptId`] that opened it. Events from any other attempt are stale and
//!   ignored.
//! - Each attempt is settled exactly once: the first inbound message settles
//!   it `Ok`, a close before that settles it `Err`.
//! - On the first message, `Settle` is emitted before `Deliver`.
//! - A retry is pending iff the state is `Reconnecting`.

use std::time::Duration;

use crate::{backoff::Backoff, error::ConnectionError};

/// Identifier of one connection attempt. Increments on every open.
pub type AttemptId = u64;

/// Keepalive interval while the session is open.
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(25);

/// Supervisor lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorState {
    /// Nothing opened yet
    Idle,
    /// Transport opening, or open but not yet acknowledged by the server
    Connecting,
    /// Server acknowledged the session
    Open,
    /// Connection lost, retry scheduled
    Reconnecting,
    /// Stopped; accepts no further work
    ShuttingDown,
}

/// Transport-level events for one attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    /// Transport is open and can carry frames
    Ready,
    /// A message arrived; its contents are the dispatcher's business
    Message,
    /// Transport closed or failed
    Closed {
        /// Close or failure reason
        reason: String,
    },
}

/// Inputs to the supervisor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SupervisorInput {
    /// Open a connection
    Start,
    /// Shut down permanently
    Stop,
    /// Drop any connection and pending retry, then open immediately
    ForceReconnect,
    /// The scheduled retry delay has passed
    RetryElapsed,
    /// Keepalive interval tick
    Heartbeat,
    /// Event from the transport of `attempt`
    Link {
        /// Attempt the event belongs to
        attempt: AttemptId,
        /// What happened
        event: LinkEvent,
    },
}

/// Actions returned by the supervisor.
///
/// The driver executes these in order:
/// - `Open`: open a transport tagged with `attempt`
/// - `SendHandshake`: send the `connect` frame on that transport
/// - `Close`: release the transport of `attempt`
/// - `Settle`: complete the attempt's gate
/// - `Deliver`: hand the message that caused this action to the dispatcher
/// - `ScheduleRetry` / `CancelRetry`: arm or disarm the single retry timer
/// - `SendHeartbeat`: send a keepalive ping
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SupervisorAction {
    /// Open a transport for this attempt
    Open {
        /// New attempt
        attempt: AttemptId,
    },
    /// Send the handshake frame
    SendHandshake {
        /// Attempt whose transport is ready
        attempt: AttemptId,
    },
    /// Close and release the transport
    Close {
        /// Attempt to close
        attempt: AttemptId,
    },
    /// Settle the attempt's completion gate
    Settle {
        /// Attempt being settled
        attempt: AttemptId,
        /// Outcome
        outcome: Result<(), ConnectionError>,
    },
    /// Dispatch the current message
    Deliver {
        /// Attempt the message arrived on
        attempt: AttemptId,
    },
    /// Arm the retry timer
    ScheduleRetry {
        /// Delay until `RetryElapsed`
        delay: Duration,
        /// Retry count after this failure (1 for the first retry)
        retry: u32,
    },
    /// Disarm the retry timer
    CancelRetry,
    /// Send a keepalive ping
    SendHeartbeat {
        /// Attempt to ping on
        attempt: AttemptId,
    },
}

/// Supervisor configuration
#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    /// Retry delay policy
    pub backoff: Backoff,
    /// Keepalive interval while open. `None` disables keepalive.
    pub heartbeat_interval: Option<Duration>,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self { backoff: Backoff::default(), heartbeat_interval: Some(DEFAULT_HEARTBEAT_INTERVAL) }
    }
}

/// Connection supervisor state machine
///
/// Pure: no I/O and no clock. Timer deadlines live in the driver; the
/// supervisor only knows whether a retry is pending.
#[derive(Debug, Clone)]
pub struct Supervisor {
    /// Current state
    state: SupervisorState,
    /// Configuration
    config: SupervisorConfig,
    /// Latest attempt (0 before the first open)
    attempt: AttemptId,
    /// Failed or dropped connections since the last acknowledgment
    retries: u32,
    /// Current attempt's transport reported ready
    ready: bool,
    /// Current attempt has been settled
    settled: bool,
    /// A retry timer is armed
    retry_pending: bool,
    /// Session ID assigned by the server. `None` until acknowledged.
    session_id: Option<String>,
}

impl Supervisor {
    /// Create a supervisor in [`SupervisorState::Idle`]
    pub fn new(config: SupervisorConfig) -> Self {
        Self {
            state: SupervisorState::Idle,
            config,
            attempt: 0,
            retries: 0,
            ready: false,
            settled: false,
            retry_pending: false,
            session_id: None,
        }
    }

    /// Current state
    pub fn state(&self) -> SupervisorState {
        self.state
    }

    /// Latest attempt ID. 0 before the first open.
    pub fn attempt(&self) -> AttemptId {
        self.attempt
    }

    /// Failed or dropped connections since the last acknowledgment
    pub fn retries(&self) -> u32 {
        self.retries
    }

    /// Whether a retry timer is armed
    pub fn retry_pending(&self) -> bool {
        self.retry_pending
    }

    /// Session ID of the live connection. `None` if not acknowledged.
    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    /// Whether outbound frames may be sent
    pub fn is_open(&self) -> bool {
        self.state == SupervisorState::Open
    }

    /// Configuration
    pub fn config(&self) -> &SupervisorConfig {
        &self.config
    }

    /// Record the server-assigned session ID for the live connection.
    ///
    /// Ignored unless the connection is open.
    pub fn record_session(&mut self, session_id: impl Into<String>) {
        if self.state == SupervisorState::Open {
            self.session_id = Some(session_id.into());
        }
    }

    /// Process an input and return actions for the driver.
    ///
    /// # Errors
    ///
    /// - `ConnectionError::ShuttingDown` for `Start`/`ForceReconnect` after
    ///   `Stop`
    /// - `ConnectionError::InvalidState` for `Start` while a connection is
    ///   already connecting or open
    pub fn handle(
        &mut self,
        input: SupervisorInput,
    ) -> Result<Vec<SupervisorAction>, ConnectionError> {
        match input {
            SupervisorInput::Start => self.start(),
            SupervisorInput::Stop => Ok(self.stop()),
            SupervisorInput::ForceReconnect => self.force_reconnect(),
            SupervisorInput::RetryElapsed => self.retry_elapsed(),
            SupervisorInput::Heartbeat => Ok(self.heartbeat()),
            SupervisorInput::Link { attempt, event } => Ok(self.link_event(attempt, event)),
        }
    }

    fn start(&mut self) -> Result<Vec<SupervisorAction>, ConnectionError> {
        match self.state {
            SupervisorState::ShuttingDown => Err(ConnectionError::ShuttingDown),
            SupervisorState::Connecting | SupervisorState::Open => {
                Err(ConnectionError::InvalidState { state: self.state, operation: "start" })
            },
            SupervisorState::Idle | SupervisorState::Reconnecting => {
                let mut actions = Vec::new();
                if self.retry_pending {
                    self.retry_pending = false;
                    actions.push(SupervisorAction::CancelRetry);
                }
                actions.push(self.open_next());
                Ok(actions)
            },
        }
    }

    fn open_next(&mut self) -> SupervisorAction {
        self.attempt += 1;
        self.state = SupervisorState::Connecting;
        self.ready = false;
        self.settled = false;
        self.session_id = None;

        tracing::debug!(attempt = self.attempt, retries = self.retries, "opening connection");
        SupervisorAction::Open { attempt: self.attempt }
    }

    fn stop(&mut self) -> Vec<SupervisorAction> {
        if self.state == SupervisorState::ShuttingDown {
            return Vec::new();
        }

        let mut actions = Vec::new();
        if self.retry_pending {
            self.retry_pending = false;
            actions.push(SupervisorAction::CancelRetry);
        }
        actions.extend(self.release(ConnectionError::ShuttingDown));

        tracing::debug!(from = ?self.state, "supervisor stopping");
        self.state = SupervisorState::ShuttingDown;
        actions
    }

    fn force_reconnect(&mut self) -> Result<Vec<SupervisorAction>, ConnectionError> {
        if self.state == SupervisorState::ShuttingDown {
            return Err(ConnectionError::ShuttingDown);
        }

        let mut actions = Vec::new();
        if self.retry_pending {
            self.retry_pending = false;
            actions.push(SupervisorAction::CancelRetry);
        }
        actions.extend(self.release(ConnectionError::Superseded));

        tracing::debug!(from = ?self.state, retries = self.retries, "forced reconnect");
        self.retries = 0;
        self.state = SupervisorState::Idle;
        actions.push(self.open_next());
        Ok(actions)
    }

    /// Settle (if still pending) and close the live connection, if any.
    fn release(&mut self, reason: ConnectionError) -> Vec<SupervisorAction> {
        let mut actions = Vec::new();
        if matches!(self.state, SupervisorState::Connecting | SupervisorState::Open) {
            if !self.settled {
                self.settled = true;
                actions.push(SupervisorAction::Settle {
                    attempt: self.attempt,
                    outcome: Err(reason),
                });
            }
            actions.push(SupervisorAction::Close { attempt: self.attempt });
        }
        self.session_id = None;
        actions
    }

    fn retry_elapsed(&mut self) -> Result<Vec<SupervisorAction>, ConnectionError> {
        if self.state != SupervisorState::Reconnecting || !self.retry_pending {
            tracing::debug!(state = ?self.state, "ignoring stale retry timer");
            return Ok(Vec::new());
        }

        self.retry_pending = false;
        self.start()
    }

    fn heartbeat(&self) -> Vec<SupervisorAction> {
        if self.state == SupervisorState::Open && self.config.heartbeat_interval.is_some() {
            vec![SupervisorAction::SendHeartbeat { attempt: self.attempt }]
        } else {
            Vec::new()
        }
    }

    fn link_event(&mut self, attempt: AttemptId, event: LinkEvent) -> Vec<SupervisorAction> {
        let live = matches!(self.state, SupervisorState::Connecting | SupervisorState::Open);
        if attempt != self.attempt || !live {
            tracing::debug!(attempt, current = self.attempt, ?event, "ignoring stale link event");
            return Vec::new();
        }

        match event {
            LinkEvent::Ready => {
                if self.state == SupervisorState::Connecting && !self.ready {
                    self.ready = true;
                    vec![SupervisorAction::SendHandshake { attempt }]
                } else {
                    Vec::new()
                }
            },

            LinkEvent::Message => {
                if self.state == SupervisorState::Open {
                    return vec![SupervisorAction::Deliver { attempt }];
                }

                // First message is the server's acknowledgment.
                self.ready = true;
                self.state = SupervisorState::Open;
                self.retries = 0;
                self.settled = true;

                tracing::info!(attempt, "session acknowledged");
                vec![SupervisorAction::Settle { attempt, outcome: Ok(()) }, SupervisorAction::Deliver {
                    attempt,
                }]
            },

            LinkEvent::Closed { reason } => {
                let mut actions = Vec::new();
                if !self.settled {
                    self.settled = true;
                    actions.push(SupervisorAction::Settle {
                        attempt,
                        outcome: Err(ConnectionError::ClosedBeforeAck { reason: reason.clone() }),
                    });
                }
                actions.push(SupervisorAction::Close { attempt });
                self.session_id = None;

                let delay = self.config.backoff.delay(self.retries);
                self.retries = self.retries.saturating_add(1);
                self.state = SupervisorState::Reconnecting;
                self.retry_pending = true;

                tracing::warn!(attempt, %reason, ?delay, retry = self.retries, "connection lost");
                actions.push(SupervisorAction::ScheduleRetry { delay, retry: self.retries });
                actions
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backoff() -> Backoff {
        Backoff::new(Duration::from_millis(100), 2.0, Duration::from_millis(1000)).unwrap()
    }

    fn supervisor() -> Supervisor {
        Supervisor::new(SupervisorConfig {
            backoff: backoff(),
            heartbeat_interval: Some(Duration::from_secs(1)),
        })
    }

    fn link(attempt: AttemptId, event: LinkEvent) -> SupervisorInput {
        SupervisorInput::Link { attempt, event }
    }

    fn closed(reason: &str) -> LinkEvent {
        LinkEvent::Closed { reason: reason.to_string() }
    }

    /// Drive a fresh supervisor to Open on attempt 1.
    fn open_supervisor() -> Supervisor {
        let mut sup = supervisor();
        sup.handle(SupervisorInput::Start).unwrap();
        sup.handle(link(1, LinkEvent::Ready)).unwrap();
        sup.handle(link(1, LinkEvent::Message)).unwrap();
        sup
    }

    #[test]
    fn start_opens_first_attempt() {
        let mut sup = supervisor();

        let actions = sup.handle(SupervisorInput::Start).unwrap();
        assert_eq!(actions, vec![SupervisorAction::Open { attempt: 1 }]);
        assert_eq!(sup.state(), SupervisorState::Connecting);
    }

    #[test]
    fn ready_sends_handshake_but_does_not_settle() {
        let mut sup = supervisor();
        sup.handle(SupervisorInput::Start).unwrap();

        let actions = sup.handle(link(1, LinkEvent::Ready)).unwrap();
        assert_eq!(actions, vec![SupervisorAction::SendHandshake { attempt: 1 }]);
        assert_eq!(sup.state(), SupervisorState::Connecting);
    }

    #[test]
    fn first_message_settles_before_delivery() {
        let mut sup = supervisor();
        sup.handle(SupervisorInput::Start).unwrap();
        sup.handle(link(1, LinkEvent::Ready)).unwrap();

        let actions = sup.handle(link(1, LinkEvent::Message)).unwrap();
        assert_eq!(actions, vec![
            SupervisorAction::Settle { attempt: 1, outcome: Ok(()) },
            SupervisorAction::Deliver { attempt: 1 },
        ]);
        assert_eq!(sup.state(), SupervisorState::Open);

        let actions = sup.handle(link(1, LinkEvent::Message)).unwrap();
        assert_eq!(actions, vec![SupervisorAction::Deliver { attempt: 1 }]);
    }

    #[test]
    fn close_before_ack_rejects_and_schedules_retry() {
        let mut sup = supervisor();
        sup.handle(SupervisorInput::Start).unwrap();

        let actions = sup.handle(link(1, closed("refused"))).unwrap();
        assert_eq!(actions, vec![
            SupervisorAction::Settle {
                attempt: 1,
                outcome: Err(ConnectionError::ClosedBeforeAck { reason: "refused".into() }),
            },
            SupervisorAction::Close { attempt: 1 },
            SupervisorAction::ScheduleRetry { delay: Duration::from_millis(100), retry: 1 },
        ]);
        assert_eq!(sup.state(), SupervisorState::Reconnecting);
        assert!(sup.retry_pending());
    }

    #[test]
    fn message_and_close_in_same_tick_settle_once() {
        let mut sup = supervisor();
        sup.handle(SupervisorInput::Start).unwrap();
        sup.handle(link(1, LinkEvent::Ready)).unwrap();

        let mut actions = sup.handle(link(1, LinkEvent::Message)).unwrap();
        actions.extend(sup.handle(link(1, closed("reset"))).unwrap());

        let settles = actions.iter().filter(|a| matches!(a, SupervisorAction::Settle { .. })).count();
        assert_eq!(settles, 1);
    }

    #[test]
    fn repeated_failures_back_off_until_ack_resets() {
        let mut sup = supervisor();
        sup.handle(SupervisorInput::Start).unwrap();

        let mut delays = Vec::new();
        for attempt in 1..=4 {
            let actions = sup.handle(link(attempt, closed("refused"))).unwrap();
            for action in actions {
                if let SupervisorAction::ScheduleRetry { delay, .. } = action {
                    delays.push(delay.as_millis());
                }
            }
            sup.handle(SupervisorInput::RetryElapsed).unwrap();
        }
        assert_eq!(delays, vec![100, 200, 400, 800]);
        assert_eq!(sup.retries(), 4);

        sup.handle(link(5, LinkEvent::Ready)).unwrap();
        sup.handle(link(5, LinkEvent::Message)).unwrap();
        assert_eq!(sup.retries(), 0);

        let actions = sup.handle(link(5, closed("dropped"))).unwrap();
        assert!(actions.contains(&SupervisorAction::ScheduleRetry {
            delay: Duration::from_millis(100),
            retry: 1,
        }));
    }

    #[test]
    fn stale_events_are_ignored() {
        let mut sup = open_supervisor();
        sup.handle(link(1, closed("dropped"))).unwrap();
        sup.handle(SupervisorInput::RetryElapsed).unwrap();
        assert_eq!(sup.attempt(), 2);

        // Late frames from attempt 1 must not open attempt 2.
        assert!(sup.handle(link(1, LinkEvent::Message)).unwrap().is_empty());
        assert!(sup.handle(link(1, closed("late"))).unwrap().is_empty());
        assert_eq!(sup.state(), SupervisorState::Connecting);
    }

    #[test]
    fn stop_cancels_pending_retry() {
        let mut sup = open_supervisor();
        sup.handle(link(1, closed("dropped"))).unwrap();

        let actions = sup.handle(SupervisorInput::Stop).unwrap();
        assert_eq!(actions, vec![SupervisorAction::CancelRetry]);
        assert_eq!(sup.state(), SupervisorState::ShuttingDown);

        // The timer may already have fired into the driver's queue.
        assert!(sup.handle(SupervisorInput::RetryElapsed).unwrap().is_empty());
        assert_eq!(sup.handle(SupervisorInput::Start), Err(ConnectionError::ShuttingDown));
    }

    #[test]
    fn stop_is_idempotent() {
        let mut sup = open_supervisor();

        let actions = sup.handle(SupervisorInput::Stop).unwrap();
        assert_eq!(actions, vec![SupervisorAction::Close { attempt: 1 }]);
        assert!(sup.handle(SupervisorInput::Stop).unwrap().is_empty());
    }

    #[test]
    fn stop_while_connecting_rejects_attempt() {
        let mut sup = supervisor();
        sup.handle(SupervisorInput::Start).unwrap();

        let actions = sup.handle(SupervisorInput::Stop).unwrap();
        assert_eq!(actions, vec![
            SupervisorAction::Settle { attempt: 1, outcome: Err(ConnectionError::ShuttingDown) },
            SupervisorAction::Close { attempt: 1 },
        ]);
    }

    #[test]
    fn force_reconnect_bypasses_backoff() {
        let mut sup = supervisor();
        sup.handle(SupervisorInput::Start).unwrap();
        for attempt in 1..=3 {
            sup.handle(link(attempt, closed("refused"))).unwrap();
            if attempt < 3 {
                sup.handle(SupervisorInput::RetryElapsed).unwrap();
            }
        }
        assert_eq!(sup.retries(), 3);
        assert!(sup.retry_pending());

        let actions = sup.handle(SupervisorInput::ForceReconnect).unwrap();
        assert_eq!(actions, vec![SupervisorAction::CancelRetry, SupervisorAction::Open {
            attempt: 4
        }]);
        assert_eq!(sup.retries(), 0);
        assert!(!sup.retry_pending());
    }

    #[test]
    fn force_reconnect_replaces_open_connection() {
        let mut sup = open_supervisor();
        sup.record_session("s1");

        let actions = sup.handle(SupervisorInput::ForceReconnect).unwrap();
        assert_eq!(actions, vec![SupervisorAction::Close { attempt: 1 }, SupervisorAction::Open {
            attempt: 2
        }]);
        assert_eq!(sup.session_id(), None);
    }

    #[test]
    fn start_while_connecting_is_rejected() {
        let mut sup = supervisor();
        sup.handle(SupervisorInput::Start).unwrap();

        assert!(matches!(
            sup.handle(SupervisorInput::Start),
            Err(ConnectionError::InvalidState { state: SupervisorState::Connecting, .. })
        ));
    }

    #[test]
    fn session_recorded_only_while_open() {
        let mut sup = supervisor();
        sup.record_session("early");
        assert_eq!(sup.session_id(), None);

        let mut sup = open_supervisor();
        sup.record_session("s1");
        assert_eq!(sup.session_id(), Some("s1"));

        sup.handle(link(1, closed("dropped"))).unwrap();
        assert_eq!(sup.session_id(), None);
    }

    #[test]
    fn heartbeat_only_while_open() {
        let mut sup = supervisor();
        assert!(sup.handle(SupervisorInput::Heartbeat).unwrap().is_empty());

        let mut sup = open_supervisor();
        assert_eq!(sup.handle(SupervisorInput::Heartbeat).unwrap(), vec![
            SupervisorAction::SendHeartbeat { attempt: 1 }
        ]);

        sup.handle(SupervisorInput::Stop).unwrap();
        assert!(sup.handle(SupervisorInput::Heartbeat).unwrap().is_empty());
    }
}
