//! Fuzz target for the Supervisor state machine
//!
//! Drive the supervisor with arbitrary input sequences, including events for
//! stale and future attempts.
//!
//! # Invariants
//!
//! - Each attempt is settled at most once
//! - A message is delivered only for a settled, current attempt
//! - Retry delays never exceed the backoff cap
//! - A retry is pending exactly while reconnecting
//! - Nothing happens after Stop

#![no_main]

use std::{collections::HashSet, time::Duration};

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use tether_core::{
    Backoff, LinkEvent, Supervisor, SupervisorAction, SupervisorConfig, SupervisorInput,
    SupervisorState,
};

#[derive(Debug, Clone, Arbitrary)]
enum Op {
    Start,
    Stop,
    ForceReconnect,
    RetryElapsed,
    Heartbeat,
    Ready { lag: u8 },
    Message { lag: u8 },
    Closed { lag: u8 },
}

fuzz_target!(|ops: Vec<Op>| {
    let backoff = Backoff::new(Duration::from_millis(100), 2.0, Duration::from_secs(5))
        .expect("valid backoff");
    let max = backoff.max();
    let mut supervisor = Supervisor::new(SupervisorConfig {
        backoff,
        heartbeat_interval: Some(Duration::from_secs(25)),
    });

    let mut settled = HashSet::new();
    let mut stopped = false;

    for op in ops {
        let current = supervisor.attempt();
        let target = |lag: u8| current.saturating_sub(u64::from(lag % 3));
        let input = match op {
            Op::Start => SupervisorInput::Start,
            Op::Stop => SupervisorInput::Stop,
            Op::ForceReconnect => SupervisorInput::ForceReconnect,
            Op::RetryElapsed => SupervisorInput::RetryElapsed,
            Op::Heartbeat => SupervisorInput::Heartbeat,
            Op::Ready { lag } => SupervisorInput::Link { attempt: target(lag), event: LinkEvent::Ready },
            Op::Message { lag } => {
                SupervisorInput::Link { attempt: target(lag), event: LinkEvent::Message }
            },
            Op::Closed { lag } => SupervisorInput::Link {
                attempt: target(lag),
                event: LinkEvent::Closed { reason: "fuzz".to_string() },
            },
        };

        let Ok(actions) = supervisor.handle(input) else {
            continue;
        };
        if stopped {
            assert!(actions.is_empty(), "actions after stop: {actions:?}");
        }

        for action in actions {
            match action {
                SupervisorAction::Settle { attempt, .. } => {
                    assert!(settled.insert(attempt), "attempt {attempt} settled twice");
                },
                SupervisorAction::Deliver { attempt } => {
                    assert_eq!(attempt, supervisor.attempt());
                    assert!(settled.contains(&attempt));
                },
                SupervisorAction::ScheduleRetry { delay, .. } => assert!(delay <= max),
                _ => {},
            }
        }

        if supervisor.state() == SupervisorState::ShuttingDown {
            stopped = true;
        }
        assert_eq!(supervisor.retry_pending(), supervisor.state() == SupervisorState::Reconnecting);
        if supervisor.is_open() {
            assert_eq!(supervisor.retries(), 0);
        }
    }
});
