//! Single-fire completion gate.
//!
//! A [`CompletionGate`] is shared by every path that may finish an operation
//! (for a connection attempt: the first inbound message and the transport
//! closing). The first call to [`CompletionGate::resolve`] or
//! [`CompletionGate::reject`] wins. Every later call is a no-op that returns
//! `false`. The waiting side holds the paired [`Completion`] future.
//!
//! # Invariants
//!
//! - Settles at most once. The `settled` flag is claimed with a
//!   compare-exchange before the sender is touched, so two racing callers can
//!   never both deliver a value.
//! - A gate dropped without settling completes its future with
//!   [`CompletionError::Abandoned`].

use std::{
    future::Future,
    pin::Pin,
    sync::{
        Mutex, PoisonError,
        atomic::{AtomicBool, Ordering},
    },
    task::{Context, Poll},
};

use thiserror::Error;
use tokio::sync::oneshot;

/// Failure of the gate itself, as opposed to the operation it tracks.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionError {
    /// The gate was dropped before anyone settled it
    #[error("completion gate dropped without settling")]
    Abandoned,
}

/// Settle-once completion shared by racing completion paths.
#[derive(Debug)]
pub struct CompletionGate<T, E> {
    settled: AtomicBool,
    sender: Mutex<Option<oneshot::Sender<Result<T, E>>>>,
}

impl<T, E> CompletionGate<T, E> {
    /// Create a gate and the future that observes it.
    pub fn new() -> (Self, Completion<T, E>) {
        let (sender, receiver) = oneshot::channel();
        let gate = Self { settled: AtomicBool::new(false), sender: Mutex::new(Some(sender)) };
        (gate, Completion { receiver })
    }

    /// Complete successfully. Returns `false` if already settled.
    pub fn resolve(&self, value: T) -> bool {
        self.settle(Ok(value))
    }

    /// Complete with an error. Returns `false` if already settled.
    pub fn reject(&self, error: E) -> bool {
        self.settle(Err(error))
    }

    fn settle(&self, outcome: Result<T, E>) -> bool {
        if self.settled.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire).is_err()
        {
            return false;
        }

        let sender = self.sender.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(sender) = sender {
            // The waiter may have stopped caring; settling still counts.
            let _ = sender.send(outcome);
        }
        true
    }
}

/// Future side of a [`CompletionGate`].
#[derive(Debug)]
pub struct Completion<T, E> {
    receiver: oneshot::Receiver<Result<T, E>>,
}

impl<T, E> Future for Completion<T, E>
where
    E: From<CompletionError>,
{
    type Output = Result<T, E>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.receiver).poll(cx).map(|received| match received {
            Ok(outcome) => outcome,
            Err(_) => Err(CompletionError::Abandoned.into()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq, Eq)]
    enum TestError {
        Failed(&'static str),
        Abandoned,
    }

    impl From<CompletionError> for TestError {
        fn from(_: CompletionError) -> Self {
            Self::Abandoned
        }
    }

    #[tokio::test]
    async fn first_settlement_wins() {
        let (gate, completion) = CompletionGate::<u32, TestError>::new();

        assert!(gate.resolve(7));
        assert!(!gate.reject(TestError::Failed("late close")));
        assert!(!gate.resolve(8));

        assert_eq!(completion.await, Ok(7));
    }

    #[tokio::test]
    async fn reject_then_resolve_keeps_rejection() {
        let (gate, completion) = CompletionGate::<u32, TestError>::new();

        assert!(gate.reject(TestError::Failed("refused")));
        assert!(!gate.resolve(1));

        assert_eq!(completion.await, Err(TestError::Failed("refused")));
    }

    #[tokio::test]
    async fn dropped_gate_abandons() {
        let (gate, completion) = CompletionGate::<u32, TestError>::new();
        drop(gate);

        assert_eq!(completion.await, Err(TestError::Abandoned));
    }

    #[test]
    fn settling_after_waiter_dropped_still_counts() {
        let (gate, completion) = CompletionGate::<u32, TestError>::new();
        drop(completion);

        assert!(gate.resolve(1));
        assert!(!gate.resolve(2));
    }

    #[test]
    fn concurrent_settlers_settle_once() {
        let (gate, _completion) = CompletionGate::<usize, TestError>::new();
        let gate = std::sync::Arc::new(gate);

        let winners: usize = (0..8)
            .map(|i| {
                let gate = std::sync::Arc::clone(&gate);
                std::thread::spawn(move || {
                    if i % 2 == 0 { gate.resolve(i) } else { gate.reject(TestError::Failed("x")) }
                })
            })
            .collect::<Vec<_>>()
            .into_iter()
            .map(|handle| usize::from(handle.join().unwrap()))
            .sum();

        assert_eq!(winners, 1);
    }
}
