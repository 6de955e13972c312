//! Transport seam.
//!
//! A [`Transport`] opens one [`Link`] per connection attempt. The link's I/O
//! runs elsewhere (a spawned task for WebSocket, nothing at all in tests) and
//! reports back through an [`AttemptEvent`] channel shared by every attempt.
//! Each event carries the attempt that produced it, so the supervisor can drop
//! events from links it has already replaced.

use tether_core::AttemptId;
use tokio::sync::mpsc;

use crate::error::TransportError;

/// Something that happened on one attempt's link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// Transport is open and can carry frames
    Ready,
    /// A text frame arrived
    Frame(String),
    /// Transport closed or failed. Always the last event of an attempt.
    Closed {
        /// Close or failure reason
        reason: String,
    },
}

/// Transport event tagged with its attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptEvent {
    /// Attempt whose link produced the event
    pub attempt: AttemptId,
    /// The event
    pub event: TransportEvent,
}

/// Sender half handed to every opened link.
pub type EventSender = mpsc::UnboundedSender<AttemptEvent>;

/// Opens links.
pub trait Transport {
    /// Link type produced by this transport
    type Link: Link;

    /// Begin opening a link for `attempt`.
    ///
    /// Must not block. The outcome is reported on `events`: `Ready` once the
    /// link can carry frames, then `Frame`s, then exactly one `Closed`.
    fn open(&mut self, attempt: AttemptId, events: EventSender) -> Self::Link;
}

/// Handle to one attempt's link.
pub trait Link {
    /// Queue a text frame for the peer.
    fn send_text(&mut self, text: String) -> Result<(), TransportError>;

    /// Release the link. No further events for it are meaningful afterwards.
    fn close(&mut self);
}
