//! WebSocket transport.
//!
//! Each link is a spawned task bridging an outbound channel and a
//! `tokio-tungstenite` stream. The task reports `Ready` after the upgrade
//! completes, forwards text frames in arrival order, and always ends with a
//! single `Closed`. Protocol logic stays in the supervisor.

use futures_util::{SinkExt, StreamExt};
use tether_core::AttemptId;
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message};

use crate::{
    error::TransportError,
    transport::{AttemptEvent, EventSender, Link, Transport, TransportEvent},
};

/// Opens WebSocket links to a fixed URL.
#[derive(Debug, Clone)]
pub struct WebSocketTransport {
    url: String,
}

impl WebSocketTransport {
    /// Transport for `ws://host:port/`.
    pub fn new(host: &str, port: u16) -> Self {
        Self { url: format!("ws://{host}:{port}/") }
    }

    /// Target URL.
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Transport for WebSocketTransport {
    type Link = WebSocketLink;

    fn open(&mut self, attempt: AttemptId, events: EventSender) -> WebSocketLink {
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(run_link(self.url.clone(), attempt, outbound_rx, events));

        WebSocketLink { outbound: outbound_tx, abort_handle: handle.abort_handle() }
    }
}

/// Handle to one WebSocket connection task.
#[derive(Debug)]
pub struct WebSocketLink {
    outbound: mpsc::UnboundedSender<String>,
    abort_handle: tokio::task::AbortHandle,
}

impl Link for WebSocketLink {
    fn send_text(&mut self, text: String) -> Result<(), TransportError> {
        self.outbound.send(text).map_err(|_| TransportError::Closed)
    }

    fn close(&mut self) {
        self.abort_handle.abort();
    }
}

impl Drop for WebSocketLink {
    fn drop(&mut self) {
        self.abort_handle.abort();
    }
}

async fn run_link(
    url: String,
    attempt: AttemptId,
    outbound: mpsc::UnboundedReceiver<String>,
    events: EventSender,
) {
    let reason = match drive(&url, attempt, outbound, &events).await {
        Ok(reason) => reason,
        Err(e) => e.to_string(),
    };

    tracing::debug!(attempt, %reason, "link finished");
    // Receiver gone means the supervisor was dropped.
    let _ = events.send(AttemptEvent { attempt, event: TransportEvent::Closed { reason } });
}

/// Run the connection until it ends. Returns the close reason.
async fn drive(
    url: &str,
    attempt: AttemptId,
    mut outbound: mpsc::UnboundedReceiver<String>,
    events: &EventSender,
) -> Result<String, TransportError> {
    let (ws, _) =
        connect_async(url).await.map_err(|e| TransportError::Connection(e.to_string()))?;
    let (mut sink, mut stream) = ws.split();

    let emit = |event| events.send(AttemptEvent { attempt, event }).is_ok();
    if !emit(TransportEvent::Ready) {
        return Ok("supervisor gone".to_string());
    }

    loop {
        tokio::select! {
            text = outbound.recv() => {
                let Some(text) = text else {
                    let _ = sink.close().await;
                    return Ok("closed locally".to_string());
                };
                sink.send(Message::Text(text))
                    .await
                    .map_err(|e| TransportError::Stream(e.to_string()))?;
            }

            msg = stream.next() => match msg {
                Some(Ok(Message::Text(text))) => {
                    if !emit(TransportEvent::Frame(text)) {
                        return Ok("supervisor gone".to_string());
                    }
                },
                Some(Ok(Message::Binary(data))) => match String::from_utf8(data) {
                    Ok(text) => {
                        if !emit(TransportEvent::Frame(text)) {
                            return Ok("supervisor gone".to_string());
                        }
                    },
                    Err(_) => tracing::warn!(attempt, "dropping non-UTF-8 binary frame"),
                },
                Some(Ok(Message::Close(frame))) => {
                    let reason = frame
                        .map(|f| f.reason.to_string())
                        .filter(|r| !r.is_empty())
                        .unwrap_or_else(|| "closed by server".to_string());
                    return Ok(reason);
                },
                // Ping/pong handled by tungstenite
                Some(Ok(_)) => {},
                Some(Err(e)) => return Err(TransportError::Stream(e.to_string())),
                None => return Ok("connection ended".to_string()),
            },
        }
    }
}
