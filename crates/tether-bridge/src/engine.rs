//! The engine boundary.
//!
//! The engine is the external collaborator that owns sessions, crypto, and
//! wire encoding. The bridge consumes it through the [`Engine`] trait and
//! hands it an [`EngineCallbacks`] at construction; the engine invokes
//! those callbacks from its own execution context, asynchronously and
//! without any coordination with the bridge's other operations.
//!
//! Callback invocations are therefore turned into messages on unbounded
//! channels: they return immediately, never block the engine, and never
//! touch bridge state from a foreign context. The [`EngineMailbox`] half
//! is drained by the single task running [`crate::Bridge::run`].

use async_trait::async_trait;
use tether_core::{EventNotification, Frame};
use tokio::sync::mpsc;

/// Errors the engine reports across the bridge boundary.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    /// The recipient identifier did not parse.
    #[error("invalid jid: {0}")]
    InvalidJid(String),

    /// A message could not be sent.
    #[error("send failed: {0}")]
    Send(String),

    /// The engine's storage path was unusable.
    #[error("storage unusable: {0}")]
    Storage(String),

    /// The session ended with an unrecoverable error.
    #[error("fatal engine failure: {0}")]
    Fatal(String),
}

/// The protocol engine as consumed by the bridge.
///
/// [`Engine::start`] runs for the whole session: it resolves when the
/// session concludes and rejects on fatal startup failure. Every other
/// hook is expected to return promptly, queueing work inside the engine
/// rather than blocking the caller.
#[async_trait]
pub trait Engine: Send + Sync + 'static {
    /// Run the session to completion.
    async fn start(&self) -> Result<(), EngineError>;

    /// Send a text message; resolves with the engine-assigned message id.
    ///
    /// `to` must be a syntactically valid identifier of the form
    /// `user@server` (optionally device-qualified). The engine rejects
    /// malformed identifiers with [`EngineError::InvalidJid`] and send
    /// failures with [`EngineError::Send`]; the bridge never retries on
    /// the caller's behalf.
    async fn send_message(&self, to: &str, text: &str) -> Result<String, EngineError>;

    /// Hand one inbound frame to the engine.
    async fn receive_frame(&self, frame: Frame) -> Result<(), EngineError>;

    /// Tell the engine the channel is open.
    async fn notify_connected(&self) -> Result<(), EngineError>;

    /// Tell the engine the channel is gone.
    async fn notify_disconnected(&self) -> Result<(), EngineError>;
}

/// An outbound-frame notification as received on the engine's frame
/// callback: the `(err, frame)` pair, either half optional.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FrameNotification {
    /// Engine-reported error, verbatim.
    pub error: Option<String>,
    /// The produced frame.
    pub frame: Option<Frame>,
}

impl FrameNotification {
    /// A notification carrying only a frame.
    pub fn frame(frame: impl Into<Frame>) -> Self {
        Self { error: None, frame: Some(frame.into()) }
    }

    /// A notification carrying only an engine error.
    pub fn error(error: impl Into<String>) -> Self {
        Self { error: Some(error.into()), frame: None }
    }
}

/// Cloneable callback handle given to the engine at construction.
///
/// Sends never block. A notification emitted after the bridge has shut
/// down is dropped with a debug log; the session is ending anyway, and
/// there is nobody left to deliver to.
#[derive(Debug, Clone)]
pub struct EngineCallbacks {
    events: mpsc::UnboundedSender<EventNotification>,
    frames: mpsc::UnboundedSender<FrameNotification>,
}

impl EngineCallbacks {
    /// Report an event notification.
    pub fn emit_event(&self, error: Option<String>, payload: Option<String>) {
        if self.events.send(EventNotification { error, payload }).is_err() {
            tracing::debug!("event notification after bridge shutdown, dropped");
        }
    }

    /// Report an outbound frame.
    pub fn emit_frame(&self, error: Option<String>, frame: Option<Frame>) {
        if self.frames.send(FrameNotification { error, frame }).is_err() {
            tracing::debug!("frame notification after bridge shutdown, dropped");
        }
    }
}

/// Receiving half of the callback conduit, owned by the bridge loop.
#[derive(Debug)]
pub struct EngineMailbox {
    pub(crate) events: mpsc::UnboundedReceiver<EventNotification>,
    pub(crate) frames: mpsc::UnboundedReceiver<FrameNotification>,
}

/// Create a connected callback/mailbox pair.
///
/// The [`EngineCallbacks`] half goes to the engine's constructor; the
/// [`EngineMailbox`] half goes to [`crate::Bridge::new`].
pub fn callback_channel() -> (EngineCallbacks, EngineMailbox) {
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let (frames_tx, frames_rx) = mpsc::unbounded_channel();
    (
        EngineCallbacks { events: events_tx, frames: frames_tx },
        EngineMailbox { events: events_rx, frames: frames_rx },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn emitted_notifications_land_in_the_mailbox_in_order() {
        let (callbacks, mut mailbox) = callback_channel();

        callbacks.emit_event(None, Some("first".to_owned()));
        callbacks.emit_event(Some("broken".to_owned()), None);
        callbacks.emit_frame(None, Some(Frame::new(vec![1])));

        let first = mailbox.events.recv().await.unwrap();
        assert_eq!(first.payload.as_deref(), Some("first"));
        let second = mailbox.events.recv().await.unwrap();
        assert_eq!(second.error.as_deref(), Some("broken"));

        let frame = mailbox.frames.recv().await.unwrap();
        assert_eq!(frame.frame, Some(Frame::new(vec![1])));
    }

    #[tokio::test]
    async fn emitting_after_mailbox_drop_is_harmless() {
        let (callbacks, mailbox) = callback_channel();
        drop(mailbox);

        callbacks.emit_event(None, Some("late".to_owned()));
        callbacks.emit_frame(None, Some(Frame::new(vec![1])));
    }
}
