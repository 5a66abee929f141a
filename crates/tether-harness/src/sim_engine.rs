//! Scripted stand-in for the protocol engine.

use std::sync::{
    Arc, Mutex, MutexGuard, PoisonError,
    atomic::{AtomicBool, AtomicU64, Ordering},
};

use async_trait::async_trait;
use tether_bridge::{Engine, EngineCallbacks, EngineError};
use tether_core::{Frame, Jid, JidError};
use tokio::sync::Notify;

/// A lifecycle hook invocation recorded by [`SimEngine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleCall {
    /// `notify_connected`
    Connected,
    /// `notify_disconnected`
    Disconnected,
}

/// Scripted engine.
///
/// Records every call the bridge makes; the paired [`SimEngineHandle`]
/// emits events and frames through the real callback conduit, concludes
/// the session, or fails it at startup.
pub struct SimEngine {
    shared: Arc<Shared>,
}

/// Test-side controls and recordings for a [`SimEngine`].
#[derive(Clone)]
pub struct SimEngineHandle {
    callbacks: EngineCallbacks,
    shared: Arc<Shared>,
}

#[derive(Default)]
struct Shared {
    lifecycle: Mutex<Vec<LifecycleCall>>,
    received: Mutex<Vec<Frame>>,
    messages: Mutex<Vec<(Jid, String)>>,
    next_id: AtomicU64,
    fail_start: AtomicBool,
    session_over: Notify,
}

impl SimEngine {
    /// Create an engine double wired to `callbacks`.
    pub fn new(callbacks: EngineCallbacks) -> (Arc<Self>, SimEngineHandle) {
        let shared = Arc::new(Shared::default());
        (Arc::new(Self { shared: Arc::clone(&shared) }), SimEngineHandle { callbacks, shared })
    }
}

#[async_trait]
impl Engine for SimEngine {
    async fn start(&self) -> Result<(), EngineError> {
        if self.shared.fail_start.load(Ordering::SeqCst) {
            return Err(EngineError::Fatal("refused to start".to_owned()));
        }
        self.shared.session_over.notified().await;
        Ok(())
    }

    async fn send_message(&self, to: &str, text: &str) -> Result<String, EngineError> {
        let jid: Jid =
            to.parse().map_err(|error: JidError| EngineError::InvalidJid(error.to_string()))?;
        let id = self.shared.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        lock(&self.shared.messages).push((jid, text.to_owned()));
        Ok(format!("SIM{id:08X}"))
    }

    async fn receive_frame(&self, frame: Frame) -> Result<(), EngineError> {
        lock(&self.shared.received).push(frame);
        Ok(())
    }

    async fn notify_connected(&self) -> Result<(), EngineError> {
        lock(&self.shared.lifecycle).push(LifecycleCall::Connected);
        Ok(())
    }

    async fn notify_disconnected(&self) -> Result<(), EngineError> {
        lock(&self.shared.lifecycle).push(LifecycleCall::Disconnected);
        Ok(())
    }
}

impl SimEngineHandle {
    /// Emit an event notification, as the engine would from its own
    /// execution context.
    pub fn emit_event(&self, error: Option<String>, payload: Option<String>) {
        self.callbacks.emit_event(error, payload);
    }

    /// Emit an event notification carrying only a payload.
    pub fn emit_payload(&self, payload: impl Into<String>) {
        self.callbacks.emit_event(None, Some(payload.into()));
    }

    /// Emit an outbound frame.
    pub fn emit_frame(&self, frame: impl Into<Frame>) {
        self.callbacks.emit_frame(None, Some(frame.into()));
    }

    /// Emit a frame-callback error.
    pub fn emit_frame_error(&self, error: impl Into<String>) {
        self.callbacks.emit_frame(Some(error.into()), None);
    }

    /// Recorded lifecycle hook calls, in order.
    pub fn lifecycle(&self) -> Vec<LifecycleCall> {
        lock(&self.shared.lifecycle).clone()
    }

    /// Frames relayed into the engine, in order.
    pub fn received(&self) -> Vec<Frame> {
        lock(&self.shared.received).clone()
    }

    /// Messages sent through the engine, `(to, text)` in order.
    pub fn messages(&self) -> Vec<(Jid, String)> {
        lock(&self.shared.messages).clone()
    }

    /// Conclude the session: [`Engine::start`] resolves.
    pub fn end_session(&self) {
        self.shared.session_over.notify_one();
    }

    /// Make [`Engine::start`] fail immediately.
    pub fn fail_start(&self) {
        self.shared.fail_start.store(true, Ordering::SeqCst);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
