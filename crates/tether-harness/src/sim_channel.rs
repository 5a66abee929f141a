//! Scripted stand-in for the external duplex channel.

use std::sync::{
    Arc, Mutex, MutexGuard, PoisonError,
    atomic::{AtomicBool, Ordering},
};

use async_trait::async_trait;
use tether_bridge::{Channel, ChannelError, ChannelEvent, ChannelSender};
use tether_core::Frame;
use tokio::sync::mpsc;

/// Scripted duplex channel.
///
/// Created together with a [`SimChannelHandle`] the test drives: signal
/// open and close, deliver inbound frames, inject send failures, and
/// inspect what the bridge transmitted.
pub struct SimChannel {
    signals: Option<mpsc::UnboundedReceiver<ChannelEvent>>,
    shared: Arc<Shared>,
}

/// Test-side controls for a [`SimChannel`].
#[derive(Clone)]
pub struct SimChannelHandle {
    signals: mpsc::UnboundedSender<ChannelEvent>,
    shared: Arc<Shared>,
}

/// Send half handed to the bridge by [`SimChannel::open`].
pub struct SimSender {
    shared: Arc<Shared>,
}

#[derive(Default)]
struct Shared {
    sent: Mutex<Vec<Frame>>,
    fail_sends: AtomicBool,
    refuse_open: AtomicBool,
}

impl SimChannel {
    /// Create a channel and its scripting handle.
    pub fn new() -> (Self, SimChannelHandle) {
        let (signals_tx, signals_rx) = mpsc::unbounded_channel();
        let shared = Arc::new(Shared::default());
        (
            Self { signals: Some(signals_rx), shared: Arc::clone(&shared) },
            SimChannelHandle { signals: signals_tx, shared },
        )
    }
}

#[async_trait]
impl Channel for SimChannel {
    type Sender = SimSender;

    async fn open(
        &mut self,
    ) -> Result<(SimSender, mpsc::UnboundedReceiver<ChannelEvent>), ChannelError> {
        if self.shared.refuse_open.load(Ordering::SeqCst) {
            return Err(ChannelError::Open("refused by script".to_owned()));
        }
        let signals = self
            .signals
            .take()
            .ok_or_else(|| ChannelError::Open("channel already opened".to_owned()))?;
        Ok((SimSender { shared: Arc::clone(&self.shared) }, signals))
    }
}

#[async_trait]
impl ChannelSender for SimSender {
    async fn send(&self, frame: &Frame) -> Result<(), ChannelError> {
        if self.shared.fail_sends.load(Ordering::SeqCst) {
            return Err(ChannelError::Send("failing by script".to_owned()));
        }
        lock(&self.shared.sent).push(frame.clone());
        Ok(())
    }
}

impl SimChannelHandle {
    /// Signal that the connection is established.
    pub fn signal_opened(&self) {
        let _ = self.signals.send(ChannelEvent::Opened);
    }

    /// Signal that the connection is gone.
    pub fn signal_closed(&self) {
        let _ = self.signals.send(ChannelEvent::Closed);
    }

    /// Deliver one inbound frame from the remote side.
    pub fn deliver(&self, frame: impl Into<Frame>) {
        let _ = self.signals.send(ChannelEvent::Data(frame.into()));
    }

    /// Frames the bridge handed to the channel, in transmission order.
    pub fn sent(&self) -> Vec<Frame> {
        lock(&self.shared.sent).clone()
    }

    /// Make every subsequent send fail (or succeed again).
    pub fn fail_sends(&self, fail: bool) {
        self.shared.fail_sends.store(fail, Ordering::SeqCst);
    }

    /// Make [`Channel::open`] itself fail.
    pub fn refuse_open(&self) {
        self.shared.refuse_open.store(true, Ordering::SeqCst);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
