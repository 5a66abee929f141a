//! The bridge runtime: one task that owns all mutable bridge state.
//!
//! [`Bridge::run`] opens the channel, starts the engine session, and then
//! drives a single `select!` loop over the channel's lifecycle signals and
//! the engine's callback mailbox. Funneling every arrival through this one
//! loop is what makes the link's check-then-act atomic with respect to
//! close signals: the frame queue and connection state are never touched
//! from the engine's or the channel's execution context, only from here.
//!
//! # Failure policy
//!
//! Per-frame and per-event failures are isolated: transport refusals go to
//! the dispatcher's error channel and requeue the affected frames, decode
//! failures are reported and dropped, handler failures are logged. Only a
//! rejected channel open or a failed engine session terminate the bridge.

use std::sync::Arc;

use tether_core::{DispatchError, Dispatcher, Frame, Link, LinkAction, LinkError};

use crate::{
    channel::{Channel, ChannelError, ChannelEvent, ChannelSender},
    engine::{Engine, EngineError, EngineMailbox, FrameNotification},
};

/// Bridge tuning knobs.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Queue depth at which a warning is logged while the channel is not
    /// open. The queue itself stays unbounded: dropping frames would need
    /// a drop policy agreed with the engine, and none exists.
    pub queue_warn_threshold: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self { queue_warn_threshold: 1024 }
    }
}

/// Fatal bridge failures.
///
/// Everything else (transport hiccups, malformed events, failing
/// handlers) is isolated per frame or per event and surfaced through the
/// dispatcher's error channel instead of here.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BridgeError {
    /// The channel refused the connection attempt.
    #[error("channel open failed: {0}")]
    ChannelOpen(#[from] ChannelError),

    /// The link state machine rejected a lifecycle transition.
    #[error(transparent)]
    Link(#[from] LinkError),

    /// The engine session ended with an error.
    #[error("engine session failed: {0}")]
    Session(#[from] EngineError),
}

/// Ties an engine, a channel, and a dispatcher together.
///
/// Construct with all handlers already registered on the dispatcher; the
/// registry is read-only once the bridge runs.
pub struct Bridge<E: Engine, C: Channel> {
    engine: Arc<E>,
    channel: C,
    mailbox: EngineMailbox,
    dispatcher: Dispatcher,
    config: BridgeConfig,
}

impl<E: Engine, C: Channel> Bridge<E, C> {
    /// Create a bridge with default tuning.
    pub fn new(engine: Arc<E>, channel: C, mailbox: EngineMailbox, dispatcher: Dispatcher) -> Self {
        Self::with_config(engine, channel, mailbox, dispatcher, BridgeConfig::default())
    }

    /// Create a bridge with explicit tuning.
    pub fn with_config(
        engine: Arc<E>,
        channel: C,
        mailbox: EngineMailbox,
        dispatcher: Dispatcher,
        config: BridgeConfig,
    ) -> Self {
        Self { engine, channel, mailbox, dispatcher, config }
    }

    /// Run the bridge until the engine session concludes.
    ///
    /// Resolves with `Ok(())` when [`Engine::start`] resolves; the bridge
    /// has no cancellation of its own. While running, engine-produced
    /// frames are sent or queued, inbound channel data is relayed into the
    /// engine one call per frame with no transformation, lifecycle
    /// transitions invoke the engine hooks exactly once each, and event
    /// notifications are dispatched in emission order.
    ///
    /// # Errors
    ///
    /// Fatal failures only: a rejected channel open, an impossible link
    /// transition at startup, or a failed session.
    pub async fn run(self) -> Result<(), BridgeError> {
        let Self { engine, mut channel, mailbox, dispatcher, config } = self;
        let EngineMailbox { events: mut event_rx, frames: mut frame_rx } = mailbox;

        let (sender, mut signals) = channel.open().await?;
        let mut link = Link::new();
        link.begin_connect()?;

        let session_engine = Arc::clone(&engine);
        let mut session = tokio::spawn(async move { session_engine.start().await });

        let mut driver = Driver { engine, sender, link, dispatcher, config };
        loop {
            tokio::select! {
                result = &mut session => {
                    return match result {
                        Ok(Ok(())) => Ok(()),
                        Ok(Err(error)) => Err(BridgeError::Session(error)),
                        Err(join_error) => {
                            Err(BridgeError::Session(EngineError::Fatal(join_error.to_string())))
                        },
                    };
                },
                Some(signal) = signals.recv() => {
                    driver.on_channel_signal(signal).await;
                },
                Some(notification) = frame_rx.recv() => {
                    driver.on_frame_notification(notification).await;
                },
                Some(notification) = event_rx.recv() => {
                    driver.dispatcher.dispatch(notification);
                },
            }
        }
    }
}

/// Loop-side state: everything the select handlers mutate.
struct Driver<E: Engine, S: ChannelSender> {
    engine: Arc<E>,
    sender: S,
    link: Link,
    dispatcher: Dispatcher,
    config: BridgeConfig,
}

impl<E: Engine, S: ChannelSender> Driver<E, S> {
    async fn on_channel_signal(&mut self, signal: ChannelEvent) {
        match signal {
            ChannelEvent::Opened => match self.link.channel_opened() {
                Ok(actions) => {
                    tracing::info!(flushing = actions.len() - 1, "channel open");
                    self.run_actions(actions).await;
                },
                Err(error) => tracing::warn!(%error, "ignoring unexpected open signal"),
            },
            ChannelEvent::Closed => {
                tracing::info!("channel closed");
                let actions = self.link.channel_closed();
                self.run_actions(actions).await;
            },
            ChannelEvent::Data(frame) => {
                // Inbound relay: hand-off only. What the engine does with
                // the frame is invisible to this layer.
                if let Err(error) = self.engine.receive_frame(frame).await {
                    tracing::debug!(%error, "engine rejected an inbound frame");
                }
            },
        }
    }

    async fn on_frame_notification(&mut self, notification: FrameNotification) {
        if let Some(message) = notification.error {
            self.dispatcher.report(DispatchError::Engine { message });
            return;
        }
        let Some(frame) = notification.frame else {
            self.dispatcher.report(DispatchError::Engine {
                message: "frame callback carried neither error nor frame".to_owned(),
            });
            return;
        };

        let actions = self.link.submit(frame);
        if actions.is_empty() {
            let queued = self.link.queued_frames();
            if queued == self.config.queue_warn_threshold {
                tracing::warn!(queued, "outbound queue growing while channel is not open");
            }
            return;
        }
        self.run_actions(actions).await;
    }

    /// Execute link actions in order.
    ///
    /// A refused transmit surfaces on the dispatcher's error channel,
    /// restores the undelivered frames at the queue head in their original
    /// order, and closes the link locally so queueing resumes immediately;
    /// the channel's own close signal may still arrive later and is then a
    /// no-op. Lifecycle notifications in the action list still run, which
    /// keeps the hooks strictly alternating.
    async fn run_actions(&mut self, actions: Vec<LinkAction>) {
        let mut undelivered: Vec<Frame> = Vec::new();
        for action in actions {
            match action {
                LinkAction::Transmit(frame) => {
                    if !undelivered.is_empty() {
                        undelivered.push(frame);
                        continue;
                    }
                    if let Err(error) = self.sender.send(&frame).await {
                        self.dispatcher
                            .report(DispatchError::Transport { message: error.to_string() });
                        undelivered.push(frame);
                    }
                },
                LinkAction::NotifyConnected => {
                    if let Err(error) = self.engine.notify_connected().await {
                        tracing::warn!(%error, "connected hook failed");
                    }
                },
                LinkAction::NotifyDisconnected => {
                    if let Err(error) = self.engine.notify_disconnected().await {
                        tracing::warn!(%error, "disconnected hook failed");
                    }
                },
            }
        }

        if !undelivered.is_empty() {
            self.link.restore(undelivered);
            for action in self.link.channel_closed() {
                if action == LinkAction::NotifyDisconnected {
                    if let Err(error) = self.engine.notify_disconnected().await {
                        tracing::warn!(%error, "disconnected hook failed");
                    }
                }
            }
        }
    }
}
