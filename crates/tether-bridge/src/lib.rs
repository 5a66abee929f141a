//! Tether bridge runtime
//!
//! Tokio driver that connects an external protocol [`Engine`] to a duplex
//! [`Channel`] and routes the engine's event notifications through the
//! dispatcher in `tether-core`.
//!
//! # Architecture
//!
//! ```text
//!            emit_frame / emit_event            lifecycle signals + data
//!  Engine ───────────────────────────┐   ┌──────────────────────── Channel
//!  (own execution context)           ↓   ↓         (own event callbacks)
//!                              ┌───────────────┐
//!                              │  Bridge::run  │  single task owns
//!                              │  select! loop │  Link + FrameQueue +
//!                              └───────────────┘  Dispatcher
//!                                ↓           ↓
//!                    receive_frame /     subscriber
//!                    lifecycle hooks      handlers
//! ```
//!
//! Both external parties call in from foreign execution contexts, so every
//! arrival is converted to a message and drained by one loop. The ordering
//! and exactly-once guarantees live in `tether-core`; this crate only
//! executes the actions those state machines return.
//!
//! # Components
//!
//! - [`engine`]: The consumed [`Engine`] trait and the callback conduit
//! - [`channel`]: The [`Channel`] / [`ChannelSender`] transport seam
//! - [`bridge`]: [`Bridge`], the runtime loop
//! - [`responder`]: Stock handlers (ping→pong, pairing-code logging)

pub mod bridge;
pub mod channel;
pub mod engine;
pub mod responder;

pub use bridge::{Bridge, BridgeConfig, BridgeError};
pub use channel::{Channel, ChannelError, ChannelEvent, ChannelSender};
pub use engine::{
    Engine, EngineCallbacks, EngineError, EngineMailbox, FrameNotification, callback_channel,
};
pub use responder::{install_pairing_logger, install_ping_responder};
