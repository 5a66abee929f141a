//! Tether bridge core logic
//!
//! Pure state machine logic for bridging an external protocol engine to a
//! duplex byte channel, completely decoupled from I/O. This enables
//! deterministic testing of the ordering and exactly-once invariants that
//! make the bridge correct.
//!
//! # Architecture
//!
//! The engine (session, cryptography, wire encoding) and the channel (the
//! actual socket) both live outside this crate and run on their own
//! execution contexts. Everything here is a deterministic state machine:
//! state transitions produce declarative actions that describe intended
//! effects rather than executing them directly. A runtime driver is
//! responsible for interpreting and executing those actions, and for
//! funneling all callback arrivals through the single task that owns the
//! state.
//!
//! This separation keeps bridge correctness independent of execution
//! concerns and allows the same code to be reused across the production
//! runtime and deterministic unit tests.
//!
//! # Components
//!
//! - [`link`]: Connection state machine and outbound frame queue
//! - [`queue`]: FIFO frame buffering
//! - [`event`]: Typed taxonomy of engine events and notification decoding
//! - [`dispatch`]: Handler registry and event routing
//! - [`jid`]: Messaging-network identifiers
//! - [`frame`]: Opaque transport frames
//! - [`error`]: Link error types

pub mod dispatch;
pub mod error;
pub mod event;
pub mod frame;
pub mod jid;
pub mod link;
pub mod queue;

pub use dispatch::{DispatchError, Dispatcher, EventNotification, Handler, HandlerResult};
pub use error::LinkError;
pub use event::{DecodeError, Event, EventKind, MessageInfo, MessageSource};
pub use frame::Frame;
pub use jid::{Jid, JidError};
pub use link::{Link, LinkAction, LinkState};
pub use queue::FrameQueue;
