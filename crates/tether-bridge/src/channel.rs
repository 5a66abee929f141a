//! The duplex-channel boundary.
//!
//! The channel is the socket-like connection to the remote messaging
//! service. Its handshake and transport details are out of scope here; the
//! bridge only needs to open it once, push frames through the send half,
//! and observe its lifecycle signals.

use async_trait::async_trait;
use tether_core::Frame;
use tokio::sync::mpsc;

/// Errors surfaced by the channel.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChannelError {
    /// The connection attempt failed outright.
    #[error("channel open failed: {0}")]
    Open(String),

    /// A frame could not be transmitted.
    #[error("channel send failed: {0}")]
    Send(String),

    /// The channel is no longer usable.
    #[error("channel is closed")]
    Closed,
}

/// Lifecycle signals emitted by the channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    /// The connection is established; frames may be sent.
    Opened,

    /// The connection is gone. Always a normal transition, whatever the
    /// cause.
    Closed,

    /// One frame arrived from the remote side.
    Data(Frame),
}

/// A connectable duplex channel.
///
/// [`Channel::open`] initiates the connection and returns the send half
/// together with the stream of lifecycle signals. The `Opened` signal
/// arrives on the stream once the connection is actually established; the
/// stream ending means the channel will never signal again.
#[async_trait]
pub trait Channel: Send + 'static {
    /// The send half handed out by `open`.
    type Sender: ChannelSender;

    /// Initiate the connection.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::Open`] if the attempt cannot even start;
    /// failures after that arrive as a `Closed` signal on the stream.
    async fn open(
        &mut self,
    ) -> Result<(Self::Sender, mpsc::UnboundedReceiver<ChannelEvent>), ChannelError>;
}

/// Send half of an open channel.
#[async_trait]
pub trait ChannelSender: Send + Sync + 'static {
    /// Transmit one frame.
    async fn send(&self, frame: &Frame) -> Result<(), ChannelError>;
}
