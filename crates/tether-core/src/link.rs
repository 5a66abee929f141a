//! Connection state machine for the engine↔channel link.
//!
//! This module owns the channel lifecycle state and the outbound
//! [`FrameQueue`], which together absorb the timing mismatch between "the
//! engine produced a frame" and "the channel is open".
//!
//! # Architecture: Action-Based State Machine
//!
//! This state machine follows the action pattern:
//! - Methods return `Vec<LinkAction>` (or `Result<Vec<LinkAction>, _>`)
//! - Driver code executes actions (hand frames to the channel, invoke the
//!   engine's lifecycle hooks)
//!
//! This keeps the ordering and exactly-once invariants in pure code with
//! no I/O, so they can be tested without a runtime. It also forces every
//! mutation through whatever single task owns the `Link`: callbacks from
//! the engine's execution context must arrive here as messages, never as
//! direct calls.
//!
//! # State Machine
//!
//! ```text
//! ┌──────────────┐ begin_connect ┌────────────┐ channel_opened ┌──────┐
//! │ Disconnected │──────────────>│ Connecting │───────────────>│ Open │
//! └──────────────┘               └────────────┘                └──────┘
//!        │                             │                           │
//!        │ channel_closed              │ channel_closed            │ channel_closed
//!        ↓                             ↓                           ↓
//!   ┌────────┐                    ┌────────┐                  ┌────────┐
//!   │ Closed │                    │ Closed │                  │ Closed │
//!   └────────┘                    └────────┘                  └────────┘
//! ```
//!
//! `Closed` is terminal: the link models a single connect-once lifecycle,
//! and reconnection would need an explicit state and backoff policy that no
//! caller has asked for yet.
//!
//! # Invariants
//!
//! - Frames are handed to the channel only while `Open`; in every other
//!   state, submitted frames enter the queue.
//! - On the open transition the queued prefix is drained in FIFO order and
//!   every drained frame precedes `NotifyConnected` in the action list, so
//!   the engine is told "connected" only after the flush has been handed
//!   off in full.
//! - `NotifyConnected` is produced exactly once per transition into `Open`
//!   and `NotifyDisconnected` exactly once per transition out of it; the
//!   two strictly alternate. A close that arrives before the channel ever
//!   opened produces no notification at all.

use crate::{error::LinkError, frame::Frame, queue::FrameQueue};

/// Actions returned by the link state machine.
///
/// The driver (bridge runtime or test harness) executes these in order:
/// - `Transmit`: hand the frame to the channel's send half
/// - `NotifyConnected` / `NotifyDisconnected`: invoke the engine's
///   lifecycle hook
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkAction {
    /// Hand this frame to the channel.
    Transmit(Frame),

    /// Tell the engine the channel is open.
    NotifyConnected,

    /// Tell the engine the channel is gone.
    NotifyDisconnected,
}

/// Link state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    /// No connection attempt has started.
    Disconnected,
    /// The channel is connecting; waiting for its open signal.
    Connecting,
    /// The channel is open; frames are handed off directly.
    Open,
    /// The channel closed. Terminal; frame production queues forever.
    Closed,
}

impl Default for LinkState {
    fn default() -> Self {
        Self::Disconnected
    }
}

/// Connection-manager state machine.
///
/// Owns the [`LinkState`] and the outbound [`FrameQueue`]. This is pure
/// logic: no I/O and no clocks. A single driver task must own the `Link`
/// and execute the actions it returns.
#[derive(Debug, Default)]
pub struct Link {
    state: LinkState,
    queue: FrameQueue,
}

impl Link {
    /// Create a link in `Disconnected` state with an empty queue.
    pub fn new() -> Self {
        Self { state: LinkState::Disconnected, queue: FrameQueue::new() }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> LinkState {
        self.state
    }

    /// Number of frames waiting for an open channel.
    #[must_use]
    pub fn queued_frames(&self) -> usize {
        self.queue.len()
    }

    /// Record that the channel connection was initiated.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` unless the link is `Disconnected`; the
    /// lifecycle supports a single connection attempt.
    pub fn begin_connect(&mut self) -> Result<(), LinkError> {
        if self.state != LinkState::Disconnected {
            return Err(LinkError::InvalidState {
                state: self.state,
                operation: "begin_connect",
            });
        }
        self.state = LinkState::Connecting;
        Ok(())
    }

    /// Handle the channel's open signal.
    ///
    /// Transitions to `Open` and returns the queued prefix as `Transmit`
    /// actions in FIFO order, followed by `NotifyConnected`. Frames
    /// submitted while the driver is still executing the flush land in the
    /// queue tail or transmit directly after it, never ahead of it.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` unless the link is `Connecting`. A duplicate
    /// open signal is an error so the connected hook can never fire twice
    /// for one transition.
    pub fn channel_opened(&mut self) -> Result<Vec<LinkAction>, LinkError> {
        if self.state != LinkState::Connecting {
            return Err(LinkError::InvalidState {
                state: self.state,
                operation: "channel_opened",
            });
        }
        self.state = LinkState::Open;

        let mut actions: Vec<LinkAction> =
            self.queue.drain_all().into_iter().map(LinkAction::Transmit).collect();
        actions.push(LinkAction::NotifyConnected);
        Ok(actions)
    }

    /// Handle the channel's close signal.
    ///
    /// Always a normal transition, regardless of cause. Produces
    /// `NotifyDisconnected` only when the link was actually `Open`, so the
    /// lifecycle hooks strictly alternate. Closing an already-closed link
    /// is a no-op.
    pub fn channel_closed(&mut self) -> Vec<LinkAction> {
        let was_open = self.state == LinkState::Open;
        self.state = LinkState::Closed;
        if was_open { vec![LinkAction::NotifyDisconnected] } else { Vec::new() }
    }

    /// Submit one engine-produced frame.
    ///
    /// While `Open` this returns a single `Transmit` action; in every other
    /// state the frame is queued and no action is produced. The caller owns
    /// both this state check and the close signal, so a frame can never be
    /// handed to a channel the driver already knows is closed.
    pub fn submit(&mut self, frame: Frame) -> Vec<LinkAction> {
        if self.state == LinkState::Open {
            vec![LinkAction::Transmit(frame)]
        } else {
            self.queue.push(frame);
            Vec::new()
        }
    }

    /// Put frames the channel refused back at the head of the queue.
    ///
    /// `frames` must be in their original submission order. Typically
    /// followed by [`Link::channel_closed`], since a refused send means the
    /// channel is gone.
    pub fn restore(&mut self, frames: Vec<Frame>) {
        self.queue.restore_front(frames);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(byte: u8) -> Frame {
        Frame::new(vec![byte])
    }

    fn transmitted(actions: &[LinkAction]) -> Vec<Frame> {
        actions
            .iter()
            .filter_map(|action| match action {
                LinkAction::Transmit(frame) => Some(frame.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn frames_queue_until_open_then_flush_in_order() {
        let mut link = Link::new();

        assert!(link.submit(frame(1)).is_empty());
        assert!(link.submit(frame(2)).is_empty());
        assert_eq!(link.queued_frames(), 2);

        link.begin_connect().unwrap();
        let actions = link.channel_opened().unwrap();

        assert_eq!(transmitted(&actions), vec![frame(1), frame(2)]);
        assert_eq!(actions.last(), Some(&LinkAction::NotifyConnected));
        assert_eq!(link.queued_frames(), 0);
    }

    #[test]
    fn notify_connected_comes_after_the_whole_flush() {
        let mut link = Link::new();
        link.submit(frame(1));
        link.submit(frame(2));
        link.begin_connect().unwrap();

        let actions = link.channel_opened().unwrap();
        let notify_at = actions
            .iter()
            .position(|action| *action == LinkAction::NotifyConnected)
            .unwrap();
        assert_eq!(notify_at, actions.len() - 1);
    }

    #[test]
    fn open_with_empty_queue_only_notifies() {
        let mut link = Link::new();
        link.begin_connect().unwrap();

        let actions = link.channel_opened().unwrap();
        assert_eq!(actions, vec![LinkAction::NotifyConnected]);
    }

    #[test]
    fn submit_while_open_transmits_directly() {
        let mut link = Link::new();
        link.begin_connect().unwrap();
        link.channel_opened().unwrap();

        let actions = link.submit(frame(7));
        assert_eq!(actions, vec![LinkAction::Transmit(frame(7))]);
        assert_eq!(link.queued_frames(), 0);
    }

    #[test]
    fn close_resumes_queueing() {
        let mut link = Link::new();
        link.begin_connect().unwrap();
        link.channel_opened().unwrap();

        let actions = link.channel_closed();
        assert_eq!(actions, vec![LinkAction::NotifyDisconnected]);
        assert_eq!(link.state(), LinkState::Closed);

        assert!(link.submit(frame(9)).is_empty());
        assert_eq!(link.queued_frames(), 1);
    }

    #[test]
    fn close_before_open_does_not_notify() {
        let mut link = Link::new();
        link.begin_connect().unwrap();

        // The channel died during the connection attempt; the engine was
        // never told "connected", so it must not be told "disconnected".
        assert!(link.channel_closed().is_empty());
        assert_eq!(link.state(), LinkState::Closed);
    }

    #[test]
    fn double_close_is_a_no_op() {
        let mut link = Link::new();
        link.begin_connect().unwrap();
        link.channel_opened().unwrap();

        assert_eq!(link.channel_closed(), vec![LinkAction::NotifyDisconnected]);
        assert!(link.channel_closed().is_empty());
    }

    #[test]
    fn duplicate_open_signal_is_rejected() {
        let mut link = Link::new();
        link.begin_connect().unwrap();
        link.channel_opened().unwrap();

        let result = link.channel_opened();
        assert!(matches!(result, Err(LinkError::InvalidState { .. })));
    }

    #[test]
    fn connect_is_once_only() {
        let mut link = Link::new();
        link.begin_connect().unwrap();
        assert!(matches!(link.begin_connect(), Err(LinkError::InvalidState { .. })));

        link.channel_closed();
        // Closed is terminal; no reconnect.
        assert!(matches!(link.begin_connect(), Err(LinkError::InvalidState { .. })));
    }

    #[test]
    fn restore_puts_frames_ahead_of_later_submissions() {
        let mut link = Link::new();
        link.begin_connect().unwrap();
        link.channel_opened().unwrap();

        // 1 and 2 bounced off a dying channel.
        link.restore(vec![frame(1), frame(2)]);
        link.channel_closed();
        link.submit(frame(3));

        assert_eq!(link.queue.drain_all(), vec![frame(1), frame(2), frame(3)]);
    }
}
