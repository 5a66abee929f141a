//! Deterministic test doubles for the Tether bridge.
//!
//! Scripted implementations of the `Engine` and `Channel` seams for
//! driving the bridge loop from tests, plus small timing helpers for
//! paused-time tokio tests. The doubles record everything the bridge does
//! to them, so integration tests assert on ordering and exactly-once
//! behavior directly.

pub mod sim_channel;
pub mod sim_engine;

use std::time::Duration;

pub use sim_channel::{SimChannel, SimChannelHandle, SimSender};
pub use sim_engine::{LifecycleCall, SimEngine, SimEngineHandle};

/// Let the bridge task drain everything already queued.
///
/// On the current-thread runtime a sleep hands the scheduler to the bridge
/// task until it goes idle; under `start_paused` the sleep itself costs no
/// wall-clock time.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(10)).await;
}

/// Poll `condition` until it holds, yielding between polls.
///
/// Returns `false` if the condition was not reached after a generous
/// number of yields; tests assert on the result.
pub async fn wait_until(condition: impl Fn() -> bool) -> bool {
    for _ in 0..10_000 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
    condition()
}
