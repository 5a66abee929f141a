//! Error types for the link state machine.

use crate::link::LinkState;

/// Errors from [`crate::link::Link`] state transitions.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LinkError {
    /// An operation was attempted in a state that does not allow it.
    #[error("invalid state transition: cannot {operation} from {state:?}")]
    InvalidState {
        /// State the link was in when the operation was attempted.
        state: LinkState,
        /// Operation that was attempted.
        operation: &'static str,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_state_names_the_operation() {
        let error =
            LinkError::InvalidState { state: LinkState::Closed, operation: "channel_opened" };
        assert_eq!(
            error.to_string(),
            "invalid state transition: cannot channel_opened from Closed"
        );
    }
}
