//! Per-call dispatch state machine

use std::fmt;

/// Stages of one `Dispatcher::dispatch` call.
///
/// `Received → Resolving → Executing → Logged → Completed`, or `Rejected`
/// straight from `Received`/`Resolving`. Nothing persists between calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchState {
    Received,
    Resolving,
    Executing,
    Logged,
    Completed,
    Rejected,
}

impl DispatchState {
    /// Whether moving from `self` to `next` is a legal step
    #[must_use]
    pub fn can_transition_to(self, next: DispatchState) -> bool {
        use DispatchState::{Completed, Executing, Logged, Received, Rejected, Resolving};

        matches!(
            (self, next),
            (Received, Resolving)
                | (Received | Resolving, Rejected)
                | (Resolving, Executing)
                | (Executing, Logged)
                | (Logged, Completed)
        )
    }

    /// Whether the call has finished
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, DispatchState::Completed | DispatchState::Rejected)
    }
}

impl fmt::Display for DispatchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DispatchState::Received => "received",
            DispatchState::Resolving => "resolving",
            DispatchState::Executing => "executing",
            DispatchState::Logged => "logged",
            DispatchState::Completed => "completed",
            DispatchState::Rejected => "rejected",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path() {
        let path = [
            DispatchState::Received,
            DispatchState::Resolving,
            DispatchState::Executing,
            DispatchState::Logged,
            DispatchState::Completed,
        ];
        for pair in path.windows(2) {
            assert!(pair[0].can_transition_to(pair[1]), "{} -> {}", pair[0], pair[1]);
        }
        assert!(DispatchState::Completed.is_terminal());
    }

    #[test]
    fn test_no_rejection_after_execution() {
        assert!(DispatchState::Resolving.can_transition_to(DispatchState::Rejected));
        assert!(!DispatchState::Executing.can_transition_to(DispatchState::Rejected));
        assert!(!DispatchState::Logged.can_transition_to(DispatchState::Rejected));
        assert!(!DispatchState::Received.can_transition_to(DispatchState::Executing));
    }
}
