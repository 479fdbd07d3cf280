//! Saga run state.

use serde::Serialize;

/// Where a saga run stands.
///
/// State transitions:
/// ```text
/// NotStarted ──► Running ──┬──► Completed
///                          └──► Compensating ──┬──► Compensated
///                                              └──► CompensationFailed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Default)]
pub enum SagaState {
    #[default]
    NotStarted,

    /// Forward actions are being executed.
    Running,

    /// A step failed; completed steps are being undone in reverse.
    Compensating,

    /// Every step completed (terminal state).
    Completed,

    /// A step failed and every completed step was undone (terminal state).
    Compensated,

    /// Undoing a completed step failed; needs an operator (terminal state).
    CompensationFailed,
}

impl SagaState {
    /// States reachable from `self` in one step.
    pub fn allowed_next(&self) -> &'static [SagaState] {
        match self {
            SagaState::NotStarted => &[SagaState::Running],
            SagaState::Running => &[SagaState::Completed, SagaState::Compensating],
            SagaState::Compensating => &[SagaState::Compensated, SagaState::CompensationFailed],
            SagaState::Completed | SagaState::Compensated | SagaState::CompensationFailed => &[],
        }
    }

    pub fn can_transition_to(&self, next: SagaState) -> bool {
        self.allowed_next().contains(&next)
    }

    /// Returns true if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        self.allowed_next().is_empty()
    }

    /// Returns the state name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            SagaState::NotStarted => "NotStarted",
            SagaState::Running => "Running",
            SagaState::Compensating => "Compensating",
            SagaState::Completed => "Completed",
            SagaState::Compensated => "Compensated",
            SagaState::CompensationFailed => "CompensationFailed",
        }
    }
}

impl std::fmt::Display for SagaState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_state_is_not_started() {
        assert_eq!(SagaState::default(), SagaState::NotStarted);
    }

    #[test]
    fn test_forward_path() {
        assert!(SagaState::NotStarted.can_transition_to(SagaState::Running));
        assert!(SagaState::Running.can_transition_to(SagaState::Completed));
        assert!(!SagaState::NotStarted.can_transition_to(SagaState::Completed));
    }

    #[test]
    fn test_compensation_path() {
        assert!(SagaState::Running.can_transition_to(SagaState::Compensating));
        assert!(SagaState::Compensating.can_transition_to(SagaState::Compensated));
        assert!(SagaState::Compensating.can_transition_to(SagaState::CompensationFailed));
        assert!(!SagaState::Completed.can_transition_to(SagaState::Compensating));
    }

    #[test]
    fn test_terminal_states() {
        assert!(!SagaState::NotStarted.is_terminal());
        assert!(!SagaState::Running.is_terminal());
        assert!(!SagaState::Compensating.is_terminal());
        assert!(SagaState::Completed.is_terminal());
        assert!(SagaState::Compensated.is_terminal());
        assert!(SagaState::CompensationFailed.is_terminal());
    }

    #[test]
    fn test_display() {
        assert_eq!(SagaState::Running.to_string(), "Running");
        assert_eq!(
            SagaState::CompensationFailed.to_string(),
            "CompensationFailed"
        );
    }
}
