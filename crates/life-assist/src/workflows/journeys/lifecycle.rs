use serde::Serialize;

use super::domain::{Step, StepStatus};

/// Inputs that move a step through its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepTransition {
    /// Open the step for review (prefill).
    Start,
    /// Reopen a failed step.
    Retry,
    /// Executor confirmed the submission.
    Complete,
    /// Executor failed, timed out, or was cancelled.
    Fail,
}

impl StepTransition {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Retry => "retry",
            Self::Complete => "complete",
            Self::Fail => "fail",
        }
    }
}

/// The complete transition table; anything absent is rejected.
pub const fn next_status(from: StepStatus, transition: StepTransition) -> Option<StepStatus> {
    use StepStatus::*;
    use StepTransition::*;

    match (from, transition) {
        (Pending, Start) => Some(InProgress),
        (InProgress, Start) => Some(InProgress),
        (Failed, Retry) => Some(InProgress),
        (InProgress, Complete) => Some(Completed),
        (InProgress, Fail) => Some(Failed),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LifecycleError {
    #[error("cannot {} a step that is {}", transition.label(), from.label())]
    InvalidTransition {
        from: StepStatus,
        transition: StepTransition,
    },
    #[error("submission retries exhausted after {attempts} attempts")]
    RetriesExhausted { attempts: u32 },
}

/// Applies transitions to steps, bounding retries of failed submissions.
#[derive(Debug, Clone, Copy)]
pub struct StepLifecycle {
    max_attempts: u32,
}

impl StepLifecycle {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
        }
    }

    /// The transition that opens `step` for another round of review.
    pub fn reopen_transition(status: StepStatus) -> StepTransition {
        match status {
            StepStatus::Failed => StepTransition::Retry,
            _ => StepTransition::Start,
        }
    }

    /// Validates without mutating.
    pub fn check(&self, step: &Step, transition: StepTransition) -> Result<StepStatus, LifecycleError> {
        let to = next_status(step.status, transition).ok_or(LifecycleError::InvalidTransition {
            from: step.status,
            transition,
        })?;

        if transition == StepTransition::Retry && step.attempts >= self.max_attempts {
            return Err(LifecycleError::RetriesExhausted {
                attempts: step.attempts,
            });
        }

        Ok(to)
    }

    /// Moves the step and returns the status it left.
    pub fn apply(&self, step: &mut Step, transition: StepTransition) -> Result<StepStatus, LifecycleError> {
        let to = self.check(step, transition)?;
        let from = step.status;
        step.status = to;
        if to != StepStatus::Failed {
            step.failure = None;
        }
        Ok(from)
    }
}
