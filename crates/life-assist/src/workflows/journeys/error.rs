use serde::{Deserialize, Serialize};

use super::audit::AuditError;
use super::consent::ConsentError;
use super::domain::{JourneyId, StepId};
use super::executor::ExecutorError;
use super::forms::MappingError;
use super::intake::IntakeViolation;
use super::lifecycle::LifecycleError;
use super::repository::RepositoryError;
use super::vault::VaultError;

/// Stable error classification recorded in audit entries and HTTP bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    NotFound,
    Expired,
    ConsentRequired,
    InvalidTransition,
    InvalidScope,
    ExecutorFailure,
    Internal,
}

impl ErrorKind {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::NotFound => "not_found",
            Self::Expired => "expired",
            Self::ConsentRequired => "consent_required",
            Self::InvalidTransition => "invalid_transition",
            Self::InvalidScope => "invalid_scope",
            Self::ExecutorFailure => "executor_failure",
            Self::Internal => "internal",
        }
    }
}

/// Error raised by the journey service.
#[derive(Debug, thiserror::Error)]
pub enum JourneyError {
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("{0} not found")]
    NotFound(String),
    #[error("vaulted intake for journey {0} has expired")]
    Expired(JourneyId),
    #[error("no active consent covers step {step_id} of journey {journey_id}")]
    ConsentRequired {
        journey_id: JourneyId,
        step_id: StepId,
    },
    #[error(transparent)]
    InvalidTransition(#[from] LifecycleError),
    #[error("consent scope references steps outside the journey: {}", join(.0))]
    InvalidScope(Vec<StepId>),
    #[error(transparent)]
    ExecutorFailure(#[from] ExecutorError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error("internal error: {0}")]
    Internal(String),
}

impl JourneyError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Expired(_) => ErrorKind::Expired,
            Self::ConsentRequired { .. } => ErrorKind::ConsentRequired,
            Self::InvalidTransition(_) => ErrorKind::InvalidTransition,
            Self::InvalidScope(_) => ErrorKind::InvalidScope,
            Self::ExecutorFailure(_) => ErrorKind::ExecutorFailure,
            Self::Repository(RepositoryError::NotFound) => ErrorKind::NotFound,
            Self::Repository(_) | Self::Internal(_) => ErrorKind::Internal,
        }
    }

    pub(crate) fn journey_not_found(journey_id: &JourneyId) -> Self {
        Self::NotFound(format!("journey {journey_id}"))
    }

    pub(crate) fn step_not_found(journey_id: &JourneyId, step_id: &StepId) -> Self {
        Self::NotFound(format!("step {step_id} in journey {journey_id}"))
    }
}

fn join(steps: &[StepId]) -> String {
    steps
        .iter()
        .map(StepId::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

impl From<IntakeViolation> for JourneyError {
    fn from(value: IntakeViolation) -> Self {
        Self::Validation(value.to_string())
    }
}

impl From<VaultError> for JourneyError {
    fn from(value: VaultError) -> Self {
        match value {
            VaultError::NotFound(journey_id) => Self::NotFound(format!("intake for journey {journey_id}")),
            VaultError::Expired(journey_id) => Self::Expired(journey_id),
            VaultError::Unavailable(reason) => Self::Internal(reason),
        }
    }
}

impl From<ConsentError> for JourneyError {
    fn from(value: ConsentError) -> Self {
        match value {
            ConsentError::InvalidScope(steps) => Self::InvalidScope(steps),
            ConsentError::EmptyScope
            | ConsentError::NonPositiveTtl
            | ConsentError::TtlOutOfRange => {
                Self::Validation(value.to_string())
            }
            ConsentError::Unavailable(reason) => Self::Internal(reason),
        }
    }
}

impl From<MappingError> for JourneyError {
    fn from(value: MappingError) -> Self {
        Self::Internal(value.to_string())
    }
}

impl From<AuditError> for JourneyError {
    fn from(value: AuditError) -> Self {
        Self::Internal(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::journeys::domain::StepStatus;
    use crate::workflows::journeys::lifecycle::StepTransition;

    #[test]
    fn component_errors_keep_their_kind() {
        let expired: JourneyError = VaultError::Expired(JourneyId("journey_a".to_string())).into();
        assert_eq!(expired.kind(), ErrorKind::Expired);

        let scope: JourneyError = ConsentError::InvalidScope(vec![StepId::from("x")]).into();
        assert_eq!(scope.kind(), ErrorKind::InvalidScope);

        let empty: JourneyError = ConsentError::EmptyScope.into();
        assert_eq!(empty.kind(), ErrorKind::Validation);

        let unbounded: JourneyError = ConsentError::TtlOutOfRange.into();
        assert_eq!(unbounded.kind(), ErrorKind::Validation);

        let transition: JourneyError = LifecycleError::InvalidTransition {
            from: StepStatus::Completed,
            transition: StepTransition::Start,
        }
        .into();
        assert_eq!(transition.kind(), ErrorKind::InvalidTransition);

        let timeout: JourneyError = ExecutorError::Timeout.into();
        assert_eq!(timeout.kind(), ErrorKind::ExecutorFailure);
        assert_eq!(timeout.kind().label(), "executor_failure");
    }
}
