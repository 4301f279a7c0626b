use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use super::domain::{ReceiptStatus, StepId};

/// Input handed to the submission executor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionRequest {
    pub step_id: StepId,
    pub form_id: String,
    pub resolved_fields: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionOutcome {
    pub receipt_id: String,
    pub status: ReceiptStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExecutorError {
    #[error("submission timed out")]
    Timeout,
    #[error("submission was cancelled")]
    Cancelled,
    #[error("submission rejected: {0}")]
    Rejected(String),
    #[error("submission executor unavailable: {0}")]
    Unavailable(String),
}

impl ExecutorError {
    /// Short reason stored on the failed step.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::Cancelled => "cancelled",
            Self::Rejected(_) => "rejected",
            Self::Unavailable(_) => "unavailable",
        }
    }
}

/// Performs (or simulates) the government-form submission.
#[async_trait]
pub trait SubmissionExecutor: Send + Sync {
    async fn submit(&self, request: SubmissionRequest) -> Result<SubmissionOutcome, ExecutorError>;
}

/// Offline executor that accepts every submission with a mock receipt.
#[derive(Debug, Clone, Default)]
pub struct SimulatedExecutor;

impl SimulatedExecutor {
    pub fn new() -> Self {
        Self
    }

    pub fn receipt_prefix(step_id: &StepId) -> String {
        match step_id.as_str() {
            "birth_reg" => "BR".to_string(),
            "medicare_enrolment" => "MC".to_string(),
            "jobseeker_payment" => "JS".to_string(),
            "job_service_provider" => "JP".to_string(),
            "emergency_disaster_payment" => "EDP".to_string(),
            "emergency_housing_assistance" => "EHA".to_string(),
            "carer_payment" => "CP".to_string(),
            "carer_allowance" => "CA".to_string(),
            other => other
                .split('_')
                .filter_map(|word| word.chars().next())
                .collect::<String>()
                .to_ascii_uppercase(),
        }
    }

    pub fn receipt_id(step_id: &StepId) -> String {
        let suffix = uuid::Uuid::new_v4().simple().to_string();
        format!(
            "{}-{}",
            Self::receipt_prefix(step_id),
            suffix[..8].to_ascii_uppercase()
        )
    }
}

#[async_trait]
impl SubmissionExecutor for SimulatedExecutor {
    async fn submit(&self, request: SubmissionRequest) -> Result<SubmissionOutcome, ExecutorError> {
        Ok(SubmissionOutcome {
            receipt_id: Self::receipt_id(&request.step_id),
            status: ReceiptStatus::Accepted,
        })
    }
}
