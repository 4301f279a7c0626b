use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque journey identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JourneyId(pub String);

impl JourneyId {
    pub fn generate() -> Self {
        Self(format!("journey_{}", uuid::Uuid::new_v4().simple()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JourneyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Step slug, unique within a journey.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StepId(pub String);

impl StepId {
    pub fn new(slug: impl Into<String>) -> Self {
        Self(slug.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StepId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifeEvent {
    Birth,
    Unemployment,
    DisasterRecovery,
    CarerSupport,
}

impl LifeEvent {
    /// Priority used when one intake satisfies several life events.
    pub const fn by_priority() -> [Self; 4] {
        [
            Self::Birth,
            Self::Unemployment,
            Self::DisasterRecovery,
            Self::CarerSupport,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Birth => "Birth of a Child",
            Self::Unemployment => "Job Loss",
            Self::DisasterRecovery => "Disaster Recovery",
            Self::CarerSupport => "Carer Support",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
}

impl StepStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::InProgress => "In Progress",
            Self::Completed => "Completed",
            Self::Failed => "Failed",
        }
    }
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// PII-free record of the last prefill; field values stay in the vault.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrefillSnapshot {
    pub form_id: String,
    pub resolved: usize,
    pub defaulted: usize,
    pub missing: usize,
    pub data_hash: String,
    pub captured_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReceiptStatus {
    Accepted,
    Queued,
}

/// Confirmation returned by the submission executor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub receipt_id: String,
    pub step_id: StepId,
    pub status: ReceiptStatus,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    pub id: StepId,
    pub title: String,
    pub form_schema_ref: String,
    pub status: StepStatus,
    pub attempts: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefill_snapshot: Option<PrefillSnapshot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receipt: Option<Receipt>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Journey {
    pub id: JourneyId,
    life_event: LifeEvent,
    pub jurisdiction: String,
    pub template_version: String,
    pub steps: Vec<Step>,
    pub created_at: DateTime<Utc>,
}

impl Journey {
    pub(crate) fn new(
        id: JourneyId,
        life_event: LifeEvent,
        jurisdiction: String,
        template_version: String,
        steps: Vec<Step>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            life_event,
            jurisdiction,
            template_version,
            steps,
            created_at,
        }
    }

    /// The life event is fixed at creation; there is no setter.
    pub fn life_event(&self) -> LifeEvent {
        self.life_event
    }

    pub fn step(&self, step_id: &StepId) -> Option<&Step> {
        self.steps.iter().find(|step| &step.id == step_id)
    }

    pub(crate) fn step_mut(&mut self, step_id: &StepId) -> Option<&mut Step> {
        self.steps.iter_mut().find(|step| &step.id == step_id)
    }

    pub fn has_step(&self, step_id: &StepId) -> bool {
        self.step(step_id).is_some()
    }

    pub fn status(&self) -> JourneyStatus {
        JourneyStatus::derive(&self.steps)
    }

    pub fn plan_view(&self) -> JourneyPlanView {
        let completed_steps = self
            .steps
            .iter()
            .filter(|step| step.status == StepStatus::Completed)
            .count();
        let next_step = self
            .steps
            .iter()
            .find(|step| step.status != StepStatus::Completed)
            .map(|step| step.id.clone());

        JourneyPlanView {
            status: self.status(),
            status_label: self.status().label(),
            life_event_label: self.life_event.label(),
            next_step,
            completed_steps,
            total_steps: self.steps.len(),
            journey: self.clone(),
        }
    }
}

/// Overall status, always derived from the steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JourneyStatus {
    NotStarted,
    InProgress,
    AttentionRequired,
    Completed,
}

impl JourneyStatus {
    fn derive(steps: &[Step]) -> Self {
        if steps.iter().all(|step| step.status == StepStatus::Completed) {
            Self::Completed
        } else if steps.iter().any(|step| step.status == StepStatus::Failed) {
            Self::AttentionRequired
        } else if steps.iter().all(|step| step.status == StepStatus::Pending) {
            Self::NotStarted
        } else {
            Self::InProgress
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::NotStarted => "Not Started",
            Self::InProgress => "In Progress",
            Self::AttentionRequired => "Attention Required",
            Self::Completed => "Completed",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct JourneyPlanView {
    pub journey: Journey,
    pub status: JourneyStatus,
    pub status_label: &'static str,
    pub life_event_label: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_step: Option<StepId>,
    pub completed_steps: usize,
    pub total_steps: usize,
}
