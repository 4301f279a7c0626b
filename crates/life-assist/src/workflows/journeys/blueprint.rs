use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

use super::domain::{Journey, JourneyId, LifeEvent, Step, StepId, StepStatus};

#[derive(Debug, Clone)]
pub struct StepTemplate {
    pub key: &'static str,
    pub title: &'static str,
    pub form: &'static str,
    /// Append the journey's jurisdiction to the title, e.g. "(NSW)".
    pub jurisdictional: bool,
}

impl StepTemplate {
    fn instantiate(&self, jurisdiction: &str) -> Step {
        let title = if self.jurisdictional && !jurisdiction.is_empty() {
            format!("{} ({})", self.title, jurisdiction)
        } else {
            self.title.to_string()
        };

        Step {
            id: StepId::new(self.key),
            title,
            form_schema_ref: self.form.to_string(),
            status: StepStatus::Pending,
            attempts: 0,
            failure: None,
            prefill_snapshot: None,
            receipt: None,
        }
    }
}

/// Immutable, versioned mapping from life event to its ordered step templates.
#[derive(Debug, Clone)]
pub struct JourneyBlueprint {
    version: &'static str,
    templates: BTreeMap<LifeEvent, Vec<StepTemplate>>,
}

impl JourneyBlueprint {
    pub fn standard() -> Self {
        Self {
            version: "v1",
            templates: standard_step_templates(),
        }
    }

    pub fn version(&self) -> &'static str {
        self.version
    }

    pub fn steps_for(&self, event: LifeEvent) -> &[StepTemplate] {
        self.templates
            .get(&event)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

/// Expands a life event into a fresh journey. Performs no I/O.
#[derive(Debug, Clone)]
pub struct JourneyPlanner {
    blueprint: JourneyBlueprint,
}

impl JourneyPlanner {
    pub fn new(blueprint: JourneyBlueprint) -> Self {
        Self { blueprint }
    }

    pub fn plan(&self, event: LifeEvent, jurisdiction: &str, now: DateTime<Utc>) -> Journey {
        let steps = self
            .blueprint
            .steps_for(event)
            .iter()
            .map(|template| template.instantiate(jurisdiction))
            .collect();

        Journey::new(
            JourneyId::generate(),
            event,
            jurisdiction.to_string(),
            self.blueprint.version().to_string(),
            steps,
            now,
        )
    }
}

fn standard_step_templates() -> BTreeMap<LifeEvent, Vec<StepTemplate>> {
    let mut templates = BTreeMap::new();
    templates.insert(
        LifeEvent::Birth,
        vec![
            StepTemplate {
                key: "birth_reg",
                title: "Birth Registration",
                form: "birth_registry",
                jurisdictional: true,
            },
            StepTemplate {
                key: "medicare_enrolment",
                title: "Medicare Newborn Enrolment",
                form: "medicare_newborn",
                jurisdictional: false,
            },
        ],
    );
    templates.insert(
        LifeEvent::Unemployment,
        vec![
            StepTemplate {
                key: "jobseeker_payment",
                title: "Centrelink JobSeeker Payment",
                form: "jobseeker_payment",
                jurisdictional: false,
            },
            StepTemplate {
                key: "job_service_provider",
                title: "Job Service Provider Registration",
                form: "job_service_provider",
                jurisdictional: false,
            },
        ],
    );
    templates.insert(
        LifeEvent::DisasterRecovery,
        vec![
            StepTemplate {
                key: "emergency_disaster_payment",
                title: "Emergency Disaster Payment",
                form: "emergency_disaster_payment",
                jurisdictional: false,
            },
            StepTemplate {
                key: "emergency_housing_assistance",
                title: "Emergency Housing Assistance",
                form: "emergency_housing_assistance",
                jurisdictional: true,
            },
        ],
    );
    templates.insert(
        LifeEvent::CarerSupport,
        vec![
            StepTemplate {
                key: "carer_payment",
                title: "Carer Payment Application",
                form: "carer_payment",
                jurisdictional: false,
            },
            StepTemplate {
                key: "carer_allowance",
                title: "Carer Allowance Application",
                form: "carer_allowance",
                jurisdictional: false,
            },
        ],
    );
    templates
}
