use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::response::Response;
use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value;

use crate::config::JourneyConfig;
use crate::workflows::journeys::clock::ManualClock;
use crate::workflows::journeys::domain::{Journey, JourneyId, ReceiptStatus, StepId};
use crate::workflows::journeys::executor::{
    ExecutorError, SimulatedExecutor, SubmissionExecutor, SubmissionOutcome, SubmissionRequest,
};
use crate::workflows::journeys::intake::{
    Baby, Banking, CarerDetails, Disaster, Employment, Housing, Intake, Person, Sex,
};
use crate::workflows::journeys::repository::{JourneyRepository, RepositoryError};
use crate::workflows::journeys::service::JourneyService;

pub(super) const PARENT_NAME: &str = "Jordan Avery";
pub(super) const APPLICANT_NAME: &str = "Sam Whitfield";

pub(super) fn start() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2025-10-01T09:00:00Z")
        .expect("valid timestamp")
        .with_timezone(&Utc)
}

pub(super) fn journey_config() -> JourneyConfig {
    JourneyConfig {
        executor_timeout: std::time::Duration::from_millis(200),
        ..JourneyConfig::default()
    }
}

fn person(name: &str) -> Person {
    Person {
        full_name: name.to_string(),
        dob: NaiveDate::from_ymd_opt(1991, 3, 14).expect("valid date"),
        email: Some("person@example.test".to_string()),
        phone: Some("0400 000 000".to_string()),
        address: None,
    }
}

pub(super) fn birth_intake() -> Intake {
    Intake {
        parent1: Some(person(PARENT_NAME)),
        baby: Some(Baby {
            name: Some("Robin Avery".to_string()),
            sex: Some(Sex::Other),
            dob: NaiveDate::from_ymd_opt(2025, 9, 20).expect("valid date"),
            place_of_birth: Some("Westmead Hospital".to_string()),
        }),
        ..Intake::default()
    }
}

pub(super) fn unemployment_intake() -> Intake {
    Intake {
        applicant: Some(person(APPLICANT_NAME)),
        employment: Some(Employment {
            last_employer: Some("Harbour Logistics".to_string()),
            last_work_date: NaiveDate::from_ymd_opt(2025, 9, 12),
            reason_for_unemployment: Some("redundancy".to_string()),
            ..Employment::default()
        }),
        banking: Some(Banking {
            bsb: Some("062-000".to_string()),
            account_number: Some("12345678".to_string()),
            account_name: Some(APPLICANT_NAME.to_string()),
        }),
        ..Intake::default()
    }
}

pub(super) fn disaster_intake() -> Intake {
    Intake {
        applicant: Some(person(APPLICANT_NAME)),
        disaster: Some(Disaster {
            kind: Some("flood".to_string()),
            date: NaiveDate::from_ymd_opt(2025, 9, 1),
            location: Some("Lismore".to_string()),
            property_damage: Some("ground floor flooded".to_string()),
        }),
        housing: Some(Housing {
            status: Some("displaced".to_string()),
            household_size: Some(3),
            temporary_accommodation_needed: Some(true),
            ..Housing::default()
        }),
        ..Intake::default()
    }
}

pub(super) fn carer_intake() -> Intake {
    Intake {
        applicant: Some(person(APPLICANT_NAME)),
        carer: Some(CarerDetails {
            care_recipient_name: Some("Morgan Whitfield".to_string()),
            relationship: Some("parent".to_string()),
            hours_per_week: Some(35),
            condition: Some("dementia".to_string()),
        }),
        ..Intake::default()
    }
}

pub(super) fn scope(ids: &[&str]) -> BTreeSet<StepId> {
    ids.iter().map(|id| StepId::from(*id)).collect()
}

pub(super) type TestService<E> = JourneyService<MemoryRepository, E>;

pub(super) fn build_service() -> (
    TestService<SimulatedExecutor>,
    Arc<MemoryRepository>,
    Arc<ManualClock>,
) {
    build_service_with(SimulatedExecutor::new())
}

pub(super) fn build_service_with<E>(
    executor: E,
) -> (TestService<E>, Arc<MemoryRepository>, Arc<ManualClock>)
where
    E: SubmissionExecutor + 'static,
{
    let repository = Arc::new(MemoryRepository::default());
    let clock = Arc::new(ManualClock::new(start()));
    let service = JourneyService::new(repository.clone(), Arc::new(executor), journey_config())
        .with_clock(clock.clone());
    (service, repository, clock)
}

#[derive(Default, Clone)]
pub(super) struct MemoryRepository {
    pub(super) records: Arc<Mutex<HashMap<JourneyId, Journey>>>,
}

impl JourneyRepository for MemoryRepository {
    fn insert(&self, journey: Journey) -> Result<Journey, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        if guard.contains_key(&journey.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(journey.id.clone(), journey.clone());
        Ok(journey)
    }

    fn update(&self, journey: Journey) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        guard.insert(journey.id.clone(), journey);
        Ok(())
    }

    fn fetch(&self, id: &JourneyId) -> Result<Option<Journey>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn list(&self) -> Result<Vec<Journey>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.values().cloned().collect())
    }
}

pub(super) struct UnavailableRepository;

impl JourneyRepository for UnavailableRepository {
    fn insert(&self, _journey: Journey) -> Result<Journey, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn update(&self, _journey: Journey) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch(&self, _id: &JourneyId) -> Result<Option<Journey>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn list(&self) -> Result<Vec<Journey>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

/// Never answers, so every call runs into the executor timeout.
pub(super) struct HangingExecutor;

#[async_trait]
impl SubmissionExecutor for HangingExecutor {
    async fn submit(&self, _request: SubmissionRequest) -> Result<SubmissionOutcome, ExecutorError> {
        std::future::pending().await
    }
}

/// Fails the first `failures` calls, then accepts.
#[derive(Default)]
pub(super) struct FlakyExecutor {
    pub(super) failures: usize,
    pub(super) calls: AtomicUsize,
    pub(super) requests: Mutex<Vec<SubmissionRequest>>,
}

impl FlakyExecutor {
    pub(super) fn failing(failures: usize) -> Self {
        Self {
            failures,
            ..Self::default()
        }
    }
}

#[async_trait]
impl SubmissionExecutor for FlakyExecutor {
    async fn submit(&self, request: SubmissionRequest) -> Result<SubmissionOutcome, ExecutorError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests
            .lock()
            .expect("request mutex poisoned")
            .push(request.clone());
        if call < self.failures {
            return Err(ExecutorError::Rejected("portal returned 503".to_string()));
        }
        Ok(SubmissionOutcome {
            receipt_id: format!("{}-0000000{}", SimulatedExecutor::receipt_prefix(&request.step_id), call),
            status: ReceiptStatus::Queued,
        })
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
