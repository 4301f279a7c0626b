//! End-to-end scenarios for life-event journeys.
//!
//! Scenarios drive the public service facade and HTTP router end to end: classification
//! and planning, vault-backed prefill, consent-gated submission, and the audit chain.

mod common {
    use std::collections::{BTreeSet, HashMap};
    use std::sync::{Arc, Mutex};

    use chrono::{DateTime, NaiveDate, Utc};

    use life_assist::config::JourneyConfig;
    use life_assist::workflows::journeys::{
        Baby, Banking, Employment, Intake, Journey, JourneyId, JourneyRepository, JourneyService,
        ManualClock, Person, RepositoryError, SimulatedExecutor, StepId, SubmissionExecutor,
    };

    pub(super) fn start() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2025-11-03T08:30:00Z")
            .expect("valid timestamp")
            .with_timezone(&Utc)
    }

    fn person(name: &str) -> Person {
        Person {
            full_name: name.to_string(),
            dob: NaiveDate::from_ymd_opt(1988, 6, 2).expect("valid date"),
            email: Some("applicant@example.test".to_string()),
            phone: None,
            address: None,
        }
    }

    pub(super) fn birth_intake() -> Intake {
        Intake {
            parent1: Some(person("Casey Moreno")),
            parent2: Some(person("Drew Moreno")),
            baby: Some(Baby {
                name: Some("Ari Moreno".to_string()),
                sex: None,
                dob: NaiveDate::from_ymd_opt(2025, 10, 28).expect("valid date"),
                place_of_birth: Some("Royal Women's Hospital".to_string()),
            }),
            ..Intake::default()
        }
    }

    pub(super) fn unemployment_intake() -> Intake {
        Intake {
            applicant: Some(person("Taylor Brooks")),
            employment: Some(Employment {
                last_employer: Some("Northside Printing".to_string()),
                ..Employment::default()
            }),
            banking: Some(Banking {
                bsb: Some("033-000".to_string()),
                account_number: Some("98765432".to_string()),
                account_name: None,
            }),
            ..Intake::default()
        }
    }

    pub(super) fn scope(ids: &[&str]) -> BTreeSet<StepId> {
        ids.iter().map(|id| StepId::from(*id)).collect()
    }

    #[derive(Default)]
    pub(super) struct InMemoryRepository {
        journeys: Mutex<HashMap<JourneyId, Journey>>,
    }

    impl JourneyRepository for InMemoryRepository {
        fn insert(&self, journey: Journey) -> Result<Journey, RepositoryError> {
            let mut guard = self.journeys.lock().expect("repository mutex poisoned");
            if guard.contains_key(&journey.id) {
                return Err(RepositoryError::Conflict);
            }
            guard.insert(journey.id.clone(), journey.clone());
            Ok(journey)
        }

        fn update(&self, journey: Journey) -> Result<(), RepositoryError> {
            let mut guard = self.journeys.lock().expect("repository mutex poisoned");
            if !guard.contains_key(&journey.id) {
                return Err(RepositoryError::NotFound);
            }
            guard.insert(journey.id.clone(), journey);
            Ok(())
        }

        fn fetch(&self, id: &JourneyId) -> Result<Option<Journey>, RepositoryError> {
            Ok(self
                .journeys
                .lock()
                .expect("repository mutex poisoned")
                .get(id)
                .cloned())
        }

        fn list(&self) -> Result<Vec<Journey>, RepositoryError> {
            Ok(self
                .journeys
                .lock()
                .expect("repository mutex poisoned")
                .values()
                .cloned()
                .collect())
        }
    }

    pub(super) fn service_with<E: SubmissionExecutor + 'static>(
        executor: E,
    ) -> (JourneyService<InMemoryRepository, E>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(start()));
        let config = JourneyConfig {
            executor_timeout: std::time::Duration::from_millis(150),
            ..JourneyConfig::default()
        };
        let service = JourneyService::new(
            Arc::new(InMemoryRepository::default()),
            Arc::new(executor),
            config,
        )
        .with_clock(clock.clone());
        (service, clock)
    }

    pub(super) fn service() -> (JourneyService<InMemoryRepository, SimulatedExecutor>, Arc<ManualClock>) {
        service_with(SimulatedExecutor::new())
    }
}

use std::sync::Arc;

use async_trait::async_trait;
use axum::http::StatusCode;
use chrono::Duration;
use common::*;
use life_assist::workflows::journeys::{
    journey_router, AuditAction, ErrorKind, ExecutorError, JourneyStatus, LifeEvent, StepId,
    StepStatus, SubmissionExecutor, SubmissionOutcome, SubmissionRequest,
};
use serde_json::{json, Value};
use tower::ServiceExt;

struct SilentPortal;

#[async_trait]
impl SubmissionExecutor for SilentPortal {
    async fn submit(&self, _request: SubmissionRequest) -> Result<SubmissionOutcome, ExecutorError> {
        std::future::pending().await
    }
}

#[tokio::test]
async fn new_parents_receive_a_birth_plan() {
    let (service, _) = service();
    let journey = service
        .create_journey(birth_intake().into())
        .expect("journey created");

    assert_eq!(journey.life_event(), LifeEvent::Birth);
    let ids: Vec<&str> = journey.steps.iter().map(|step| step.id.as_str()).collect();
    assert_eq!(ids, vec!["birth_reg", "medicare_enrolment"]);

    let review = service
        .prefill(&journey.id, &StepId::from("medicare_enrolment"))
        .await
        .expect("prefill");
    assert_eq!(review.status, StepStatus::InProgress);
    assert_eq!(review.data["parent1_full_name"], "Casey Moreno");
}

#[tokio::test]
async fn job_loss_plan_prefills_banking_details() {
    let (service, _) = service();
    let journey = service
        .create_journey(unemployment_intake().into())
        .expect("journey created");

    assert_eq!(journey.life_event(), LifeEvent::Unemployment);
    let review = service
        .prefill(&journey.id, &StepId::from("jobseeker_payment"))
        .await
        .expect("prefill");
    assert!(review.missing_required.is_empty());
    assert_eq!(review.data["bank_bsb"], "033-000");
}

#[tokio::test]
async fn consent_gates_each_step_independently() {
    let (service, _) = service();
    let journey = service
        .create_journey(birth_intake().into())
        .expect("journey created");

    let blocked = service
        .submit(&journey.id, &StepId::from("birth_reg"))
        .await
        .expect_err("no consent yet");
    assert_eq!(blocked.kind(), ErrorKind::ConsentRequired);

    service
        .grant_consent(&journey.id, scope(&["birth_reg"]), Duration::days(30), None)
        .await
        .expect("consent");
    let receipt = service
        .submit(&journey.id, &StepId::from("birth_reg"))
        .await
        .expect("birth registration submitted");
    assert!(receipt.receipt_id.starts_with("BR-"));

    let still_blocked = service
        .submit(&journey.id, &StepId::from("medicare_enrolment"))
        .await
        .expect_err("medicare not covered");
    assert_eq!(still_blocked.kind(), ErrorKind::ConsentRequired);

    let plan = service.get_plan(&journey.id).expect("plan");
    assert_eq!(plan.completed_steps, 1);
    assert_eq!(plan.status, JourneyStatus::InProgress);
    assert!(service.verify_audit_chain().expect("chain readable").valid);
}

#[tokio::test]
async fn vaulted_intake_expires_after_its_ttl() {
    let (service, clock) = service();
    let journey = service
        .create_journey(unemployment_intake().into())
        .expect("journey created");

    clock.advance(Duration::days(29));
    service
        .prefill(&journey.id, &StepId::from("jobseeker_payment"))
        .await
        .expect("still inside the ttl");

    clock.advance(Duration::days(1));
    let error = service
        .prefill(&journey.id, &StepId::from("job_service_provider"))
        .await
        .expect_err("ttl elapsed");
    assert_eq!(error.kind(), ErrorKind::Expired);

    let plan = service.get_plan(&journey.id).expect("plan");
    assert_eq!(plan.journey.steps[1].status, StepStatus::Pending);
}

#[tokio::test]
async fn unresponsive_portal_leaves_the_step_retryable() {
    let (service, _) = service_with(SilentPortal);
    let journey = service
        .create_journey(birth_intake().into())
        .expect("journey created");
    service
        .grant_consent(&journey.id, scope(&["birth_reg"]), Duration::days(30), None)
        .await
        .expect("consent");

    let error = service
        .submit(&journey.id, &StepId::from("birth_reg"))
        .await
        .expect_err("portal never answers");
    assert_eq!(error.kind(), ErrorKind::ExecutorFailure);

    let plan = service.get_plan(&journey.id).expect("plan");
    assert_eq!(plan.status, JourneyStatus::AttentionRequired);
    assert_eq!(plan.journey.steps[0].failure.as_deref(), Some("timeout"));

    let submits = service
        .audit_search(Some(AuditAction::StepSubmit), 10)
        .expect("audit readable");
    assert_eq!(submits.len(), 1);
}

#[tokio::test]
async fn http_surface_runs_a_full_journey() {
    let (service, _) = service();
    let router = journey_router(Arc::new(service));

    let created = router
        .clone()
        .oneshot(
            axum::http::Request::post("/api/v1/journeys")
                .header(axum::http::header::CONTENT_TYPE, "application/json")
                .body(axum::body::Body::from(
                    json!({ "intake": birth_intake() }).to_string(),
                ))
                .expect("request"),
        )
        .await
        .expect("route executes");
    assert_eq!(created.status(), StatusCode::CREATED);
    let plan = read_json(created).await;
    let journey_id = plan["journey"]["id"].as_str().expect("journey id").to_string();

    let consent = router
        .clone()
        .oneshot(
            axum::http::Request::post(format!("/api/v1/journeys/{journey_id}/consent"))
                .header(axum::http::header::CONTENT_TYPE, "application/json")
                .body(axum::body::Body::from(
                    json!({ "scope": ["birth_reg", "medicare_enrolment"] }).to_string(),
                ))
                .expect("request"),
        )
        .await
        .expect("route executes");
    assert_eq!(consent.status(), StatusCode::CREATED);

    for step in ["birth_reg", "medicare_enrolment"] {
        let submitted = router
            .clone()
            .oneshot(
                axum::http::Request::post(format!(
                    "/api/v1/journeys/{journey_id}/steps/{step}/submit"
                ))
                .body(axum::body::Body::empty())
                .expect("request"),
            )
            .await
            .expect("route executes");
        assert_eq!(submitted.status(), StatusCode::OK);
    }

    let fetched = router
        .oneshot(
            axum::http::Request::get(format!("/api/v1/journeys/{journey_id}"))
                .body(axum::body::Body::empty())
                .expect("request"),
        )
        .await
        .expect("route executes");
    assert_eq!(fetched.status(), StatusCode::OK);
    let plan = read_json(fetched).await;
    assert_eq!(plan["status"], "completed");
    assert_eq!(plan["completed_steps"], 2);
}

async fn read_json(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
