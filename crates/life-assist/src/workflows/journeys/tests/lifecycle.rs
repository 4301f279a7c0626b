use super::common::*;
use chrono::Duration;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use crate::workflows::journeys::audit::{AuditAction, AuditActor, AuditOutcome};
use crate::workflows::journeys::domain::{JourneyStatus, StepId, StepStatus};
use crate::workflows::journeys::error::{ErrorKind, JourneyError};
use crate::workflows::journeys::executor::ExecutorError;
use crate::workflows::journeys::service::JourneyService;

#[tokio::test]
async fn executor_timeout_fails_the_step() {
    let (service, _, _) = build_service_with(HangingExecutor);
    let journey = service
        .create_journey(birth_intake().into())
        .expect("journey created");
    let step_id = StepId::from("birth_reg");
    service
        .grant_consent(&journey.id, scope(&["birth_reg"]), Duration::days(30), None)
        .await
        .expect("consent");

    let error = service
        .submit(&journey.id, &step_id)
        .await
        .expect_err("executor never answers");
    assert!(matches!(
        error,
        JourneyError::ExecutorFailure(ExecutorError::Timeout)
    ));
    assert_eq!(error.kind(), ErrorKind::ExecutorFailure);

    let plan = service.get_plan(&journey.id).expect("plan");
    let step = plan.journey.step(&step_id).expect("step");
    assert_eq!(step.status, StepStatus::Failed);
    assert_eq!(step.failure.as_deref(), Some("timeout"));
    assert_eq!(step.attempts, 1);
    assert!(step.receipt.is_none());
    assert_eq!(plan.status, JourneyStatus::AttentionRequired);

    let trail = service.get_audit_trail(&journey.id).expect("trail");
    let last = trail.last().expect("settlement audited");
    assert_eq!(last.action, AuditAction::StepSubmit);
    assert_eq!(last.actor, AuditActor::Executor);
    assert_eq!(
        last.outcome,
        AuditOutcome::Failed {
            kind: ErrorKind::ExecutorFailure
        }
    );
}

#[tokio::test]
async fn failed_steps_can_be_retried() {
    let (service, _, _) = build_service_with(FlakyExecutor::failing(1));
    let journey = service
        .create_journey(unemployment_intake().into())
        .expect("journey created");
    let step_id = StepId::from("jobseeker_payment");
    service
        .grant_consent(&journey.id, scope(&["jobseeker_payment"]), Duration::days(30), None)
        .await
        .expect("consent");

    let first = service
        .submit(&journey.id, &step_id)
        .await
        .expect_err("portal rejects the first attempt");
    assert_eq!(first.kind(), ErrorKind::ExecutorFailure);

    let receipt = service
        .submit(&journey.id, &step_id)
        .await
        .expect("retry accepted");
    assert!(receipt.receipt_id.starts_with("JS-"));

    let plan = service.get_plan(&journey.id).expect("plan");
    let step = plan.journey.step(&step_id).expect("step");
    assert_eq!(step.status, StepStatus::Completed);
    assert_eq!(step.attempts, 2);
    assert!(step.failure.is_none());

    let retries = service
        .audit_search(Some(AuditAction::StepRetry), 10)
        .expect("audit readable");
    assert_eq!(retries.len(), 1);
    assert_eq!(retries[0].actor, AuditActor::System);
}

#[tokio::test]
async fn executor_receives_the_mapped_fields() {
    let repository = Arc::new(MemoryRepository::default());
    let executor = Arc::new(FlakyExecutor::failing(0));
    let service = JourneyService::new(repository, executor.clone(), journey_config());
    let journey = service
        .create_journey(birth_intake().into())
        .expect("journey created");
    service
        .grant_consent(&journey.id, scope(&["birth_reg"]), Duration::days(30), None)
        .await
        .expect("consent");
    service
        .submit(&journey.id, &StepId::from("birth_reg"))
        .await
        .expect("submitted");

    assert_eq!(executor.calls.load(Ordering::SeqCst), 1);
    let requests = executor.requests.lock().expect("request mutex poisoned");
    let request = &requests[0];
    assert_eq!(request.form_id, "birth_registry");
    assert_eq!(request.resolved_fields["parent1_full_name"], PARENT_NAME);
    assert_eq!(request.resolved_fields["preferred_language"], "en");
}

#[tokio::test]
async fn retries_are_bounded() {
    let (service, _, _) = build_service_with(FlakyExecutor::failing(usize::MAX));
    let journey = service
        .create_journey(carer_intake().into())
        .expect("journey created");
    let step_id = StepId::from("carer_payment");
    service
        .grant_consent(&journey.id, scope(&["carer_payment"]), Duration::days(30), None)
        .await
        .expect("consent");

    for _ in 0..3 {
        let error = service
            .submit(&journey.id, &step_id)
            .await
            .expect_err("portal keeps rejecting");
        assert_eq!(error.kind(), ErrorKind::ExecutorFailure);
    }

    let exhausted = service
        .submit(&journey.id, &step_id)
        .await
        .expect_err("no attempts left");
    assert_eq!(exhausted.kind(), ErrorKind::InvalidTransition);

    let plan = service.get_plan(&journey.id).expect("plan");
    let step = plan.journey.step(&step_id).expect("step");
    assert_eq!(step.status, StepStatus::Failed);
    assert_eq!(step.attempts, 3);
}

#[tokio::test]
async fn dropped_submission_is_settled_as_cancelled() {
    let (service, _, _) = build_service_with(HangingExecutor);
    let journey = service
        .create_journey(birth_intake().into())
        .expect("journey created");
    let step_id = StepId::from("birth_reg");
    service
        .grant_consent(&journey.id, scope(&["birth_reg"]), Duration::days(30), None)
        .await
        .expect("consent");

    let outer = tokio::time::timeout(
        std::time::Duration::from_millis(20),
        service.submit(&journey.id, &step_id),
    )
    .await;
    assert!(outer.is_err(), "caller gave up first");

    let plan = service.get_plan(&journey.id).expect("plan");
    let step = plan.journey.step(&step_id).expect("step");
    assert_eq!(step.status, StepStatus::Failed);
    assert_eq!(step.failure.as_deref(), Some("cancelled"));
    assert_eq!(step.attempts, 1);

    let last = service
        .audit_search(Some(AuditAction::StepSubmit), 1)
        .expect("audit readable")
        .pop()
        .expect("cancellation audited");
    assert_eq!(
        last.outcome,
        AuditOutcome::Failed {
            kind: ErrorKind::ExecutorFailure
        }
    );
    assert!(service.verify_audit_chain().expect("chain readable").valid);
}
