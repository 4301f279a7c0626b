use std::collections::BTreeSet;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use chrono::Duration;
use serde::Deserialize;
use serde_json::json;

use super::artifacts::ArtifactFilter;
use super::audit::AuditAction;
use super::domain::{JourneyId, StepId};
use super::error::{ErrorKind, JourneyError};
use super::executor::SubmissionExecutor;
use super::repository::JourneyRepository;
use super::service::{JourneyRequest, JourneyService};

const DEFAULT_AUDIT_LIMIT: usize = 100;

/// Router builder exposing the journey endpoints.
pub fn journey_router<R, E>(service: Arc<JourneyService<R, E>>) -> Router
where
    R: JourneyRepository + 'static,
    E: SubmissionExecutor + 'static,
{
    Router::new()
        .route("/api/v1/journeys", post(create_handler::<R, E>))
        .route("/api/v1/journeys/:journey_id", get(plan_handler::<R, E>))
        .route(
            "/api/v1/journeys/:journey_id/steps/:step_id/prefill",
            post(prefill_handler::<R, E>),
        )
        .route(
            "/api/v1/journeys/:journey_id/consent",
            post(consent_handler::<R, E>),
        )
        .route(
            "/api/v1/journeys/:journey_id/steps/:step_id/submit",
            post(submit_handler::<R, E>),
        )
        .route(
            "/api/v1/journeys/:journey_id/audit",
            get(trail_handler::<R, E>),
        )
        .route("/api/v1/audit", get(audit_search_handler::<R, E>))
        .route("/api/v1/artifacts", get(artifacts_handler::<R, E>))
        .route(
            "/api/v1/maintenance/cleanup",
            post(cleanup_handler::<R, E>),
        )
        .with_state(service)
}

pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Validation | ErrorKind::InvalidScope => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Expired => StatusCode::GONE,
        ErrorKind::ConsentRequired => StatusCode::FORBIDDEN,
        ErrorKind::InvalidTransition => StatusCode::CONFLICT,
        ErrorKind::ExecutorFailure => StatusCode::BAD_GATEWAY,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub(crate) fn error_response(error: JourneyError) -> Response {
    let kind = error.kind();
    let payload = json!({
        "error": error.to_string(),
        "kind": kind,
    });
    (status_for(kind), axum::Json(payload)).into_response()
}

#[derive(Debug, Deserialize)]
pub(crate) struct ConsentRequest {
    pub(crate) scope: Vec<StepId>,
    #[serde(default)]
    pub(crate) ttl_days: Option<i64>,
    #[serde(default)]
    pub(crate) signature: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct AuditQuery {
    #[serde(default)]
    pub(crate) action: Option<String>,
    #[serde(default)]
    pub(crate) limit: Option<usize>,
}

pub(crate) async fn create_handler<R, E>(
    State(service): State<Arc<JourneyService<R, E>>>,
    axum::Json(request): axum::Json<JourneyRequest>,
) -> Response
where
    R: JourneyRepository + 'static,
    E: SubmissionExecutor + 'static,
{
    match service.create_journey(request) {
        Ok(journey) => (StatusCode::CREATED, axum::Json(journey.plan_view())).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn plan_handler<R, E>(
    State(service): State<Arc<JourneyService<R, E>>>,
    Path(journey_id): Path<String>,
) -> Response
where
    R: JourneyRepository + 'static,
    E: SubmissionExecutor + 'static,
{
    match service.get_plan(&JourneyId(journey_id)) {
        Ok(view) => (StatusCode::OK, axum::Json(view)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn prefill_handler<R, E>(
    State(service): State<Arc<JourneyService<R, E>>>,
    Path((journey_id, step_id)): Path<(String, String)>,
) -> Response
where
    R: JourneyRepository + 'static,
    E: SubmissionExecutor + 'static,
{
    match service
        .prefill(&JourneyId(journey_id), &StepId(step_id))
        .await
    {
        Ok(payload) => (StatusCode::OK, axum::Json(payload)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn consent_handler<R, E>(
    State(service): State<Arc<JourneyService<R, E>>>,
    Path(journey_id): Path<String>,
    axum::Json(request): axum::Json<ConsentRequest>,
) -> Response
where
    R: JourneyRepository + 'static,
    E: SubmissionExecutor + 'static,
{
    // Out-of-range day counts clamp so the ledger rejects and audits them.
    let ttl = match request.ttl_days {
        Some(days) => Duration::try_days(days).unwrap_or(if days < 0 {
            Duration::MIN
        } else {
            Duration::MAX
        }),
        None => service.config().consent_ttl,
    };
    let scope: BTreeSet<StepId> = request.scope.into_iter().collect();

    match service
        .grant_consent(&JourneyId(journey_id), scope, ttl, request.signature)
        .await
    {
        Ok(grant) => (StatusCode::CREATED, axum::Json(grant)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn submit_handler<R, E>(
    State(service): State<Arc<JourneyService<R, E>>>,
    Path((journey_id, step_id)): Path<(String, String)>,
) -> Response
where
    R: JourneyRepository + 'static,
    E: SubmissionExecutor + 'static,
{
    match service
        .submit(&JourneyId(journey_id), &StepId(step_id))
        .await
    {
        Ok(receipt) => (StatusCode::OK, axum::Json(receipt)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn trail_handler<R, E>(
    State(service): State<Arc<JourneyService<R, E>>>,
    Path(journey_id): Path<String>,
) -> Response
where
    R: JourneyRepository + 'static,
    E: SubmissionExecutor + 'static,
{
    match service.get_audit_trail(&JourneyId(journey_id)) {
        Ok(entries) => (StatusCode::OK, axum::Json(entries)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn audit_search_handler<R, E>(
    State(service): State<Arc<JourneyService<R, E>>>,
    Query(query): Query<AuditQuery>,
) -> Response
where
    R: JourneyRepository + 'static,
    E: SubmissionExecutor + 'static,
{
    let action = match query.action.as_deref() {
        None | Some("") => None,
        Some(raw) => match AuditAction::parse(raw) {
            Some(action) => Some(action),
            None => {
                return error_response(JourneyError::Validation(format!(
                    "unknown audit action '{raw}'"
                )))
            }
        },
    };
    let limit = query.limit.unwrap_or(DEFAULT_AUDIT_LIMIT);

    let searched = service
        .audit_search(action, limit)
        .and_then(|entries| Ok((entries, service.verify_audit_chain()?)));
    match searched {
        Ok((entries, chain)) => {
            let payload = json!({
                "entries": entries,
                "consent": service.consent_summary(),
                "chain": chain,
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn artifacts_handler<R, E>(
    State(service): State<Arc<JourneyService<R, E>>>,
    Query(filter): Query<ArtifactFilter>,
) -> Response
where
    R: JourneyRepository + 'static,
    E: SubmissionExecutor + 'static,
{
    match service.list_artifacts(&filter) {
        Ok(listing) => (StatusCode::OK, axum::Json(listing)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn cleanup_handler<R, E>(
    State(service): State<Arc<JourneyService<R, E>>>,
) -> Response
where
    R: JourneyRepository + 'static,
    E: SubmissionExecutor + 'static,
{
    match service.cleanup() {
        Ok(report) => (StatusCode::OK, axum::Json(report)).into_response(),
        Err(error) => error_response(error),
    }
}
