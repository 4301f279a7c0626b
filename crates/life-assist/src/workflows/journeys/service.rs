use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use tokio::sync::OwnedMutexGuard;
use tracing::{info, warn};

use super::artifacts::{self, ArtifactFilter, ArtifactListing, ArtifactSources};
use super::audit::{
    AuditAction, AuditActor, AuditEntry, AuditError, AuditEvent, AuditLog, AuditOutcome,
    ChainVerification,
};
use super::blueprint::{JourneyBlueprint, JourneyPlanner};
use super::classifier;
use super::clock::{Clock, SystemClock};
use super::consent::{ConsentGrant, ConsentLedger, ConsentSummary};
use super::domain::{
    Journey, JourneyId, JourneyPlanView, LifeEvent, PrefillSnapshot, Receipt, StepId, StepStatus,
};
use super::error::JourneyError;
use super::executor::{ExecutorError, SubmissionExecutor, SubmissionOutcome, SubmissionRequest};
use super::forms::{FieldMapper, FieldResolution, FieldStatus, FormCatalog, FormPrefill};
use super::intake::Intake;
use super::lifecycle::{StepLifecycle, StepTransition};
use super::repository::JourneyRepository;
use super::vault::{IntakeVault, VaultError};
use crate::config::JourneyConfig;

/// Request accepted by [`JourneyService::create_journey`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JourneyRequest {
    pub intake: Intake,
    /// Must be one of the events the intake satisfies.
    #[serde(default)]
    pub life_event: Option<LifeEvent>,
    #[serde(default)]
    pub jurisdiction: Option<String>,
}

impl From<Intake> for JourneyRequest {
    fn from(intake: Intake) -> Self {
        Self {
            intake,
            ..Self::default()
        }
    }
}

/// Mapper output for a step that is open for review.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReviewPayload {
    pub journey_id: JourneyId,
    pub step_id: StepId,
    pub title: String,
    pub status: StepStatus,
    pub attempts: u32,
    pub form_id: String,
    pub data: BTreeMap<String, Value>,
    pub fields: Vec<FieldResolution>,
    pub missing_required: Vec<String>,
    pub review_text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CleanupReport {
    pub vault_records_purged: usize,
    pub consent_grants_purged: usize,
    pub ran_at: DateTime<Utc>,
}

/// Orchestrator composing the planner, mapper, vault, consent ledger, and audit log.
pub struct JourneyService<R, E> {
    repository: Arc<R>,
    executor: Arc<E>,
    clock: Arc<dyn Clock>,
    config: JourneyConfig,
    planner: JourneyPlanner,
    mapper: FieldMapper,
    lifecycle: StepLifecycle,
    vault: IntakeVault,
    consent: ConsentLedger,
    audit: AuditLog,
    locks: Mutex<HashMap<JourneyId, Arc<tokio::sync::Mutex<()>>>>,
    snapshot_key: String,
}

impl<R, E> JourneyService<R, E>
where
    R: JourneyRepository + 'static,
    E: SubmissionExecutor + 'static,
{
    pub fn new(repository: Arc<R>, executor: Arc<E>, config: JourneyConfig) -> Self {
        Self::with_components(
            repository,
            executor,
            config,
            JourneyBlueprint::standard(),
            FormCatalog::standard(),
        )
    }

    pub fn with_components(
        repository: Arc<R>,
        executor: Arc<E>,
        config: JourneyConfig,
        blueprint: JourneyBlueprint,
        catalog: FormCatalog,
    ) -> Self {
        Self {
            repository,
            executor,
            clock: Arc::new(SystemClock),
            lifecycle: StepLifecycle::new(config.max_submission_attempts),
            vault: IntakeVault::new(config.vault_ttl),
            planner: JourneyPlanner::new(blueprint),
            mapper: FieldMapper::new(catalog),
            consent: ConsentLedger::new(),
            audit: AuditLog::new(),
            locks: Mutex::new(HashMap::new()),
            snapshot_key: uuid::Uuid::new_v4().simple().to_string(),
            config,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &JourneyConfig {
        &self.config
    }

    /// Validates, classifies, plans, and vaults a new intake.
    pub fn create_journey(&self, request: JourneyRequest) -> Result<Journey, JourneyError> {
        let now = self.clock.now();
        match self.plan_journey(request, now) {
            Ok(journey) => {
                let step_ids: Vec<&str> = journey.steps.iter().map(|step| step.id.as_str()).collect();
                self.record(
                    Some(&journey.id),
                    None,
                    AuditAction::JourneyCreate,
                    AuditActor::Applicant,
                    AuditOutcome::Succeeded,
                    json!({
                        "journey_id": journey.id,
                        "life_event": journey.life_event(),
                        "jurisdiction": journey.jurisdiction,
                        "template_version": journey.template_version,
                        "steps": step_ids,
                    }),
                    now,
                )?;
                info!(
                    journey_id = %journey.id,
                    life_event = journey.life_event().label(),
                    steps = journey.steps.len(),
                    "journey created"
                );
                Ok(journey)
            }
            Err(error) => {
                self.record_failure(None, None, AuditAction::JourneyCreate, AuditActor::Applicant, &error, now);
                Err(error)
            }
        }
    }

    fn plan_journey(&self, request: JourneyRequest, now: DateTime<Utc>) -> Result<Journey, JourneyError> {
        let JourneyRequest {
            intake,
            life_event,
            jurisdiction,
        } = request;

        intake.validate()?;
        let matched = classifier::classify(&intake);
        let event = match life_event {
            Some(requested) if matched.contains(&requested) => requested,
            Some(requested) => {
                return Err(JourneyError::Validation(format!(
                    "intake does not meet the requirements for {}",
                    requested.label()
                )))
            }
            None => classifier::primary_life_event(&intake).ok_or_else(|| {
                JourneyError::Validation(
                    "intake does not meet the minimal requirements of any life event".to_string(),
                )
            })?,
        };

        let jurisdiction = jurisdiction
            .map(|value| value.trim().to_ascii_uppercase())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| self.config.jurisdiction.clone());
        let journey = self.planner.plan(event, &jurisdiction, now);

        self.vault.store(&journey.id, intake, now)?;
        let stored = self.repository.insert(journey)?;
        Ok(stored)
    }

    /// Opens a step for review and returns the prefilled form.
    pub async fn prefill(&self, journey_id: &JourneyId, step_id: &StepId) -> Result<ReviewPayload, JourneyError> {
        let _guard = self
            .acquire(journey_id, Some(step_id), AuditAction::StepPrefill)
            .await?;
        let now = self.clock.now();

        match self.prefill_locked(journey_id, step_id, now) {
            Ok((payload, transition, snapshot)) => {
                self.record(
                    Some(journey_id),
                    Some(step_id),
                    AuditAction::StepPrefill,
                    AuditActor::Applicant,
                    AuditOutcome::Succeeded,
                    json!({
                        "journey_id": journey_id,
                        "step_id": step_id,
                        "transition": transition.label(),
                        "form_id": snapshot.form_id,
                        "data_hash": snapshot.data_hash,
                        "resolved": snapshot.resolved,
                        "defaulted": snapshot.defaulted,
                        "missing": snapshot.missing,
                    }),
                    now,
                )?;
                info!(%journey_id, %step_id, missing = snapshot.missing, "step prefilled");
                Ok(payload)
            }
            Err(error) => {
                self.record_failure(
                    Some(journey_id),
                    Some(step_id),
                    AuditAction::StepPrefill,
                    AuditActor::Applicant,
                    &error,
                    now,
                );
                Err(error)
            }
        }
    }

    fn prefill_locked(
        &self,
        journey_id: &JourneyId,
        step_id: &StepId,
        now: DateTime<Utc>,
    ) -> Result<(ReviewPayload, StepTransition, PrefillSnapshot), JourneyError> {
        let mut journey = self.load(journey_id)?;
        let step = journey
            .step(step_id)
            .ok_or_else(|| JourneyError::step_not_found(journey_id, step_id))?;

        let transition = StepLifecycle::reopen_transition(step.status);
        self.lifecycle.check(step, transition)?;
        let intake = self.read_intake(journey_id, now)?;
        let prefill = self.mapper.prefill(&step.form_schema_ref, &intake)?;
        let snapshot = snapshot_of(&prefill, &self.snapshot_key, now)?;

        let step = journey
            .step_mut(step_id)
            .ok_or_else(|| JourneyError::step_not_found(journey_id, step_id))?;
        self.lifecycle.apply(step, transition)?;
        step.prefill_snapshot = Some(snapshot.clone());

        let payload = ReviewPayload {
            journey_id: journey_id.clone(),
            step_id: step_id.clone(),
            title: step.title.clone(),
            status: step.status,
            attempts: step.attempts,
            form_id: prefill.form_id,
            data: prefill.data,
            fields: prefill.fields,
            missing_required: prefill.missing_required,
            review_text: prefill.review_text,
        };

        self.repository.update(journey)?;
        Ok((payload, transition, snapshot))
    }

    /// Records a scoped, time-limited consent grant for the journey.
    pub async fn grant_consent(
        &self,
        journey_id: &JourneyId,
        scope: BTreeSet<StepId>,
        ttl: Duration,
        signature: Option<String>,
    ) -> Result<ConsentGrant, JourneyError> {
        let _guard = self.acquire(journey_id, None, AuditAction::ConsentGrant).await?;
        let now = self.clock.now();

        let granted = self.load(journey_id).and_then(|journey| {
            self.consent
                .grant(&journey, scope, ttl, signature, now)
                .map_err(JourneyError::from)
        });

        match granted {
            Ok(grant) => {
                self.record(
                    Some(journey_id),
                    None,
                    AuditAction::ConsentGrant,
                    AuditActor::Applicant,
                    AuditOutcome::Succeeded,
                    json!({
                        "grant_id": grant.grant_id,
                        "journey_id": journey_id,
                        "scope": grant.scope,
                        "ttl_seconds": grant.ttl_seconds,
                        "has_signature": grant.has_signature(),
                        "grant_hash": grant.hash,
                    }),
                    now,
                )?;
                info!(%journey_id, scope = grant.scope.len(), "consent granted");
                Ok(grant)
            }
            Err(error) => {
                self.record_failure(
                    Some(journey_id),
                    None,
                    AuditAction::ConsentGrant,
                    AuditActor::Applicant,
                    &error,
                    now,
                );
                Err(error)
            }
        }
    }

    /// Submits a consented step through the executor and settles its status.
    ///
    /// Executor failures, timeouts, and cancellation of this future all leave
    /// the step `failed` and eligible for retry.
    pub async fn submit(&self, journey_id: &JourneyId, step_id: &StepId) -> Result<Receipt, JourneyError> {
        let _guard = self
            .acquire(journey_id, Some(step_id), AuditAction::StepSubmit)
            .await?;
        let now = self.clock.now();

        let (mut journey, request, opening) = match self.prepare_submission(journey_id, step_id, now) {
            Ok(prepared) => prepared,
            Err(error) => {
                self.record_failure(
                    Some(journey_id),
                    Some(step_id),
                    AuditAction::StepSubmit,
                    AuditActor::Applicant,
                    &error,
                    now,
                );
                return Err(error);
            }
        };

        if let Some(transition) = opening {
            let step = journey
                .step_mut(step_id)
                .ok_or_else(|| JourneyError::step_not_found(journey_id, step_id))?;
            self.lifecycle.apply(step, transition)?;
            self.repository.update(journey.clone())?;
            let action = match transition {
                StepTransition::Retry => AuditAction::StepRetry,
                _ => AuditAction::StepStart,
            };
            self.record(
                Some(journey_id),
                Some(step_id),
                action,
                AuditActor::System,
                AuditOutcome::Succeeded,
                json!({
                    "journey_id": journey_id,
                    "step_id": step_id,
                    "transition": transition.label(),
                }),
                now,
            )?;
        }

        let mut in_flight = InFlight {
            service: self,
            journey: Some(journey),
            step_id: step_id.clone(),
        };

        let outcome = match tokio::time::timeout(
            self.config.executor_timeout,
            self.executor.submit(request),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(ExecutorError::Timeout),
        };

        match in_flight.journey.take() {
            Some(journey) => self.settle(journey, step_id, outcome),
            None => Err(JourneyError::Internal("submission settled twice".to_string())),
        }
    }

    fn prepare_submission(
        &self,
        journey_id: &JourneyId,
        step_id: &StepId,
        now: DateTime<Utc>,
    ) -> Result<(Journey, SubmissionRequest, Option<StepTransition>), JourneyError> {
        let journey = self.load(journey_id)?;
        let step = journey
            .step(step_id)
            .ok_or_else(|| JourneyError::step_not_found(journey_id, step_id))?;

        let opening = match step.status {
            StepStatus::InProgress => None,
            status => {
                let transition = StepLifecycle::reopen_transition(status);
                self.lifecycle.check(step, transition)?;
                Some(transition)
            }
        };

        if !self.consent.is_authorized(journey_id, step_id, now) {
            return Err(JourneyError::ConsentRequired {
                journey_id: journey_id.clone(),
                step_id: step_id.clone(),
            });
        }

        let intake = self.read_intake(journey_id, now)?;
        let prefill = self.mapper.prefill(&step.form_schema_ref, &intake)?;
        let request = SubmissionRequest {
            step_id: step_id.clone(),
            form_id: prefill.form_id,
            resolved_fields: prefill.data,
        };

        Ok((journey, request, opening))
    }

    fn settle(
        &self,
        mut journey: Journey,
        step_id: &StepId,
        outcome: Result<SubmissionOutcome, ExecutorError>,
    ) -> Result<Receipt, JourneyError> {
        let now = self.clock.now();
        let journey_id = journey.id.clone();
        let step = journey
            .step_mut(step_id)
            .ok_or_else(|| JourneyError::step_not_found(&journey_id, step_id))?;
        step.attempts += 1;
        let attempts = step.attempts;

        match outcome {
            Ok(outcome) => {
                self.lifecycle.apply(step, StepTransition::Complete)?;
                let receipt = Receipt {
                    receipt_id: outcome.receipt_id,
                    step_id: step_id.clone(),
                    status: outcome.status,
                    submitted_at: now,
                };
                step.receipt = Some(receipt.clone());
                self.repository.update(journey)?;
                self.record(
                    Some(&journey_id),
                    Some(step_id),
                    AuditAction::StepSubmit,
                    AuditActor::Executor,
                    AuditOutcome::Succeeded,
                    json!({
                        "journey_id": journey_id,
                        "step_id": step_id,
                        "receipt_id": receipt.receipt_id,
                        "receipt_status": receipt.status,
                        "attempts": attempts,
                    }),
                    now,
                )?;
                info!(%journey_id, %step_id, receipt_id = %receipt.receipt_id, "step submitted");
                Ok(receipt)
            }
            Err(failure) => {
                self.lifecycle.apply(step, StepTransition::Fail)?;
                step.failure = Some(failure.reason().to_string());
                self.repository.update(journey)?;
                let error = JourneyError::ExecutorFailure(failure);
                self.record(
                    Some(&journey_id),
                    Some(step_id),
                    AuditAction::StepSubmit,
                    AuditActor::Executor,
                    AuditOutcome::Failed { kind: error.kind() },
                    json!({
                        "journey_id": journey_id,
                        "step_id": step_id,
                        "attempts": attempts,
                        "reason": error_reason(&error),
                    }),
                    now,
                )?;
                warn!(%journey_id, %step_id, attempts, reason = error_reason(&error), "step submission failed");
                Err(error)
            }
        }
    }

    pub fn get_plan(&self, journey_id: &JourneyId) -> Result<JourneyPlanView, JourneyError> {
        Ok(self.load(journey_id)?.plan_view())
    }

    pub fn get_audit_trail(&self, journey_id: &JourneyId) -> Result<Vec<AuditEntry>, JourneyError> {
        self.load(journey_id)?;
        Ok(self.audit.read_trail(journey_id)?)
    }

    pub fn audit_search(
        &self,
        action: Option<AuditAction>,
        limit: usize,
    ) -> Result<Vec<AuditEntry>, JourneyError> {
        Ok(self.audit.query(action, limit)?)
    }

    pub fn consent_summary(&self) -> ConsentSummary {
        self.consent.summary(self.clock.now())
    }

    pub fn verify_audit_chain(&self) -> Result<ChainVerification, JourneyError> {
        Ok(self.audit.verify_chain()?)
    }

    pub fn list_artifacts(&self, filter: &ArtifactFilter) -> Result<ArtifactListing, JourneyError> {
        let journeys = match &filter.journey_id {
            Some(journey_id) => self.repository.fetch(journey_id)?.into_iter().collect(),
            None => self.repository.list()?,
        };
        let grants = self.consent.all_grants();
        let vaulted_at = |journey_id: &JourneyId| self.vault.stored_at(journey_id);

        Ok(artifacts::catalog(
            ArtifactSources {
                journeys: &journeys,
                grants: &grants,
                vaulted_at: &vaulted_at,
            },
            filter,
        ))
    }

    /// Purges expired intakes and long-expired consent grants.
    pub fn cleanup(&self) -> Result<CleanupReport, JourneyError> {
        let now = self.clock.now();
        let purged = self.vault.purge_expired(now).map_err(JourneyError::from).and_then(|vault| {
            self.consent
                .purge_expired(now, self.config.consent_retention)
                .map(|grants| (vault, grants))
                .map_err(JourneyError::from)
        });

        match purged {
            Ok((vault_records_purged, consent_grants_purged)) => {
                self.prune_locks();
                self.record(
                    None,
                    None,
                    AuditAction::MaintenanceCleanup,
                    AuditActor::Maintenance,
                    AuditOutcome::Succeeded,
                    json!({
                        "vault_records_purged": vault_records_purged,
                        "consent_grants_purged": consent_grants_purged,
                    }),
                    now,
                )?;
                Ok(CleanupReport {
                    vault_records_purged,
                    consent_grants_purged,
                    ran_at: now,
                })
            }
            Err(error) => {
                self.record_failure(
                    None,
                    None,
                    AuditAction::MaintenanceCleanup,
                    AuditActor::Maintenance,
                    &error,
                    now,
                );
                Err(error)
            }
        }
    }

    fn load(&self, journey_id: &JourneyId) -> Result<Journey, JourneyError> {
        self.repository
            .fetch(journey_id)?
            .ok_or_else(|| JourneyError::journey_not_found(journey_id))
    }

    /// The journey exists, so a missing intake was purged after expiry.
    fn read_intake(&self, journey_id: &JourneyId, now: DateTime<Utc>) -> Result<Intake, JourneyError> {
        self.vault.read(journey_id, now).map_err(|error| match error {
            VaultError::NotFound(journey_id) => JourneyError::Expired(journey_id),
            other => other.into(),
        })
    }

    /// Serialises work on one journey. Unknown ids fail before a lock is allocated.
    async fn acquire(
        &self,
        journey_id: &JourneyId,
        step_id: Option<&StepId>,
        action: AuditAction,
    ) -> Result<OwnedMutexGuard<()>, JourneyError> {
        match self.journey_lock(journey_id) {
            Ok(lock) => Ok(lock.lock_owned().await),
            Err(error) => {
                self.record_failure(
                    Some(journey_id),
                    step_id,
                    action,
                    AuditActor::Applicant,
                    &error,
                    self.clock.now(),
                );
                Err(error)
            }
        }
    }

    fn journey_lock(&self, journey_id: &JourneyId) -> Result<Arc<tokio::sync::Mutex<()>>, JourneyError> {
        if let Some(lock) = self
            .locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(journey_id)
        {
            return Ok(lock.clone());
        }

        self.load(journey_id)?;
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(locks.entry(journey_id.clone()).or_default().clone())
    }

    /// Drops locks no request is holding or waiting on.
    fn prune_locks(&self) {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
    }

    #[cfg(test)]
    pub(crate) fn tracked_locks(&self) -> usize {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    #[cfg(test)]
    pub(crate) fn audit_log(&self) -> &AuditLog {
        &self.audit
    }

    /// Called once the change is persisted. An append failure leaves the
    /// change in place and surfaces as `Internal` naming the applied action.
    #[allow(clippy::too_many_arguments)]
    fn record(
        &self,
        journey_id: Option<&JourneyId>,
        step_id: Option<&StepId>,
        action: AuditAction,
        actor: AuditActor,
        outcome: AuditOutcome,
        payload: Value,
        now: DateTime<Utc>,
    ) -> Result<(), JourneyError> {
        self.append(journey_id, step_id, action, actor, outcome, payload, now)
            .map(|_| ())
            .map_err(|error| {
                warn!(
                    journey_id = journey_id.map(JourneyId::as_str),
                    step_id = step_id.map(StepId::as_str),
                    action = action.label(),
                    %error,
                    "change applied but audit append failed"
                );
                JourneyError::Internal(format!(
                    "{} was applied but could not be audited: {error}",
                    action.label()
                ))
            })
    }

    #[allow(clippy::too_many_arguments)]
    fn append(
        &self,
        journey_id: Option<&JourneyId>,
        step_id: Option<&StepId>,
        action: AuditAction,
        actor: AuditActor,
        outcome: AuditOutcome,
        payload: Value,
        now: DateTime<Utc>,
    ) -> Result<AuditEntry, AuditError> {
        self.audit.append(
            AuditEvent {
                journey_id: journey_id.cloned(),
                step_id: step_id.cloned(),
                action,
                actor,
                outcome,
                payload,
            },
            now,
        )
    }

    /// The original error wins; a failing audit append is only logged.
    fn record_failure(
        &self,
        journey_id: Option<&JourneyId>,
        step_id: Option<&StepId>,
        action: AuditAction,
        actor: AuditActor,
        error: &JourneyError,
        now: DateTime<Utc>,
    ) {
        let kind = error.kind();
        let payload = json!({
            "journey_id": journey_id,
            "step_id": step_id,
            "action": action.label(),
            "kind": kind,
        });
        if let Err(audit_error) = self.append(
            journey_id,
            step_id,
            action,
            actor,
            AuditOutcome::Failed { kind },
            payload,
            now,
        ) {
            warn!(action = action.label(), error = %audit_error, "audit append failed");
        }
        warn!(
            journey_id = journey_id.map(JourneyId::as_str),
            step_id = step_id.map(StepId::as_str),
            action = action.label(),
            kind = kind.label(),
            "journey operation failed"
        );
    }
}

/// Fails the step as cancelled if the submit future is dropped mid-flight.
struct InFlight<'a, R, E>
where
    R: JourneyRepository + 'static,
    E: SubmissionExecutor + 'static,
{
    service: &'a JourneyService<R, E>,
    journey: Option<Journey>,
    step_id: StepId,
}

impl<R, E> Drop for InFlight<'_, R, E>
where
    R: JourneyRepository + 'static,
    E: SubmissionExecutor + 'static,
{
    fn drop(&mut self) {
        if let Some(journey) = self.journey.take() {
            let journey_id = journey.id.clone();
            if let Err(error) = self
                .service
                .settle(journey, &self.step_id, Err(ExecutorError::Cancelled))
            {
                if !matches!(error, JourneyError::ExecutorFailure(ExecutorError::Cancelled)) {
                    warn!(%journey_id, step_id = %self.step_id, %error, "cancelled submission could not be settled");
                }
            }
        }
    }
}

fn error_reason(error: &JourneyError) -> &'static str {
    match error {
        JourneyError::ExecutorFailure(failure) => failure.reason(),
        other => other.kind().label(),
    }
}

/// The digest is keyed per service instance so low-entropy field values
/// cannot be recovered by hashing guesses offline.
fn snapshot_of(
    prefill: &FormPrefill,
    key: &str,
    now: DateTime<Utc>,
) -> Result<PrefillSnapshot, JourneyError> {
    let encoded = serde_json::to_vec(&prefill.data)
        .map_err(|err| JourneyError::Internal(format!("prefill data could not be hashed: {err}")))?;
    let mut hasher = Sha256::new();
    hasher.update(key.as_bytes());
    hasher.update(b"|");
    hasher.update(&encoded);
    Ok(PrefillSnapshot {
        form_id: prefill.form_id.clone(),
        resolved: prefill.count(FieldStatus::Resolved),
        defaulted: prefill.count(FieldStatus::Defaulted),
        missing: prefill.count(FieldStatus::Missing),
        data_hash: hex::encode(hasher.finalize()),
        captured_at: now,
    })
}
