use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::RwLock;

use super::domain::{Journey, JourneyId, StepId};
use crate::config::max_retention;

/// Scoped, time-limited authorization to submit specific steps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsentGrant {
    pub grant_id: String,
    pub journey_id: JourneyId,
    pub scope: BTreeSet<StepId>,
    pub ttl_seconds: i64,
    pub granted_at: DateTime<Utc>,
    #[serde(skip_serializing)]
    pub signature: Option<String>,
    pub hash: String,
}

impl ConsentGrant {
    pub fn ttl(&self) -> Duration {
        Duration::try_seconds(self.ttl_seconds).unwrap_or(Duration::MAX)
    }

    /// Saturates rather than overflowing for grants built outside the ledger.
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.granted_at
            .checked_add_signed(self.ttl())
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at()
    }

    pub fn covers(&self, step_id: &StepId, now: DateTime<Utc>) -> bool {
        self.is_active(now) && self.scope.contains(step_id)
    }

    pub fn has_signature(&self) -> bool {
        self.signature.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConsentError {
    #[error("consent scope references steps outside the journey: {}", join(.0))]
    InvalidScope(Vec<StepId>),
    #[error("consent scope must name at least one step")]
    EmptyScope,
    #[error("consent ttl must be positive")]
    NonPositiveTtl,
    #[error("consent ttl must not exceed {} days", max_retention().num_days())]
    TtlOutOfRange,
    #[error("consent ledger unavailable: {0}")]
    Unavailable(String),
}

fn join(steps: &[StepId]) -> String {
    steps
        .iter()
        .map(StepId::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConsentSummary {
    pub total_grants: usize,
    pub active_grants: usize,
    pub expired_grants: usize,
    pub scope_breakdown: BTreeMap<StepId, usize>,
}

/// Grants per journey. Coverage is the union of all unexpired grants.
#[derive(Debug, Default)]
pub struct ConsentLedger {
    grants: RwLock<HashMap<JourneyId, Vec<ConsentGrant>>>,
}

impl ConsentLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn grant(
        &self,
        journey: &Journey,
        scope: BTreeSet<StepId>,
        ttl: Duration,
        signature: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<ConsentGrant, ConsentError> {
        if scope.is_empty() {
            return Err(ConsentError::EmptyScope);
        }
        if ttl <= Duration::zero() {
            return Err(ConsentError::NonPositiveTtl);
        }
        if ttl > max_retention() || now.checked_add_signed(ttl).is_none() {
            return Err(ConsentError::TtlOutOfRange);
        }

        let foreign: Vec<StepId> = scope
            .iter()
            .filter(|step_id| !journey.has_step(step_id))
            .cloned()
            .collect();
        if !foreign.is_empty() {
            return Err(ConsentError::InvalidScope(foreign));
        }

        let grant_id = format!("consent_{}", uuid::Uuid::new_v4().simple());
        let hash = grant_hash(&grant_id, &journey.id, &scope, ttl, now, signature.as_deref());
        let grant = ConsentGrant {
            grant_id,
            journey_id: journey.id.clone(),
            scope,
            ttl_seconds: ttl.num_seconds(),
            granted_at: now,
            signature,
            hash,
        };

        let mut guard = self
            .grants
            .write()
            .map_err(|_| ConsentError::Unavailable("ledger lock poisoned".to_string()))?;
        guard
            .entry(journey.id.clone())
            .or_default()
            .push(grant.clone());

        Ok(grant)
    }

    /// True iff some unexpired grant for the journey covers the step.
    pub fn is_authorized(&self, journey_id: &JourneyId, step_id: &StepId, now: DateTime<Utc>) -> bool {
        self.grants
            .read()
            .map(|guard| {
                guard
                    .get(journey_id)
                    .map(|grants| grants.iter().any(|grant| grant.covers(step_id, now)))
                    .unwrap_or(false)
            })
            .unwrap_or(false)
    }

    pub fn grants_for(&self, journey_id: &JourneyId) -> Vec<ConsentGrant> {
        self.grants
            .read()
            .map(|guard| guard.get(journey_id).cloned().unwrap_or_default())
            .unwrap_or_default()
    }

    pub fn all_grants(&self) -> Vec<ConsentGrant> {
        self.grants
            .read()
            .map(|guard| guard.values().flatten().cloned().collect())
            .unwrap_or_default()
    }

    /// Drops grants that expired more than `retention` ago.
    pub fn purge_expired(&self, now: DateTime<Utc>, retention: Duration) -> Result<usize, ConsentError> {
        let mut guard = self
            .grants
            .write()
            .map_err(|_| ConsentError::Unavailable("ledger lock poisoned".to_string()))?;
        let mut removed = 0;
        for grants in guard.values_mut() {
            let before = grants.len();
            grants.retain(|grant| {
                grant
                    .expires_at()
                    .checked_add_signed(retention)
                    .map_or(true, |purge_at| purge_at > now)
            });
            removed += before - grants.len();
        }
        guard.retain(|_, grants| !grants.is_empty());
        Ok(removed)
    }

    pub fn summary(&self, now: DateTime<Utc>) -> ConsentSummary {
        let mut summary = ConsentSummary::default();
        for grant in self.all_grants() {
            summary.total_grants += 1;
            if grant.is_active(now) {
                summary.active_grants += 1;
            } else {
                summary.expired_grants += 1;
            }
            for step_id in &grant.scope {
                *summary.scope_breakdown.entry(step_id.clone()).or_default() += 1;
            }
        }
        summary
    }
}

fn grant_hash(
    grant_id: &str,
    journey_id: &JourneyId,
    scope: &BTreeSet<StepId>,
    ttl: Duration,
    granted_at: DateTime<Utc>,
    signature: Option<&str>,
) -> String {
    let mut hasher = Sha256::new();
    hasher.update(grant_id.as_bytes());
    hasher.update(journey_id.as_str().as_bytes());
    for step_id in scope {
        hasher.update(b"|");
        hasher.update(step_id.as_str().as_bytes());
    }
    hasher.update(ttl.num_seconds().to_be_bytes());
    hasher.update(granted_at.to_rfc3339().as_bytes());
    hasher.update(signature.unwrap_or_default().as_bytes());
    hex::encode(hasher.finalize())
}
