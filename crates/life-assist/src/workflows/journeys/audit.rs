use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::sync::{Mutex, MutexGuard};

use super::domain::{JourneyId, StepId};
use super::error::ErrorKind;

/// Previous hash of the first entry in the chain.
pub const GENESIS_HASH: &str = "0000000000000000000000000000000000000000000000000000000000000000";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AuditAction {
    #[serde(rename = "journey.create")]
    JourneyCreate,
    #[serde(rename = "step.prefill")]
    StepPrefill,
    #[serde(rename = "step.start")]
    StepStart,
    #[serde(rename = "step.retry")]
    StepRetry,
    #[serde(rename = "step.submit")]
    StepSubmit,
    #[serde(rename = "consent.grant")]
    ConsentGrant,
    #[serde(rename = "maintenance.cleanup")]
    MaintenanceCleanup,
}

impl AuditAction {
    pub const fn label(self) -> &'static str {
        match self {
            Self::JourneyCreate => "journey.create",
            Self::StepPrefill => "step.prefill",
            Self::StepStart => "step.start",
            Self::StepRetry => "step.retry",
            Self::StepSubmit => "step.submit",
            Self::ConsentGrant => "consent.grant",
            Self::MaintenanceCleanup => "maintenance.cleanup",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        [
            Self::JourneyCreate,
            Self::StepPrefill,
            Self::StepStart,
            Self::StepRetry,
            Self::StepSubmit,
            Self::ConsentGrant,
            Self::MaintenanceCleanup,
        ]
        .into_iter()
        .find(|action| action.label() == raw)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditActor {
    Applicant,
    System,
    Executor,
    Maintenance,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum AuditOutcome {
    Succeeded,
    Failed { kind: ErrorKind },
}

/// An event to be recorded. The payload is hashed and then dropped.
#[derive(Debug, Clone)]
pub struct AuditEvent {
    pub journey_id: Option<JourneyId>,
    pub step_id: Option<StepId>,
    pub action: AuditAction,
    pub actor: AuditActor,
    pub outcome: AuditOutcome,
    pub payload: Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub sequence: u64,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub journey_id: Option<JourneyId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step_id: Option<StepId>,
    pub action: AuditAction,
    pub actor: AuditActor,
    pub outcome: AuditOutcome,
    pub content_hash: String,
    pub previous_hash: String,
    pub chain_hash: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuditError {
    #[error("audit log unavailable: {0}")]
    Unavailable(String),
    #[error("audit payload could not be encoded: {0}")]
    Encoding(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChainVerification {
    pub valid: bool,
    pub total_entries: usize,
    pub verified_entries: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_invalid_index: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

#[derive(Debug)]
struct ChainState {
    entries: Vec<AuditEntry>,
    head: String,
}

/// Append-only, hash-chained audit log shared by every journey.
///
/// Each entry commits to `sha256(previous_hash | content_hash | metadata)`, so
/// editing, removing, or reordering any entry breaks every later link.
#[derive(Debug)]
pub struct AuditLog {
    state: Mutex<ChainState>,
}

impl Default for AuditLog {
    fn default() -> Self {
        Self::new()
    }
}

impl AuditLog {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ChainState {
                entries: Vec::new(),
                head: GENESIS_HASH.to_string(),
            }),
        }
    }

    pub fn append(&self, event: AuditEvent, now: DateTime<Utc>) -> Result<AuditEntry, AuditError> {
        let content_hash = content_hash(&event.payload)?;
        let mut state = self.state()?;

        let mut entry = AuditEntry {
            sequence: state.entries.len() as u64 + 1,
            timestamp: now,
            journey_id: event.journey_id,
            step_id: event.step_id,
            action: event.action,
            actor: event.actor,
            outcome: event.outcome,
            content_hash,
            previous_hash: state.head.clone(),
            chain_hash: String::new(),
        };
        entry.chain_hash = chain_hash(&entry);

        state.head = entry.chain_hash.clone();
        state.entries.push(entry.clone());
        Ok(entry)
    }

    /// Entries for one journey, in insertion order.
    pub fn read_trail(&self, journey_id: &JourneyId) -> Result<Vec<AuditEntry>, AuditError> {
        Ok(self
            .snapshot()?
            .into_iter()
            .filter(|entry| entry.journey_id.as_ref() == Some(journey_id))
            .collect())
    }

    /// Most recent entries first, optionally restricted to one action.
    pub fn query(
        &self,
        action: Option<AuditAction>,
        limit: usize,
    ) -> Result<Vec<AuditEntry>, AuditError> {
        Ok(self
            .snapshot()?
            .into_iter()
            .rev()
            .filter(|entry| action.map_or(true, |wanted| entry.action == wanted))
            .take(limit)
            .collect())
    }

    pub fn len(&self) -> Result<usize, AuditError> {
        Ok(self.state()?.entries.len())
    }

    pub fn is_empty(&self) -> Result<bool, AuditError> {
        Ok(self.len()? == 0)
    }

    pub fn head_hash(&self) -> Result<String, AuditError> {
        Ok(self.state()?.head.clone())
    }

    pub fn snapshot(&self) -> Result<Vec<AuditEntry>, AuditError> {
        Ok(self.state()?.entries.clone())
    }

    pub fn verify_chain(&self) -> Result<ChainVerification, AuditError> {
        Ok(verify_entries(&self.snapshot()?))
    }

    #[cfg(test)]
    pub(crate) fn poison(&self) {
        std::thread::scope(|scope| {
            let _ = scope
                .spawn(|| {
                    let _state = self.state.lock();
                    panic!("audit lock poisoned on purpose");
                })
                .join();
        });
    }

    fn state(&self) -> Result<MutexGuard<'_, ChainState>, AuditError> {
        self.state
            .lock()
            .map_err(|_| AuditError::Unavailable("audit lock poisoned".to_string()))
    }
}

/// Recomputes every link, stopping at the first broken one.
pub fn verify_entries(entries: &[AuditEntry]) -> ChainVerification {
    let mut result = ChainVerification {
        valid: true,
        total_entries: entries.len(),
        verified_entries: 0,
        first_invalid_index: None,
        error_message: None,
    };

    let mut expected_previous = GENESIS_HASH.to_string();
    for (index, entry) in entries.iter().enumerate() {
        let failure = if entry.previous_hash != expected_previous {
            Some(format!(
                "entry {} has broken link (expected previous {}, got {})",
                entry.sequence, expected_previous, entry.previous_hash
            ))
        } else if chain_hash(entry) != entry.chain_hash {
            Some(format!("entry {} has invalid hash", entry.sequence))
        } else {
            None
        };

        if let Some(message) = failure {
            result.valid = false;
            result.first_invalid_index = Some(index);
            result.error_message = Some(message);
            return result;
        }

        expected_previous = entry.chain_hash.clone();
        result.verified_entries = index + 1;
    }

    result
}

fn content_hash(payload: &Value) -> Result<String, AuditError> {
    // serde_json objects are key-sorted, which keeps this encoding canonical.
    let canonical =
        serde_json::to_vec(payload).map_err(|err| AuditError::Encoding(err.to_string()))?;
    Ok(hex::encode(Sha256::digest(&canonical)))
}

fn chain_hash(entry: &AuditEntry) -> String {
    let outcome = match entry.outcome {
        AuditOutcome::Succeeded => "succeeded",
        AuditOutcome::Failed { kind } => kind.label(),
    };
    let actor = match entry.actor {
        AuditActor::Applicant => "applicant",
        AuditActor::System => "system",
        AuditActor::Executor => "executor",
        AuditActor::Maintenance => "maintenance",
    };

    let mut hasher = Sha256::new();
    hasher.update(entry.previous_hash.as_bytes());
    hasher.update(entry.content_hash.as_bytes());
    hasher.update(entry.sequence.to_be_bytes());
    hasher.update(entry.timestamp.to_rfc3339().as_bytes());
    hasher.update(
        entry
            .journey_id
            .as_ref()
            .map(JourneyId::as_str)
            .unwrap_or_default()
            .as_bytes(),
    );
    hasher.update(b"|");
    hasher.update(
        entry
            .step_id
            .as_ref()
            .map(StepId::as_str)
            .unwrap_or_default()
            .as_bytes(),
    );
    hasher.update(b"|");
    hasher.update(entry.action.label().as_bytes());
    hasher.update(b"|");
    hasher.update(actor.as_bytes());
    hasher.update(b"|");
    hasher.update(outcome.as_bytes());
    hex::encode(hasher.finalize())
}
