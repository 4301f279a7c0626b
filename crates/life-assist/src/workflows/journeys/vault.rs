use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::RwLock;

use super::domain::JourneyId;
use super::intake::Intake;

#[derive(Debug, Clone)]
pub struct VaultRecord {
    pub intake: Intake,
    pub created_at: DateTime<Utc>,
    pub ttl: Duration,
}

impl VaultRecord {
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.created_at
            .checked_add_signed(self.ttl)
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VaultError {
    #[error("no vaulted intake for journey {0}")]
    NotFound(JourneyId),
    #[error("vaulted intake for journey {0} has expired")]
    Expired(JourneyId),
    #[error("vault unavailable: {0}")]
    Unavailable(String),
}

/// TTL-bound store of raw intakes, kept apart from journeys and the audit log.
///
/// A single lock covers every record, so a reader never observes a partially
/// written intake.
#[derive(Debug)]
pub struct IntakeVault {
    ttl: Duration,
    records: RwLock<HashMap<JourneyId, VaultRecord>>,
}

impl IntakeVault {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            records: RwLock::new(HashMap::new()),
        }
    }

    /// Last write wins.
    pub fn store(
        &self,
        journey_id: &JourneyId,
        intake: Intake,
        now: DateTime<Utc>,
    ) -> Result<(), VaultError> {
        let mut guard = self
            .records
            .write()
            .map_err(|_| VaultError::Unavailable("vault lock poisoned".to_string()))?;
        guard.insert(
            journey_id.clone(),
            VaultRecord {
                intake,
                created_at: now,
                ttl: self.ttl,
            },
        );
        Ok(())
    }

    pub fn read(&self, journey_id: &JourneyId, now: DateTime<Utc>) -> Result<Intake, VaultError> {
        let guard = self
            .records
            .read()
            .map_err(|_| VaultError::Unavailable("vault lock poisoned".to_string()))?;
        let record = guard
            .get(journey_id)
            .ok_or_else(|| VaultError::NotFound(journey_id.clone()))?;
        if record.is_expired(now) {
            return Err(VaultError::Expired(journey_id.clone()));
        }
        Ok(record.intake.clone())
    }

    /// Metadata only; the intake never leaves through this path.
    pub fn stored_at(&self, journey_id: &JourneyId) -> Option<DateTime<Utc>> {
        self.records
            .read()
            .ok()
            .and_then(|guard| guard.get(journey_id).map(|record| record.created_at))
    }

    /// Drops every expired record and returns how many were removed.
    pub fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize, VaultError> {
        let mut guard = self
            .records
            .write()
            .map_err(|_| VaultError::Unavailable("vault lock poisoned".to_string()))?;
        let before = guard.len();
        guard.retain(|_, record| !record.is_expired(now));
        Ok(before - guard.len())
    }

    pub fn len(&self) -> usize {
        self.records.read().map(|guard| guard.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
