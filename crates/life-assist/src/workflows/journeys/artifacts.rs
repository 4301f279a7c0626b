use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use super::consent::ConsentGrant;
use super::domain::{Journey, JourneyId, StepId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    Intake,
    Prefill,
    Submission,
    Consent,
}

impl ArtifactKind {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Intake => "intake",
            Self::Prefill => "prefill",
            Self::Submission => "submission",
            Self::Consent => "consent",
        }
    }
}

/// Metadata about something a journey produced. Never carries field values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactView {
    pub journey_id: JourneyId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step_id: Option<StepId>,
    pub kind: ArtifactKind,
    pub reference: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ArtifactFilter {
    #[serde(default)]
    pub journey_id: Option<JourneyId>,
    #[serde(default)]
    pub kind: Option<ArtifactKind>,
}

impl ArtifactFilter {
    fn matches(&self, artifact: &ArtifactView) -> bool {
        self.journey_id
            .as_ref()
            .map_or(true, |journey_id| &artifact.journey_id == journey_id)
            && self.kind.map_or(true, |kind| artifact.kind == kind)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ArtifactStats {
    pub journeys: usize,
    pub artifacts: usize,
    pub by_kind: BTreeMap<&'static str, usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ArtifactListing {
    pub artifacts: Vec<ArtifactView>,
    pub stats: ArtifactStats,
}

/// Sources the catalog is built from.
pub struct ArtifactSources<'a> {
    pub journeys: &'a [Journey],
    pub grants: &'a [ConsentGrant],
    /// When each journey's intake was vaulted, if it still is.
    pub vaulted_at: &'a dyn Fn(&JourneyId) -> Option<DateTime<Utc>>,
}

pub fn catalog(sources: ArtifactSources<'_>, filter: &ArtifactFilter) -> ArtifactListing {
    let mut artifacts = Vec::new();

    for journey in sources.journeys {
        if let Some(stored_at) = (sources.vaulted_at)(&journey.id) {
            artifacts.push(ArtifactView {
                journey_id: journey.id.clone(),
                step_id: None,
                kind: ArtifactKind::Intake,
                reference: format!("vault:{}", journey.id),
                created_at: stored_at,
            });
        }

        for step in &journey.steps {
            if let Some(snapshot) = &step.prefill_snapshot {
                artifacts.push(ArtifactView {
                    journey_id: journey.id.clone(),
                    step_id: Some(step.id.clone()),
                    kind: ArtifactKind::Prefill,
                    reference: snapshot.form_id.clone(),
                    created_at: snapshot.captured_at,
                });
            }
            if let Some(receipt) = &step.receipt {
                artifacts.push(ArtifactView {
                    journey_id: journey.id.clone(),
                    step_id: Some(step.id.clone()),
                    kind: ArtifactKind::Submission,
                    reference: receipt.receipt_id.clone(),
                    created_at: receipt.submitted_at,
                });
            }
        }
    }

    for grant in sources.grants {
        artifacts.push(ArtifactView {
            journey_id: grant.journey_id.clone(),
            step_id: None,
            kind: ArtifactKind::Consent,
            reference: grant.grant_id.clone(),
            created_at: grant.granted_at,
        });
    }

    artifacts.retain(|artifact| filter.matches(artifact));
    artifacts.sort_by(|left, right| {
        left.created_at
            .cmp(&right.created_at)
            .then_with(|| left.journey_id.cmp(&right.journey_id))
            .then_with(|| left.kind.cmp(&right.kind))
    });

    let journeys: BTreeSet<&JourneyId> = artifacts.iter().map(|artifact| &artifact.journey_id).collect();
    let mut stats = ArtifactStats {
        journeys: journeys.len(),
        artifacts: artifacts.len(),
        by_kind: BTreeMap::new(),
    };
    for artifact in &artifacts {
        *stats.by_kind.entry(artifact.kind.label()).or_default() += 1;
    }

    ArtifactListing { artifacts, stats }
}
