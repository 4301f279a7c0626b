//! Life-event journeys: classification, planning, prefill, consent-gated
//! submission, and the audit trail that records every attempt.

pub mod artifacts;
pub mod audit;
pub mod blueprint;
pub mod classifier;
pub mod clock;
pub mod consent;
pub mod domain;
pub mod error;
pub mod executor;
pub mod forms;
pub mod intake;
pub(crate) mod lifecycle;
pub mod repository;
pub mod router;
pub mod service;
pub mod vault;

#[cfg(test)]
mod tests;

pub use artifacts::{ArtifactFilter, ArtifactKind, ArtifactListing, ArtifactStats, ArtifactView};
pub use audit::{
    AuditAction, AuditActor, AuditEntry, AuditLog, AuditOutcome, ChainVerification, GENESIS_HASH,
};
pub use blueprint::{JourneyBlueprint, JourneyPlanner, StepTemplate};
pub use clock::{Clock, ManualClock, SystemClock};
pub use consent::{ConsentGrant, ConsentLedger, ConsentSummary};
pub use domain::{
    Journey, JourneyId, JourneyPlanView, JourneyStatus, LifeEvent, PrefillSnapshot, Receipt,
    ReceiptStatus, Step, StepId, StepStatus,
};
pub use error::{ErrorKind, JourneyError};
pub use executor::{
    ExecutorError, SimulatedExecutor, SubmissionExecutor, SubmissionOutcome, SubmissionRequest,
};
pub use forms::{FieldMapper, FieldStatus, FormCatalog, FormField, FormPrefill, FormSchema};
pub use intake::{
    Address, Baby, Banking, CarerDetails, Disaster, Employment, Housing, Intake, IntakeSection,
    IntakeViolation, Person, Sex,
};
pub use lifecycle::{LifecycleError, StepTransition};
pub use repository::{JourneyRepository, RepositoryError};
pub use router::journey_router;
pub use service::{CleanupReport, JourneyRequest, JourneyService, ReviewPayload};
pub use vault::{IntakeVault, VaultError};
