use super::domain::{Journey, JourneyId};

/// Storage abstraction for journeys so the service can run against any backend.
pub trait JourneyRepository: Send + Sync {
    fn insert(&self, journey: Journey) -> Result<Journey, RepositoryError>;
    fn update(&self, journey: Journey) -> Result<(), RepositoryError>;
    fn fetch(&self, id: &JourneyId) -> Result<Option<Journey>, RepositoryError>;
    fn list(&self) -> Result<Vec<Journey>, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("journey already exists")]
    Conflict,
    #[error("journey not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
