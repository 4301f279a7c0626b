use life_assist::workflows::journeys::{Journey, JourneyId, JourneyRepository, RepositoryError};
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryJourneyRepository {
    records: Arc<Mutex<HashMap<JourneyId, Journey>>>,
}

impl JourneyRepository for InMemoryJourneyRepository {
    fn insert(&self, journey: Journey) -> Result<Journey, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        if guard.contains_key(&journey.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(journey.id.clone(), journey.clone());
        Ok(journey)
    }

    fn update(&self, journey: Journey) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        if guard.contains_key(&journey.id) {
            guard.insert(journey.id.clone(), journey);
            Ok(())
        } else {
            Err(RepositoryError::NotFound)
        }
    }

    fn fetch(&self, id: &JourneyId) -> Result<Option<Journey>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn list(&self) -> Result<Vec<Journey>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        let mut journeys: Vec<Journey> = guard.values().cloned().collect();
        journeys.sort_by(|left, right| left.created_at.cmp(&right.created_at));
        Ok(journeys)
    }
}
