use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::BTreeMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use tracing::warn;
use underwriting_ai::config::{GameConfig, TriageDispatchMode};
use underwriting_ai::workflows::underwriting::{
    DisabledTriageDispatcher, DispatchError, FallbackPredictionSource, JsonFilePredictionSource,
    MockPredictionSource, PropertyCatalog, ReconciliationEngine, RepositoryError, SelectionState,
    SubmissionId, SubmissionRecord, SubmissionRepository, TriageDispatcher, TriageNotice,
    TriageOutbox,
};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
    pub(crate) engine: Arc<ReconciliationEngine>,
}

/// Export-backed predictions with the static mock as safety net.
pub(crate) type ConfiguredPredictionSource =
    FallbackPredictionSource<JsonFilePredictionSource, MockPredictionSource>;

pub(crate) fn prediction_source(config: &GameConfig) -> ConfiguredPredictionSource {
    FallbackPredictionSource::new(
        JsonFilePredictionSource::new(config.predictions_json.clone()),
        MockPredictionSource::standard(),
    )
}

/// CSV overlay when configured; the built-in six otherwise or when the import fails.
pub(crate) fn load_catalog(config: &GameConfig) -> PropertyCatalog {
    match &config.properties_csv {
        Some(path) => PropertyCatalog::from_path(path).unwrap_or_else(|err| {
            warn!(path = %path.display(), error = %err, "property export unusable; using built-in catalog");
            PropertyCatalog::standard()
        }),
        None => PropertyCatalog::standard(),
    }
}

#[derive(Default, Clone)]
pub(crate) struct InMemorySubmissionRepository {
    records: Arc<Mutex<BTreeMap<SubmissionId, SubmissionRecord>>>,
}

impl InMemorySubmissionRepository {
    fn lock(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, BTreeMap<SubmissionId, SubmissionRecord>>, RepositoryError>
    {
        self.records
            .lock()
            .map_err(|_| RepositoryError::Unavailable("repository mutex poisoned".to_string()))
    }
}

impl SubmissionRepository for InMemorySubmissionRepository {
    fn insert(&self, record: SubmissionRecord) -> Result<SubmissionRecord, RepositoryError> {
        let mut guard = self.lock()?;
        if guard.contains_key(&record.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(record.id, record.clone());
        Ok(record)
    }

    fn update(&self, record: SubmissionRecord) -> Result<(), RepositoryError> {
        let mut guard = self.lock()?;
        if guard.contains_key(&record.id) {
            guard.insert(record.id, record);
            Ok(())
        } else {
            Err(RepositoryError::NotFound)
        }
    }

    fn fetch(&self, id: SubmissionId) -> Result<Option<SubmissionRecord>, RepositoryError> {
        let guard = self.lock()?;
        Ok(guard.get(&id).cloned())
    }

    fn latest(&self) -> Result<Option<SubmissionRecord>, RepositoryError> {
        let guard = self.lock()?;
        Ok(guard
            .values()
            .max_by(|left, right| {
                left.created_at
                    .cmp(&right.created_at)
                    .then_with(|| left.id.cmp(&right.id))
            })
            .cloned())
    }

    fn scored(&self) -> Result<Vec<SubmissionRecord>, RepositoryError> {
        let guard = self.lock()?;
        Ok(guard
            .values()
            .filter(|record| record.score.is_some())
            .cloned()
            .collect())
    }
}

/// Dispatcher picked by `TRIAGE_DISPATCH`.
pub(crate) enum ConfiguredDispatcher {
    Disabled(DisabledTriageDispatcher),
    Memory(TriageOutbox),
}

impl ConfiguredDispatcher {
    pub(crate) fn from_mode(mode: TriageDispatchMode) -> Self {
        match mode {
            TriageDispatchMode::Disabled => Self::Disabled(DisabledTriageDispatcher),
            TriageDispatchMode::Memory => Self::Memory(TriageOutbox::default()),
        }
    }
}

impl TriageDispatcher for ConfiguredDispatcher {
    fn dispatch(&self, notices: &[TriageNotice]) -> Result<(), DispatchError> {
        match self {
            Self::Disabled(dispatcher) => dispatcher.dispatch(notices),
            Self::Memory(outbox) => outbox.dispatch(notices),
        }
    }
}

/// One token of a positional `P,D,U,...` list.
pub(crate) fn parse_selection(raw: &str) -> Result<SelectionState, String> {
    SelectionState::parse(raw)
        .ok_or_else(|| format!("'{}' is not a selection (use P, D, or U)", raw.trim()))
}
