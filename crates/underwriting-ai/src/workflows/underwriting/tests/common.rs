use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use axum::response::Response;
use serde_json::Value;

use crate::workflows::underwriting::domain::{
    AiPrediction, Decision, Exclusion, FeatureAttribution, FlaggedParameter, PredictionCategory,
    PropertyId, RiskLabel, SelectionState, Tier,
};
use crate::workflows::underwriting::ingest::{RawPredictionRecord, RawShapValue};
use crate::workflows::underwriting::reconciliation::ReconciliationConfig;
use crate::workflows::underwriting::repository::{
    RepositoryError, SubmissionId, SubmissionRecord, SubmissionRepository,
};
use crate::workflows::underwriting::triage::TriageOutbox;
use crate::workflows::underwriting::{
    game_router, MockPredictionSource, PropertyCatalog, UnderwritingGameService,
};

pub(super) type TestService =
    UnderwritingGameService<MemoryRepository, MockPredictionSource, TriageOutbox>;

pub(super) fn attribution(feature: &str, contribution: f64) -> FeatureAttribution {
    FeatureAttribution {
        feature: feature.to_string(),
        contribution,
        value: None,
    }
}

pub(super) fn prediction(id: u32, tier: Tier) -> AiPrediction {
    let score = match tier {
        Tier::High => 0.85,
        Tier::Mid => 0.5,
        Tier::Low => 0.1,
    };
    AiPrediction {
        property_id: PropertyId(id),
        propensity_score: score,
        category: PredictionCategory::Propensity(tier),
        total_risk_score: None,
        exclusion: None,
        attributions: vec![
            attribution("property_age", 0.4),
            attribution("annual_income", -0.2),
        ],
        vulnerability: None,
    }
}

pub(super) fn legacy_prediction(id: u32, label: RiskLabel) -> AiPrediction {
    AiPrediction {
        category: PredictionCategory::LegacyRisk(label),
        ..prediction(id, Tier::Mid)
    }
}

pub(super) fn excluded_prediction(id: u32, tier: Tier) -> AiPrediction {
    AiPrediction {
        exclusion: Some(Exclusion {
            reason: "Property in flood zone AE without elevation certificate".to_string(),
            flagged_parameters: vec![FlaggedParameter {
                name: "flood_zone".to_string(),
                value: "AE".to_string(),
                description: "High-risk flood zone".to_string(),
            }],
        }),
        ..prediction(id, tier)
    }
}

pub(super) fn decisions(selections: &[SelectionState], tiers: &[Tier]) -> Vec<Decision> {
    selections
        .iter()
        .zip(tiers)
        .enumerate()
        .map(|(index, (selection, tier))| {
            Decision::new(*selection, &prediction(index as u32 + 1, *tier))
        })
        .collect()
}

pub(super) fn raw_record(id: u32) -> RawPredictionRecord {
    RawPredictionRecord {
        property_id: Some(id),
        quote_propensity: Some(0.82),
        quote_propensity_label: Some("High Propensity".to_string()),
        shap_values: Some(vec![RawShapValue {
            feature: Some("property_age".to_string()),
            contribution: Some(1.2),
            value: Some(25.0),
        }]),
        ..RawPredictionRecord::default()
    }
}

pub(super) fn build_service() -> (TestService, Arc<MemoryRepository>, Arc<TriageOutbox>) {
    let repository = Arc::new(MemoryRepository::default());
    let outbox = Arc::new(TriageOutbox::default());
    let service = UnderwritingGameService::new(
        PropertyCatalog::standard(),
        repository.clone(),
        Arc::new(MockPredictionSource::standard()),
        outbox.clone(),
        ReconciliationConfig::default(),
    )
    .with_triage_base_url("https://triage.example");
    (service, repository, outbox)
}

pub(super) fn game_router_with_service(service: TestService) -> axum::Router {
    game_router(Arc::new(service))
}

#[derive(Default, Clone)]
pub(super) struct MemoryRepository {
    pub(super) records: Arc<Mutex<BTreeMap<SubmissionId, SubmissionRecord>>>,
}

impl SubmissionRepository for MemoryRepository {
    fn insert(&self, record: SubmissionRecord) -> Result<SubmissionRecord, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        if guard.contains_key(&record.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(record.id, record.clone());
        Ok(record)
    }

    fn update(&self, record: SubmissionRecord) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        guard.insert(record.id, record);
        Ok(())
    }

    fn fetch(&self, id: SubmissionId) -> Result<Option<SubmissionRecord>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.get(&id).cloned())
    }

    fn latest(&self) -> Result<Option<SubmissionRecord>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard
            .values()
            .max_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)))
            .cloned())
    }

    fn scored(&self) -> Result<Vec<SubmissionRecord>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard
            .values()
            .filter(|record| record.score.is_some())
            .cloned()
            .collect())
    }
}

pub(super) struct UnavailableRepository;

impl SubmissionRepository for UnavailableRepository {
    fn insert(&self, _record: SubmissionRecord) -> Result<SubmissionRecord, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn update(&self, _record: SubmissionRecord) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch(&self, _id: SubmissionId) -> Result<Option<SubmissionRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn latest(&self) -> Result<Option<SubmissionRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn scored(&self) -> Result<Vec<SubmissionRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 256 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
