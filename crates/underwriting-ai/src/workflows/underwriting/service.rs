use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::catalog::PropertyCatalog;
use super::domain::{AiPrediction, PropertyId, Tier, ValidationError};
use super::ingest::adapt_records;
use super::reconciliation::{
    local_drivers, LocalDriver, Reconciliation, ReconciliationConfig, ReconciliationEngine,
    ReconciliationError, ScoreResult,
};
use super::repository::{
    rank_leaderboard, LeaderboardEntry, RepositoryError, SubmissionId, SubmissionRecord,
    SubmissionRepository, SubmissionSummary,
};
use super::selection::{SelectionError, SubmissionDraft};
use super::sources::{PredictionSource, PredictionSourceError};
use super::triage::{
    build_notices, group_by_tier, DispatchError, DispatchStatus, TierCounts,
    TriageDispatchSummary, TriageDispatcher, TriageGroup,
};

pub const LEADERBOARD_SIZE: usize = 10;

const DEFAULT_TRIAGE_BASE_URL: &str = "http://localhost:5173";

/// Service composing the catalog, prediction source, reconciliation engine, and storage.
pub struct UnderwritingGameService<R, S, D> {
    catalog: Arc<PropertyCatalog>,
    repository: Arc<R>,
    source: Arc<S>,
    dispatcher: Arc<D>,
    engine: Arc<ReconciliationEngine>,
    triage_base_url: String,
}

static SUBMISSION_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_submission_id() -> SubmissionId {
    SubmissionId(SUBMISSION_SEQUENCE.fetch_add(1, Ordering::Relaxed))
}

/// Acknowledgement returned once a submission has been scored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessOutcome {
    pub submission_id: SubmissionId,
    pub status: String,
    pub count: usize,
    pub score: ScoreResult,
}

/// Per-property detail shown beside the comparison table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyResult {
    pub property_id: PropertyId,
    pub letter: char,
    pub submission_id: Option<String>,
    pub prediction: AiPrediction,
    pub local_drivers: Vec<LocalDriver>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionResults {
    pub submission: SubmissionSummary,
    pub reconciliation: Reconciliation,
    pub properties: Vec<PropertyResult>,
}

impl<R, S, D> UnderwritingGameService<R, S, D>
where
    R: SubmissionRepository + 'static,
    S: PredictionSource + 'static,
    D: TriageDispatcher + 'static,
{
    pub fn new(
        catalog: PropertyCatalog,
        repository: Arc<R>,
        source: Arc<S>,
        dispatcher: Arc<D>,
        config: ReconciliationConfig,
    ) -> Self {
        Self {
            catalog: Arc::new(catalog),
            repository,
            source,
            dispatcher,
            engine: Arc::new(ReconciliationEngine::new(config)),
            triage_base_url: DEFAULT_TRIAGE_BASE_URL.to_string(),
        }
    }

    pub fn with_triage_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.triage_base_url = base_url.into();
        self
    }

    pub fn catalog(&self) -> &PropertyCatalog {
        &self.catalog
    }

    pub fn engine(&self) -> &ReconciliationEngine {
        &self.engine
    }

    /// Store a validated draft. Every id must belong to the catalog.
    pub fn submit(&self, draft: SubmissionDraft) -> Result<SubmissionRecord, GameServiceError> {
        if let Some(unknown) = draft
            .prioritized_ids
            .iter()
            .chain(draft.discarded_ids.iter())
            .find(|id| self.catalog.get(**id).is_none())
        {
            return Err(GameServiceError::UnknownProperty(*unknown));
        }

        let record = SubmissionRecord {
            id: next_submission_id(),
            draft,
            created_at: Utc::now(),
            predictions: None,
            score: None,
        };

        let stored = self.repository.insert(record)?;
        info!(
            submission_id = %stored.id,
            underwriter = %stored.draft.underwriter_name,
            prioritized = stored.draft.prioritized_ids.len(),
            discarded = stored.draft.discarded_ids.len(),
            "submission stored"
        );
        Ok(stored)
    }

    /// Run predictions for the whole catalog and score the submission against them.
    ///
    /// Reprocessing replaces the previous predictions and score.
    pub fn process(&self, id: SubmissionId) -> Result<ProcessOutcome, GameServiceError> {
        let mut record = self.repository.fetch(id)?.ok_or(RepositoryError::NotFound)?;

        let predictions = self.predictions()?;
        let reconciliation = self
            .engine
            .reconcile(&record.draft.selections(), &predictions)?;
        let score = reconciliation.score;

        record.predictions = Some(predictions);
        record.score = Some(score);
        let count = record.predictions.as_ref().map(Vec::len).unwrap_or_default();
        self.repository.update(record)?;

        info!(
            submission_id = %id,
            source = self.source.name(),
            count,
            score = score.percentage,
            mismatches = reconciliation.mismatch_count(),
            "submission processed"
        );

        Ok(ProcessOutcome {
            submission_id: id,
            status: "completed".to_string(),
            count,
            score,
        })
    }

    /// Comparison rows, score, and drivers for a processed submission.
    pub fn results(&self, id: SubmissionId) -> Result<SubmissionResults, GameServiceError> {
        let record = self.get(id)?;
        let predictions = record
            .predictions
            .as_deref()
            .ok_or(GameServiceError::NotProcessed(id))?;

        let reconciliation = self
            .engine
            .reconcile(&record.draft.selections(), predictions)?;

        let floor = self.engine.config().magnitude_floor;
        let properties = predictions
            .iter()
            .map(|prediction| {
                Ok(PropertyResult {
                    property_id: prediction.property_id,
                    letter: prediction.property_id.letter(),
                    submission_id: self
                        .catalog
                        .get(prediction.property_id)
                        .map(|property| property.submission_id.clone()),
                    prediction: prediction.clone(),
                    local_drivers: local_drivers(
                        &prediction.property_id.to_string(),
                        &prediction.attributions,
                        floor,
                    )?,
                })
            })
            .collect::<Result<Vec<_>, ValidationError>>()?;

        Ok(SubmissionResults {
            submission: record.summary(),
            reconciliation,
            properties,
        })
    }

    pub fn get(&self, id: SubmissionId) -> Result<SubmissionRecord, GameServiceError> {
        let record = self.repository.fetch(id)?.ok_or(RepositoryError::NotFound)?;
        Ok(record)
    }

    pub fn latest(&self) -> Result<Option<SubmissionSummary>, GameServiceError> {
        Ok(self
            .repository
            .latest()?
            .map(|record| record.summary()))
    }

    pub fn leaderboard(&self) -> Result<Vec<LeaderboardEntry>, GameServiceError> {
        let scored = self.repository.scored()?;
        Ok(rank_leaderboard(scored, LEADERBOARD_SIZE))
    }

    /// Catalog properties grouped by predicted tier, optionally narrowed to one tier.
    pub fn triage(&self, tier: Option<Tier>) -> Result<Vec<TriageGroup>, GameServiceError> {
        let predictions = self.predictions()?;
        let groups = group_by_tier(&self.catalog, &predictions)
            .into_iter()
            .filter(|group| tier.map_or(true, |tier| group.tier == tier))
            .collect();
        Ok(groups)
    }

    /// Send one notice per non-empty tier. Transport failures are reported in the summary.
    pub fn dispatch_triage(
        &self,
        today: NaiveDate,
    ) -> Result<TriageDispatchSummary, GameServiceError> {
        let groups = self.triage(None)?;
        let tiers = TierCounts::from_groups(&groups);
        let notices = build_notices(&groups, &self.triage_base_url, today);

        let summary = match self.dispatcher.dispatch(&notices) {
            Ok(()) => {
                info!(notices = notices.len(), "triage notices dispatched");
                TriageDispatchSummary {
                    status: DispatchStatus::Sent,
                    reason: None,
                    tiers,
                }
            }
            Err(DispatchError::NotConfigured) => {
                info!("triage dispatch not configured; skipping");
                TriageDispatchSummary {
                    status: DispatchStatus::Skipped,
                    reason: Some(
                        "triage dispatch not configured; set TRIAGE_DISPATCH to enable"
                            .to_string(),
                    ),
                    tiers,
                }
            }
            Err(err) => {
                warn!(error = %err, "triage dispatch failed");
                TriageDispatchSummary {
                    status: DispatchStatus::Error,
                    reason: Some(err.to_string()),
                    tiers,
                }
            }
        };

        Ok(summary)
    }

    fn predictions(&self) -> Result<Vec<AiPrediction>, GameServiceError> {
        let records = self.source.predict(&self.catalog.ids())?;
        Ok(adapt_records(records)?)
    }
}

/// Error raised by the game service.
#[derive(Debug, thiserror::Error)]
pub enum GameServiceError {
    #[error(transparent)]
    Selection(#[from] SelectionError),
    #[error("property {0} is not part of this round")]
    UnknownProperty(PropertyId),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error("submission {0} has not been processed yet")]
    NotProcessed(SubmissionId),
    #[error(transparent)]
    Predictions(#[from] PredictionSourceError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Reconciliation(#[from] ReconciliationError),
}
