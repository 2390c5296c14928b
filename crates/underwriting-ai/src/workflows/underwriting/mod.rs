//! The underwriting game: property catalog, selection board, AI prediction intake,
//! reconciliation and scoring, leaderboard, and tier triage.

pub mod catalog;
pub mod domain;
pub mod ingest;
pub mod reconciliation;
pub mod repository;
pub mod router;
pub mod selection;
pub mod service;
pub mod sources;
pub mod triage;

#[cfg(test)]
mod tests;

pub use catalog::{CatalogImportError, PropertyCatalog};
pub use domain::{
    AiPrediction, ConstructionRisk, Decision, Exclusion, FeatureAttribution, FlaggedParameter,
    PredictionCategory, Property, PropertyId, RiskLabel, SelectionState, Tier, ValidationError,
    VulnerabilityReport,
};
pub use ingest::{adapt_record, adapt_records, PredictionExport, RawPredictionRecord};
pub use reconciliation::{
    DiscardHighRule, RankedDriverList, ReconciledRow, Reconciliation, ReconciliationConfig,
    ReconciliationEngine, ReconciliationError, RowStatus, ScoreResult, ScoringError,
    UserSelection,
};
pub use repository::{
    LeaderboardEntry, RepositoryError, SubmissionId, SubmissionRecord, SubmissionRepository,
    SubmissionSummary,
};
pub use router::game_router;
pub use selection::{BoardState, SelectionBoard, SelectionError, SelectionMode, SubmissionDraft};
pub use service::{GameServiceError, ProcessOutcome, SubmissionResults, UnderwritingGameService};
pub use sources::{
    FallbackPredictionSource, JsonFilePredictionSource, MockPredictionSource, PredictionSource,
    PredictionSourceError,
};
pub use triage::{
    DisabledTriageDispatcher, DispatchError, DispatchStatus, TriageDispatchSummary,
    TriageDispatcher, TriageGroup, TriageNotice, TriageOutbox,
};
