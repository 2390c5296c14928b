mod config;
mod drivers;
mod mismatch;
mod scoring;

pub use config::{DiscardHighRule, ReconciliationConfig};
pub use drivers::{
    aggregate_shap_drivers, local_drivers, normalize_feature_name, DriverDirection, LocalDriver,
    RankedDriver, RankedDriverList,
};
pub use mismatch::classify_mismatch;
pub use scoring::{compute_score, decision_points, HalfPoints, ScoreResult, ScoringError};

use std::collections::{BTreeMap, BTreeSet};

use super::domain::{
    AiPrediction, Decision, PredictionCategory, PropertyId, SelectionState, ValidationError,
};
use serde::{Deserialize, Serialize};

/// Per-property selections for one underwriter. Absent keys are `Unset`.
pub type UserSelection = BTreeMap<PropertyId, SelectionState>;

/// Stateless engine binding the reconciliation rules to one configuration.
#[derive(Debug, Clone, Default)]
pub struct ReconciliationEngine {
    config: ReconciliationConfig,
}

impl ReconciliationEngine {
    pub fn new(config: ReconciliationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ReconciliationConfig {
        &self.config
    }

    pub fn classify_mismatch(
        &self,
        selection: SelectionState,
        category: Option<PredictionCategory>,
        excluded: bool,
    ) -> bool {
        classify_mismatch(selection, category, excluded, self.config.discard_high_rule)
    }

    pub fn compute_score(&self, decisions: &[Decision]) -> Result<ScoreResult, ScoringError> {
        compute_score(decisions, self.config.expected_property_count)
    }

    pub fn aggregate_drivers(
        &self,
        predictions: &[AiPrediction],
    ) -> Result<RankedDriverList, ValidationError> {
        aggregate_shap_drivers(
            predictions.iter().map(|prediction| {
                (
                    prediction.property_id.to_string(),
                    prediction.attributions.as_slice(),
                )
            }),
            self.config.top_driver_count,
            self.config.magnitude_floor,
        )
    }

    /// Pair selections with predictions, classify each property, and score the set.
    pub fn reconcile(
        &self,
        selections: &UserSelection,
        predictions: &[AiPrediction],
    ) -> Result<Reconciliation, ReconciliationError> {
        let mut by_property: BTreeMap<PropertyId, &AiPrediction> = BTreeMap::new();
        for prediction in predictions {
            if by_property
                .insert(prediction.property_id, prediction)
                .is_some()
            {
                return Err(ScoringError::DuplicateProperty(prediction.property_id).into());
            }
        }

        let property_ids: BTreeSet<PropertyId> = by_property
            .keys()
            .chain(selections.keys())
            .copied()
            .collect();

        let mut decisions = Vec::with_capacity(by_property.len());
        let mut rows = Vec::with_capacity(property_ids.len());
        for property_id in property_ids {
            let selection = selections.get(&property_id).copied().unwrap_or_default();
            let prediction = by_property.get(&property_id).copied();
            let decision = prediction.map(|prediction| Decision::new(selection, prediction));
            if let Some(decision) = decision {
                decisions.push(decision);
            }
            rows.push(self.row(property_id, selection, prediction, decision.as_ref()));
        }

        let score = self.compute_score(&decisions)?;
        let drivers = self.aggregate_drivers(predictions)?;

        Ok(Reconciliation {
            rows,
            score,
            drivers,
        })
    }

    fn row(
        &self,
        property_id: PropertyId,
        selection: SelectionState,
        prediction: Option<&AiPrediction>,
        decision: Option<&Decision>,
    ) -> ReconciledRow {
        let category = prediction.map(|prediction| prediction.category);
        let excluded = prediction.map(AiPrediction::is_excluded).unwrap_or(false);
        let mismatch = self.classify_mismatch(selection, category, excluded);

        let status = if excluded {
            RowStatus::Excluded
        } else if selection == SelectionState::Unset || category.is_none() {
            RowStatus::Undecided
        } else if mismatch {
            RowStatus::Mismatch
        } else {
            RowStatus::Match
        };

        ReconciledRow {
            property_id,
            letter: property_id.letter(),
            selection,
            category,
            ai_label: category.map(|category| category.display_label().to_string()),
            propensity_pct: prediction.map(AiPrediction::propensity_pct),
            exclusion_reason: prediction
                .and_then(|prediction| prediction.exclusion.as_ref())
                .map(|exclusion| exclusion.reason.clone()),
            mismatch,
            status,
            points: decision.map(|decision| decision_points(decision).as_points()),
        }
    }
}

/// Display classification of one comparison-table row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowStatus {
    Match,
    Mismatch,
    Excluded,
    Undecided,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciledRow {
    pub property_id: PropertyId,
    pub letter: char,
    pub selection: SelectionState,
    pub category: Option<PredictionCategory>,
    pub ai_label: Option<String>,
    pub propensity_pct: Option<u8>,
    pub exclusion_reason: Option<String>,
    pub mismatch: bool,
    pub status: RowStatus,
    /// `None` when the property had no prediction and was not scored.
    pub points: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reconciliation {
    pub rows: Vec<ReconciledRow>,
    pub score: ScoreResult,
    pub drivers: RankedDriverList,
}

impl Reconciliation {
    pub fn mismatch_count(&self) -> usize {
        self.rows.iter().filter(|row| row.mismatch).count()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ReconciliationError {
    #[error(transparent)]
    Scoring(#[from] ScoringError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
}
