use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::super::domain::{Decision, PropertyId, SelectionState, Tier};

/// Points are tracked in half-point units so every score stays exact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HalfPoints(pub u32);

impl HalfPoints {
    pub const ZERO: Self = Self(0);
    pub const HALF: Self = Self(1);
    pub const FULL: Self = Self(2);

    pub fn as_points(self) -> f64 {
        f64::from(self.0) / 2.0
    }
}

/// Aggregate alignment for one underwriter submission.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreResult {
    pub percentage: u8,
    pub earned_points: f64,
    pub max_points: f64,
    pub scored_count: usize,
    pub expected_count: usize,
}

impl ScoreResult {
    pub fn is_partial(&self) -> bool {
        self.scored_count < self.expected_count
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScoringError {
    #[error("expected property count must be positive")]
    ZeroExpectedCount,
    #[error("received {supplied} decisions but only {expected} properties are scorable")]
    TooManyDecisions { supplied: usize, expected: usize },
    #[error("property {0} appears more than once")]
    DuplicateProperty(PropertyId),
}

/// Points earned by one decision.
///
/// Exclusion outranks the category: discarding an excluded property is full credit,
/// anything else on it earns nothing.
pub fn decision_points(decision: &Decision) -> HalfPoints {
    if decision.excluded {
        return match decision.selection {
            SelectionState::Discarded => HalfPoints::FULL,
            _ => HalfPoints::ZERO,
        };
    }

    match (decision.selection, decision.category.tier()) {
        (SelectionState::Prioritized, Tier::High) => HalfPoints::FULL,
        (SelectionState::Discarded, Tier::Low) => HalfPoints::FULL,
        (SelectionState::Prioritized | SelectionState::Discarded, Tier::Mid) => HalfPoints::HALF,
        _ => HalfPoints::ZERO,
    }
}

/// Score a submission against `expected_count` properties.
///
/// The denominator is always `expected_count`, so a partially loaded result under-reports
/// rather than overstating alignment.
pub fn compute_score(
    decisions: &[Decision],
    expected_count: usize,
) -> Result<ScoreResult, ScoringError> {
    if expected_count == 0 {
        return Err(ScoringError::ZeroExpectedCount);
    }
    if decisions.len() > expected_count {
        return Err(ScoringError::TooManyDecisions {
            supplied: decisions.len(),
            expected: expected_count,
        });
    }

    let mut seen = HashSet::with_capacity(decisions.len());
    let mut earned: u64 = 0;
    for decision in decisions {
        if !seen.insert(decision.property_id) {
            return Err(ScoringError::DuplicateProperty(decision.property_id));
        }
        earned += u64::from(decision_points(decision).0);
    }

    // round(earned / 2 / expected * 100), half up, in integers.
    let expected = expected_count as u64;
    let percentage = ((earned * 100 + expected) / (2 * expected)).min(100) as u8;

    Ok(ScoreResult {
        percentage,
        earned_points: earned as f64 / 2.0,
        max_points: expected_count as f64,
        scored_count: decisions.len(),
        expected_count,
    })
}
