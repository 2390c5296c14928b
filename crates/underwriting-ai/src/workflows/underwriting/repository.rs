use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::AiPrediction;
use super::reconciliation::ScoreResult;
use super::selection::SubmissionDraft;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubmissionId(pub u64);

impl fmt::Display for SubmissionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Stored submission with its processing outcome, once available.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionRecord {
    pub id: SubmissionId,
    #[serde(flatten)]
    pub draft: SubmissionDraft,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub predictions: Option<Vec<AiPrediction>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<ScoreResult>,
}

impl SubmissionRecord {
    pub fn is_processed(&self) -> bool {
        self.predictions.is_some()
    }

    pub fn summary(&self) -> SubmissionSummary {
        SubmissionSummary {
            id: self.id,
            underwriter_name: self.draft.underwriter_name.clone(),
            prioritized_ids: self.draft.prioritized_ids.iter().map(|id| id.0).collect(),
            discarded_ids: self.draft.discarded_ids.iter().map(|id| id.0).collect(),
            created_at: self.created_at,
            processed: self.is_processed(),
            score_percentage: self.score.as_ref().map(|score| score.percentage),
        }
    }
}

/// API-facing view of a submission without the prediction payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionSummary {
    pub id: SubmissionId,
    pub underwriter_name: String,
    pub prioritized_ids: Vec<u32>,
    pub discarded_ids: Vec<u32>,
    pub created_at: DateTime<Utc>,
    pub processed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score_percentage: Option<u8>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub rank: usize,
    pub submission_id: SubmissionId,
    pub underwriter_name: String,
    pub score_percentage: u8,
    pub created_at: DateTime<Utc>,
}

/// Storage abstraction so the service can be exercised in isolation.
pub trait SubmissionRepository: Send + Sync {
    fn insert(&self, record: SubmissionRecord) -> Result<SubmissionRecord, RepositoryError>;
    fn update(&self, record: SubmissionRecord) -> Result<(), RepositoryError>;
    fn fetch(&self, id: SubmissionId) -> Result<Option<SubmissionRecord>, RepositoryError>;
    /// Most recently created submission.
    fn latest(&self) -> Result<Option<SubmissionRecord>, RepositoryError>;
    /// Every submission that has a score, in any order.
    fn scored(&self) -> Result<Vec<SubmissionRecord>, RepositoryError>;
}

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("submission already exists")]
    Conflict,
    #[error("submission not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Order scored submissions by score descending, earliest first on ties, and rank from 1.
pub fn rank_leaderboard(mut records: Vec<SubmissionRecord>, limit: usize) -> Vec<LeaderboardEntry> {
    records.retain(|record| record.score.is_some());
    records.sort_by(|left, right| {
        let left_score = left.score.as_ref().map(|score| score.percentage);
        let right_score = right.score.as_ref().map(|score| score.percentage);
        right_score
            .cmp(&left_score)
            .then_with(|| left.created_at.cmp(&right.created_at))
            .then_with(|| left.id.cmp(&right.id))
    });

    records
        .into_iter()
        .take(limit)
        .enumerate()
        .filter_map(|(index, record)| {
            let score = record.score.as_ref()?;
            Some(LeaderboardEntry {
                rank: index + 1,
                submission_id: record.id,
                underwriter_name: record.draft.underwriter_name.clone(),
                score_percentage: score.percentage,
                created_at: record.created_at,
            })
        })
        .collect()
}
