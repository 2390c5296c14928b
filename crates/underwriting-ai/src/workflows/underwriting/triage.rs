use std::sync::Mutex;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::catalog::PropertyCatalog;
use super::domain::{AiPrediction, Property, Tier};

/// One property routed to a tier's review queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriageEntry {
    pub property: Property,
    pub propensity_score: f64,
    pub propensity_pct: u8,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriageGroup {
    pub tier: Tier,
    pub entries: Vec<TriageEntry>,
}

impl TriageGroup {
    pub fn submission_ids(&self) -> Vec<String> {
        self.entries
            .iter()
            .map(|entry| entry.property.submission_id.clone())
            .collect()
    }
}

/// Group catalog properties by predicted tier, in High, Mid, Low order.
///
/// Excluded properties are left out; they are not routed to any team.
pub fn group_by_tier(catalog: &PropertyCatalog, predictions: &[AiPrediction]) -> Vec<TriageGroup> {
    Tier::ordered()
        .into_iter()
        .map(|tier| TriageGroup {
            tier,
            entries: entries_for(catalog, predictions, tier),
        })
        .collect()
}

fn entries_for(
    catalog: &PropertyCatalog,
    predictions: &[AiPrediction],
    tier: Tier,
) -> Vec<TriageEntry> {
    catalog
        .properties()
        .iter()
        .filter_map(|property| {
            let prediction = predictions
                .iter()
                .find(|prediction| prediction.property_id == property.id)?;
            if prediction.is_excluded() || prediction.tier() != tier {
                return None;
            }
            Some(TriageEntry {
                property: property.clone(),
                propensity_score: prediction.propensity_score,
                propensity_pct: prediction.propensity_pct(),
                label: prediction.category.display_label().to_string(),
            })
        })
        .collect()
}

/// Review request for one tier's underwriting team.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriageNotice {
    pub tier: Tier,
    pub subject: String,
    pub body: String,
    pub link: String,
    pub submission_ids: Vec<String>,
}

pub fn triage_link(base_url: &str, tier: Tier) -> String {
    format!(
        "{}/triage?propensity={}",
        base_url.trim_end_matches('/'),
        tier.label().to_ascii_lowercase()
    )
}

/// One notice per non-empty tier.
pub fn build_notices(groups: &[TriageGroup], base_url: &str, today: NaiveDate) -> Vec<TriageNotice> {
    let date = today.format("%b %d, %Y").to_string();
    groups
        .iter()
        .filter(|group| !group.entries.is_empty())
        .map(|group| {
            let tier = group.tier.label();
            let link = triage_link(base_url, group.tier);
            let submission_ids = group.submission_ids();
            let body = format!(
                "Dear {tier} Propensity UWT Team,\n\n\
                 The AI underwriting agent has identified {count} submission(s) classified as \
                 {tier} Propensity that require your review.\n\n\
                 Submission IDs: {ids}\n\n\
                 Please review the details at:\n{link}\n",
                count = submission_ids.len(),
                ids = submission_ids.join(", "),
            );
            TriageNotice {
                tier: group.tier,
                subject: format!("Submissions for {date} – {tier} Propensity"),
                body,
                link,
                submission_ids,
            }
        })
        .collect()
}

/// Outbound hook for triage notices (e-mail relay, chat webhook, ...).
pub trait TriageDispatcher: Send + Sync {
    fn dispatch(&self, notices: &[TriageNotice]) -> Result<(), DispatchError>;
}

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("triage dispatch is not configured")]
    NotConfigured,
    #[error("triage transport unavailable: {0}")]
    Transport(String),
}

/// Dispatcher used when no transport is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledTriageDispatcher;

impl TriageDispatcher for DisabledTriageDispatcher {
    fn dispatch(&self, _notices: &[TriageNotice]) -> Result<(), DispatchError> {
        Err(DispatchError::NotConfigured)
    }
}

/// Keeps every dispatched notice in process; useful for demos and tests.
#[derive(Debug, Default)]
pub struct TriageOutbox {
    sent: Mutex<Vec<TriageNotice>>,
}

impl TriageOutbox {
    pub fn sent(&self) -> Result<Vec<TriageNotice>, DispatchError> {
        self.sent
            .lock()
            .map(|sent| sent.clone())
            .map_err(|_| DispatchError::Transport("outbox lock poisoned".to_string()))
    }
}

impl TriageDispatcher for TriageOutbox {
    fn dispatch(&self, notices: &[TriageNotice]) -> Result<(), DispatchError> {
        let mut sent = self
            .sent
            .lock()
            .map_err(|_| DispatchError::Transport("outbox lock poisoned".to_string()))?;
        sent.extend_from_slice(notices);
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchStatus {
    Sent,
    Skipped,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TierCounts {
    #[serde(rename = "High")]
    pub high: usize,
    #[serde(rename = "Mid")]
    pub mid: usize,
    #[serde(rename = "Low")]
    pub low: usize,
}

impl TierCounts {
    pub fn from_groups(groups: &[TriageGroup]) -> Self {
        let mut counts = Self::default();
        for group in groups {
            let slot = match group.tier {
                Tier::High => &mut counts.high,
                Tier::Mid => &mut counts.mid,
                Tier::Low => &mut counts.low,
            };
            *slot += group.entries.len();
        }
        counts
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriageDispatchSummary {
    pub status: DispatchStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub tiers: TierCounts,
}
