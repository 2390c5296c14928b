use serde::{Deserialize, Serialize};

/// Whether discarding a high-category property counts as disagreeing with the AI.
///
/// The comparison screens disagreed here: the risk-label revision flagged it, the
/// propensity-label revision did not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscardHighRule {
    Always,
    Never,
    /// Flag only when the category arrived as a legacy risk label.
    #[default]
    LegacyOnly,
}

impl DiscardHighRule {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "always" => Some(Self::Always),
            "never" => Some(Self::Never),
            "legacy_only" | "legacy" => Some(Self::LegacyOnly),
            _ => None,
        }
    }
}

/// Scoring parameters. The denominator is configuration, never inferred from the input.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationConfig {
    pub expected_property_count: usize,
    pub top_driver_count: usize,
    pub magnitude_floor: f64,
    pub discard_high_rule: DiscardHighRule,
}

impl Default for ReconciliationConfig {
    fn default() -> Self {
        Self {
            expected_property_count: 6,
            top_driver_count: 8,
            magnitude_floor: 0.001,
            discard_high_rule: DiscardHighRule::LegacyOnly,
        }
    }
}
