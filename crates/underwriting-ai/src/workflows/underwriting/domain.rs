use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable numeric identifier of a property within a submission (1-based).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PropertyId(pub u32);

impl PropertyId {
    /// Display letter assigned by position: 1 -> A, 2 -> B, ...
    pub fn letter(self) -> char {
        match self.0 {
            1..=26 => char::from(b'A' + (self.0 - 1) as u8),
            _ => '?',
        }
    }

    pub fn from_letter(letter: char) -> Option<Self> {
        let upper = letter.to_ascii_uppercase();
        if upper.is_ascii_uppercase() {
            Some(Self(u32::from(upper as u8 - b'A') + 1))
        } else {
            None
        }
    }
}

/// Letters for A-Z; the numeric id as `#27` beyond that so errors still name the property.
impl fmt::Display for PropertyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            1..=26 => write!(f, "{}", self.letter()),
            other => write!(f, "#{other}"),
        }
    }
}

/// Coarse construction-risk category carried on the property record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConstructionRisk {
    High,
    Medium,
    Low,
}

impl ConstructionRisk {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "high" => Some(Self::High),
            "medium" | "mid" => Some(Self::Medium),
            "low" => Some(Self::Low),
            _ => None,
        }
    }
}

/// Static submission record reviewed by the underwriter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    pub id: PropertyId,
    pub letter: char,
    pub submission_id: String,
    pub submission_channel: String,
    pub occupancy_type: String,
    pub property_age: u32,
    pub property_value: u64,
    pub property_county: String,
    pub state: String,
    pub cover_type: String,
    pub building_coverage_limit: u64,
    pub contents_coverage_limit: u64,
    pub broker_company: String,
    pub construction_risk: ConstructionRisk,
    pub image_url: String,
    pub roof_image_url: String,
}

/// The underwriter's choice for a single property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionState {
    Prioritized,
    Discarded,
    #[default]
    Unset,
}

impl SelectionState {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Prioritized => "Prioritized",
            Self::Discarded => "Discarded",
            Self::Unset => "Unset",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "p" | "prioritized" | "prioritize" => Some(Self::Prioritized),
            "d" | "discarded" | "discard" => Some(Self::Discarded),
            "u" | "unset" | "-" | "" => Some(Self::Unset),
            _ => None,
        }
    }
}

/// Three-way bucket used for scoring and display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    High,
    Mid,
    Low,
}

impl Tier {
    pub const HIGH_THRESHOLD: f64 = 0.70;
    pub const MID_THRESHOLD: f64 = 0.40;

    pub const fn ordered() -> [Self; 3] {
        [Self::High, Self::Mid, Self::Low]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::High => "High",
            Self::Mid => "Mid",
            Self::Low => "Low",
        }
    }

    pub const fn propensity_label(self) -> &'static str {
        match self {
            Self::High => "High Propensity",
            Self::Mid => "Mid Propensity",
            Self::Low => "Low Propensity",
        }
    }

    /// Bucket a calibrated propensity score.
    pub fn from_score(score: f64) -> Self {
        if score >= Self::HIGH_THRESHOLD {
            Self::High
        } else if score >= Self::MID_THRESHOLD {
            Self::Mid
        } else {
            Self::Low
        }
    }

    /// Accepts `high`, `High Propensity`, `mid`, `medium`, ...
    pub fn parse(raw: &str) -> Option<Self> {
        let lowered = raw.trim().to_ascii_lowercase();
        let head = lowered
            .strip_suffix("propensity")
            .map(str::trim_end)
            .unwrap_or(lowered.as_str());
        match head {
            "high" => Some(Self::High),
            "mid" | "medium" => Some(Self::Mid),
            "low" => Some(Self::Low),
            _ => None,
        }
    }
}

/// Risk label emitted by the earlier scoring backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RiskLabel {
    High,
    Medium,
    Low,
}

impl RiskLabel {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "high" => Some(Self::High),
            "medium" => Some(Self::Medium),
            "low" => Some(Self::Low),
            _ => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::High => "High",
            Self::Medium => "Medium",
            Self::Low => "Low",
        }
    }
}

/// Versioned AI category: current propensity tiers or legacy risk labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum PredictionCategory {
    Propensity(Tier),
    LegacyRisk(RiskLabel),
}

impl PredictionCategory {
    /// Legacy labels line up ordinally with propensity tiers.
    pub const fn tier(self) -> Tier {
        match self {
            Self::Propensity(tier) => tier,
            Self::LegacyRisk(RiskLabel::High) => Tier::High,
            Self::LegacyRisk(RiskLabel::Medium) => Tier::Mid,
            Self::LegacyRisk(RiskLabel::Low) => Tier::Low,
        }
    }

    pub const fn is_legacy(self) -> bool {
        matches!(self, Self::LegacyRisk(_))
    }

    pub const fn display_label(self) -> &'static str {
        match self {
            Self::Propensity(tier) => tier.propensity_label(),
            Self::LegacyRisk(label) => label.label(),
        }
    }
}

/// Business-rule parameter that triggered an exclusion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlaggedParameter {
    pub name: String,
    pub value: String,
    pub description: String,
}

/// Upstream removal of a property from normal scoring.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exclusion {
    pub reason: String,
    pub flagged_parameters: Vec<FlaggedParameter>,
}

/// One local SHAP entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureAttribution {
    pub feature: String,
    pub contribution: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoofDetection {
    pub condition: String,
    pub material: String,
    pub age_estimate: String,
    pub confidence: f64,
    #[serde(default)]
    pub damage_areas: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HazardProximity {
    pub wildfire_zone: String,
    pub hurricane_zone: String,
    pub fault_line: String,
    pub flood_zone: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionFinding {
    pub label: String,
    pub confidence: f64,
    pub risk: RiskLabel,
}

/// Computer-vision and geospatial evidence passed through from the scoring backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VulnerabilityReport {
    pub roof_detection: RoofDetection,
    pub proximity: HazardProximity,
    pub findings: Vec<DetectionFinding>,
    pub model: String,
}

/// Validated AI output for a single property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiPrediction {
    pub property_id: PropertyId,
    pub propensity_score: f64,
    pub category: PredictionCategory,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_risk_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclusion: Option<Exclusion>,
    pub attributions: Vec<FeatureAttribution>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vulnerability: Option<VulnerabilityReport>,
}

impl AiPrediction {
    pub fn is_excluded(&self) -> bool {
        self.exclusion.is_some()
    }

    pub fn tier(&self) -> Tier {
        self.category.tier()
    }

    /// Propensity as a whole percentage for display.
    pub fn propensity_pct(&self) -> u8 {
        (self.propensity_score * 100.0).round().clamp(0.0, 100.0) as u8
    }
}

/// A selection paired with the AI view of the same property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    pub property_id: PropertyId,
    pub selection: SelectionState,
    pub category: PredictionCategory,
    pub excluded: bool,
}

impl Decision {
    pub fn new(selection: SelectionState, prediction: &AiPrediction) -> Self {
        Self {
            property_id: prediction.property_id,
            selection,
            category: prediction.category,
            excluded: prediction.is_excluded(),
        }
    }
}

/// Malformed or incomplete AI output. Names the property and field so upstream data problems
/// surface instead of being coerced to defaults.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("property {property}: missing required field `{field}`")]
    MissingField { property: String, field: &'static str },
    #[error("property {property}: field `{field}` out of range ({value})")]
    OutOfRange {
        property: String,
        field: &'static str,
        value: String,
    },
    #[error("property {property}: unrecognised {field} label '{value}'")]
    UnknownLabel {
        property: String,
        field: &'static str,
        value: String,
    },
}
