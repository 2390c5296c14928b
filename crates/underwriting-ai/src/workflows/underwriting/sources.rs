//! Where prediction records come from.
//!
//! The scoring backend is an external collaborator. A [`PredictionSource`] hands back raw
//! records for a set of properties; validation happens afterwards in [`super::ingest`].

use std::path::PathBuf;

use tracing::{debug, warn};

use super::domain::{
    DetectionFinding, HazardProximity, PropertyId, RiskLabel, RoofDetection, VulnerabilityReport,
};
use super::ingest::{PredictionExport, RawPredictionRecord, RawShapValue};

/// Supplies raw prediction records for the requested properties.
pub trait PredictionSource: Send + Sync {
    fn name(&self) -> &'static str;

    fn predict(
        &self,
        properties: &[PropertyId],
    ) -> Result<Vec<RawPredictionRecord>, PredictionSourceError>;
}

#[derive(Debug, thiserror::Error)]
pub enum PredictionSourceError {
    #[error("prediction source is not configured")]
    NotConfigured,
    #[error("failed to read prediction export {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("prediction export {path} is not valid JSON: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("no prediction available for property {0}")]
    MissingProperty(PropertyId),
}

/// Record shape produced by the static mock data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MockSchema {
    /// `quote_propensity_label` records.
    #[default]
    Propensity,
    /// `ai_risk` records from the earlier backend.
    Legacy,
}

/// Static predictions for the six standard properties.
#[derive(Debug, Clone, Copy, Default)]
pub struct MockPredictionSource {
    schema: MockSchema,
}

impl MockPredictionSource {
    pub fn standard() -> Self {
        Self {
            schema: MockSchema::Propensity,
        }
    }

    pub fn legacy() -> Self {
        Self {
            schema: MockSchema::Legacy,
        }
    }

    pub fn schema(&self) -> MockSchema {
        self.schema
    }

    fn record(&self, property: PropertyId) -> Option<RawPredictionRecord> {
        let index = (property.0 as usize).checked_sub(1)?;
        let shap = MOCK_SHAP.get(index)?;

        let mut record = RawPredictionRecord {
            property_id: Some(property.0),
            shap_values: Some(
                shap.iter()
                    .map(|(feature, contribution)| RawShapValue {
                        feature: Some((*feature).to_string()),
                        contribution: Some(*contribution),
                        value: None,
                    })
                    .collect(),
            ),
            vulnerability_data: Some(vulnerability(index)),
            ..RawPredictionRecord::default()
        };

        match self.schema {
            MockSchema::Propensity => {
                let (score, label) = PROPENSITY_SCORES[index];
                record.quote_propensity = Some(score);
                record.quote_propensity_label = Some(label.to_string());
            }
            MockSchema::Legacy => {
                let (label, propensity, total_risk) = LEGACY_SCORES[index];
                record.ai_risk = Some(label.to_string());
                record.quote_propensity = Some(propensity);
                record.total_risk_score = Some(total_risk);
            }
        }

        Some(record)
    }
}

impl PredictionSource for MockPredictionSource {
    fn name(&self) -> &'static str {
        match self.schema {
            MockSchema::Propensity => "mock",
            MockSchema::Legacy => "mock-legacy",
        }
    }

    fn predict(
        &self,
        properties: &[PropertyId],
    ) -> Result<Vec<RawPredictionRecord>, PredictionSourceError> {
        properties
            .iter()
            .map(|property| {
                self.record(*property)
                    .ok_or(PredictionSourceError::MissingProperty(*property))
            })
            .collect()
    }
}

/// Reads a results export written by the scoring backend.
#[derive(Debug, Clone, Default)]
pub struct JsonFilePredictionSource {
    path: Option<PathBuf>,
}

impl JsonFilePredictionSource {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }

    pub fn path(&self) -> Option<&PathBuf> {
        self.path.as_ref()
    }
}

impl PredictionSource for JsonFilePredictionSource {
    fn name(&self) -> &'static str {
        "json-export"
    }

    fn predict(
        &self,
        properties: &[PropertyId],
    ) -> Result<Vec<RawPredictionRecord>, PredictionSourceError> {
        let path = self
            .path
            .as_ref()
            .ok_or(PredictionSourceError::NotConfigured)?;
        let contents =
            std::fs::read_to_string(path).map_err(|source| PredictionSourceError::Io {
                path: path.clone(),
                source,
            })?;
        let export: PredictionExport =
            serde_json::from_str(&contents).map_err(|source| PredictionSourceError::Parse {
                path: path.clone(),
                source,
            })?;
        let records = export.into_records();

        properties
            .iter()
            .map(|property| {
                records
                    .iter()
                    .find(|record| record.property_id == Some(property.0))
                    .cloned()
                    .ok_or(PredictionSourceError::MissingProperty(*property))
            })
            .collect()
    }
}

/// Tries `primary`, switching to `fallback` when it fails.
#[derive(Debug, Clone)]
pub struct FallbackPredictionSource<P, F> {
    primary: P,
    fallback: F,
}

impl<P, F> FallbackPredictionSource<P, F> {
    pub fn new(primary: P, fallback: F) -> Self {
        Self { primary, fallback }
    }
}

impl<P, F> PredictionSource for FallbackPredictionSource<P, F>
where
    P: PredictionSource,
    F: PredictionSource,
{
    fn name(&self) -> &'static str {
        self.primary.name()
    }

    fn predict(
        &self,
        properties: &[PropertyId],
    ) -> Result<Vec<RawPredictionRecord>, PredictionSourceError> {
        match self.primary.predict(properties) {
            Ok(records) => Ok(records),
            Err(PredictionSourceError::NotConfigured) => {
                debug!(
                    primary = self.primary.name(),
                    fallback = self.fallback.name(),
                    "primary prediction source not configured"
                );
                self.fallback.predict(properties)
            }
            Err(err) => {
                warn!(
                    primary = self.primary.name(),
                    fallback = self.fallback.name(),
                    error = %err,
                    "prediction source failed; using fallback"
                );
                self.fallback.predict(properties)
            }
        }
    }
}

const PROPENSITY_SCORES: [(f64, &str); 6] = [
    (0.8980, "High Propensity"),
    (0.9307, "High Propensity"),
    (0.8465, "High Propensity"),
    (0.4319, "Mid Propensity"),
    (0.4517, "Mid Propensity"),
    (0.0357, "Low Propensity"),
];

const LEGACY_SCORES: [(&str, f64, f64); 6] = [
    ("Medium", 0.68, 0.62),
    ("High", 0.82, 0.81),
    ("Low", 0.35, 0.30),
    ("High", 0.77, 0.78),
    ("Medium", 0.61, 0.55),
    ("Low", 0.28, 0.25),
];

const MOCK_SHAP: [[(&str, f64); 10]; 6] = [
    [
        ("annual_income", 1.050),
        ("building_coverage_limit", 0.853),
        ("cover_type_Building_Only", 0.692),
        ("Property_past_loss_freq", 0.519),
        ("construction_permit_Valid", 0.345),
        ("property_age", 0.276),
        ("total_risk_score", 0.250),
        ("Local_Crime_Rate", -0.247),
        ("roof_material_Wood", 0.217),
        ("Local_Fire_Incident_Rate", -0.203),
    ],
    [
        ("property_age", 1.20),
        ("Local_Fire_Incident_Rate", 0.95),
        ("roof_material_Wood", 0.88),
        ("Property_past_loss_freq", 0.72),
        ("Wildfire_Exposure", 0.65),
        ("building_coverage_limit", -0.41),
        ("construction_permit_Valid", -0.38),
        ("Local_Crime_Rate", 0.35),
        ("annual_income", -0.29),
        ("cover_type_Building_Only", 0.21),
    ],
    [
        ("annual_income", -0.92),
        ("building_coverage_limit", -0.78),
        ("property_age", -0.64),
        ("construction_permit_Valid", 0.42),
        ("Local_Crime_Rate", -0.38),
        ("cover_type_Building_Only", -0.31),
        ("Local_Fire_Incident_Rate", 0.28),
        ("Property_past_loss_freq", -0.22),
        ("roof_material_Wood", 0.18),
        ("total_risk_score", -0.15),
    ],
    [
        ("property_age", 1.45),
        ("Wildfire_Exposure", 1.12),
        ("Local_Fire_Incident_Rate", 0.98),
        ("roof_material_Wood", 0.82),
        ("Property_past_loss_freq", 0.74),
        ("Local_Crime_Rate", 0.58),
        ("total_risk_score", 0.51),
        ("building_coverage_limit", -0.39),
        ("annual_income", -0.28),
        ("construction_permit_Valid", -0.21),
    ],
    [
        ("annual_income", 0.88),
        ("cover_type_Building_Only", 0.72),
        ("building_coverage_limit", 0.64),
        ("property_age", -0.55),
        ("Property_past_loss_freq", 0.48),
        ("Local_Crime_Rate", -0.41),
        ("construction_permit_Valid", 0.35),
        ("roof_material_Wood", 0.29),
        ("Wildfire_Exposure", -0.22),
        ("total_risk_score", 0.18),
    ],
    [
        ("annual_income", -0.75),
        ("property_age", -0.62),
        ("building_coverage_limit", -0.54),
        ("construction_permit_Valid", -0.45),
        ("Local_Crime_Rate", 0.38),
        ("Property_past_loss_freq", -0.32),
        ("roof_material_Wood", 0.28),
        ("cover_type_Building_Only", -0.24),
        ("Local_Fire_Incident_Rate", 0.20),
        ("total_risk_score", -0.16),
    ],
];

const DETECTION_MODEL: &str = "YOLOv8-property-v2";

struct MockVulnerability {
    condition: &'static str,
    damage_areas: &'static [&'static str],
    material: &'static str,
    age_estimate: &'static str,
    confidence: f64,
    proximity: [&'static str; 4],
    findings: &'static [(&'static str, f64, RiskLabel)],
}

const MOCK_VULNERABILITY: [MockVulnerability; 6] = [
    MockVulnerability {
        condition: "Fair",
        damage_areas: &["NW corner wear", "Flashing separation at chimney"],
        material: "Asphalt Shingle",
        age_estimate: "16-20 years",
        confidence: 0.87,
        proximity: [
            "Moderate (2.8 mi to WUI boundary)",
            "Category 1 exposure",
            "4.2 mi to nearest active fault",
            "Zone X (minimal risk)",
        ],
        findings: &[
            ("Roof surface wear", 0.91, RiskLabel::Medium),
            ("Overhanging tree", 0.84, RiskLabel::Low),
            ("HVAC unit proximity", 0.78, RiskLabel::Low),
        ],
    },
    MockVulnerability {
        condition: "Poor",
        damage_areas: &[
            "Missing shingles (east section)",
            "Visible granule loss",
            "Moss growth",
        ],
        material: "Wood Shake",
        age_estimate: "22-28 years",
        confidence: 0.92,
        proximity: [
            "High (0.9 mi to WUI boundary)",
            "Category 2-3 exposure",
            "1.8 mi to active fault",
            "Zone AE (high risk)",
        ],
        findings: &[
            ("Missing shingles", 0.95, RiskLabel::High),
            ("Dense vegetation", 0.89, RiskLabel::High),
            ("Cracked chimney cap", 0.83, RiskLabel::Medium),
            ("Blocked gutters", 0.77, RiskLabel::Medium),
        ],
    },
    MockVulnerability {
        condition: "Excellent",
        damage_areas: &[],
        material: "Metal Standing Seam",
        age_estimate: "3-6 years",
        confidence: 0.96,
        proximity: [
            "Low (6.1 mi to WUI boundary)",
            "Category 1 exposure (coastal setback met)",
            "12.4 mi to nearest fault",
            "Zone X (minimal risk)",
        ],
        findings: &[
            ("Solar panel installation", 0.93, RiskLabel::Low),
            ("New guttering system", 0.88, RiskLabel::Low),
        ],
    },
    MockVulnerability {
        condition: "Critical",
        damage_areas: &[
            "Sagging ridge line",
            "Multiple missing tiles",
            "Water staining visible",
            "Structural deformation",
        ],
        material: "Clay Tile",
        age_estimate: "32-40 years",
        confidence: 0.94,
        proximity: [
            "Very High (0.3 mi to WUI boundary)",
            "Category 3-4 exposure",
            "0.9 mi to active fault",
            "Zone A (high risk, no BFE)",
        ],
        findings: &[
            ("Severe roof damage", 0.97, RiskLabel::High),
            ("Foundation cracks", 0.88, RiskLabel::High),
            ("Dead trees (3)", 0.92, RiskLabel::High),
            ("Debris accumulation", 0.85, RiskLabel::Medium),
            ("Deck structural wear", 0.79, RiskLabel::Medium),
        ],
    },
    MockVulnerability {
        condition: "Good",
        damage_areas: &["Minor granule loss (south slope)"],
        material: "Asphalt Shingle",
        age_estimate: "10-14 years",
        confidence: 0.89,
        proximity: [
            "Low-Moderate (3.5 mi to WUI boundary)",
            "Category 1 exposure",
            "7.2 mi to nearest fault",
            "Zone X (minimal risk)",
        ],
        findings: &[
            ("Minor shingle wear", 0.86, RiskLabel::Low),
            ("Pool proximity", 0.91, RiskLabel::Low),
            ("Driveway in good repair", 0.82, RiskLabel::Low),
        ],
    },
    MockVulnerability {
        condition: "Good",
        damage_areas: &[],
        material: "Composite Shingle",
        age_estimate: "6-9 years",
        confidence: 0.91,
        proximity: [
            "Low (5.2 mi to WUI boundary)",
            "Category 1 exposure",
            "9.8 mi to nearest fault",
            "Zone X (minimal risk)",
        ],
        findings: &[
            ("Clean roof surface", 0.94, RiskLabel::Low),
            ("Well-maintained yard", 0.87, RiskLabel::Low),
        ],
    },
];

fn vulnerability(index: usize) -> VulnerabilityReport {
    let mock = &MOCK_VULNERABILITY[index];
    let [wildfire_zone, hurricane_zone, fault_line, flood_zone] = mock.proximity;
    VulnerabilityReport {
        roof_detection: RoofDetection {
            condition: mock.condition.to_string(),
            material: mock.material.to_string(),
            age_estimate: mock.age_estimate.to_string(),
            confidence: mock.confidence,
            damage_areas: mock.damage_areas.iter().map(|s| s.to_string()).collect(),
        },
        proximity: HazardProximity {
            wildfire_zone: wildfire_zone.to_string(),
            hurricane_zone: hurricane_zone.to_string(),
            fault_line: fault_line.to_string(),
            flood_zone: flood_zone.to_string(),
        },
        findings: mock
            .findings
            .iter()
            .map(|(label, confidence, risk)| DetectionFinding {
                label: label.to_string(),
                confidence: *confidence,
                risk: *risk,
            })
            .collect(),
        model: DETECTION_MODEL.to_string(),
    }
}
