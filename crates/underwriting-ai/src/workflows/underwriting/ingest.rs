//! Boundary adapter for AI prediction records.
//!
//! The scoring backend has shipped two shapes: the earlier one carries an `ai_risk` label,
//! the current one a `quote_propensity_label`. Both are accepted here and converted into a
//! single [`AiPrediction`]; nothing downstream needs to know which revision produced a record.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::domain::{
    AiPrediction, Exclusion, FeatureAttribution, FlaggedParameter, PredictionCategory,
    PropertyId, RiskLabel, Tier, ValidationError, VulnerabilityReport,
};

/// Prediction record as delivered by the scoring backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawPredictionRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property_id: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quote_propensity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quote_propensity_label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_risk: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_risk_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub excluded: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclusion_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub flagged_parameters: Vec<RawFlaggedParameter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shap_values: Option<Vec<RawShapValue>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vulnerability_data: Option<VulnerabilityReport>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawShapValue {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contribution: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawFlaggedParameter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub value: serde_json::Value,
    #[serde(default)]
    pub description: String,
}

/// A results export: either a bare array or the `{ "results": [...] }` envelope.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum PredictionExport {
    Envelope { results: Vec<RawPredictionRecord> },
    Records(Vec<RawPredictionRecord>),
}

impl PredictionExport {
    pub fn into_records(self) -> Vec<RawPredictionRecord> {
        match self {
            Self::Envelope { results } => results,
            Self::Records(records) => records,
        }
    }
}

pub fn adapt_records(
    records: Vec<RawPredictionRecord>,
) -> Result<Vec<AiPrediction>, ValidationError> {
    records
        .into_iter()
        .enumerate()
        .map(|(position, record)| adapt_record(record, position))
        .collect()
}

/// Validate one record. `position` names the record when it lacks a property id.
pub fn adapt_record(
    record: RawPredictionRecord,
    position: usize,
) -> Result<AiPrediction, ValidationError> {
    let property_id = match record.property_id {
        Some(0) => {
            return Err(ValidationError::OutOfRange {
                property: format!("record #{}", position + 1),
                field: "property_id",
                value: "0".to_string(),
            })
        }
        Some(id) => PropertyId(id),
        None => {
            return Err(ValidationError::MissingField {
                property: format!("record #{}", position + 1),
                field: "property_id",
            })
        }
    };
    let property = property_id.to_string();

    let propensity_score = unit_interval(&property, "quote_propensity", record.quote_propensity)?
        .ok_or_else(|| missing(&property, "quote_propensity"))?;

    let category = match (&record.quote_propensity_label, &record.ai_risk) {
        (Some(label), _) => Tier::parse(label)
            .map(PredictionCategory::Propensity)
            .ok_or_else(|| unknown(&property, "quote_propensity_label", label))?,
        (None, Some(label)) => RiskLabel::parse(label)
            .map(PredictionCategory::LegacyRisk)
            .ok_or_else(|| unknown(&property, "ai_risk", label))?,
        (None, None) => {
            let tier = Tier::from_score(propensity_score);
            debug!(
                property = %property,
                score = propensity_score,
                tier = tier.label(),
                "no category label supplied; bucketed from quote_propensity"
            );
            PredictionCategory::Propensity(tier)
        }
    };

    let total_risk_score = unit_interval(&property, "total_risk_score", record.total_risk_score)?;

    let exclusion = if record.excluded.unwrap_or(false) {
        let reason = record
            .exclusion_reason
            .filter(|reason| !reason.trim().is_empty())
            .ok_or_else(|| missing(&property, "exclusion_reason"))?;
        let flagged_parameters = record
            .flagged_parameters
            .into_iter()
            .map(|parameter| adapt_flagged(&property, parameter))
            .collect::<Result<Vec<_>, _>>()?;
        Some(Exclusion {
            reason,
            flagged_parameters,
        })
    } else {
        None
    };

    let attributions = record
        .shap_values
        .ok_or_else(|| missing(&property, "shap_values"))?
        .into_iter()
        .map(|value| adapt_shap(&property, value))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(AiPrediction {
        property_id,
        propensity_score,
        category,
        total_risk_score,
        exclusion,
        attributions,
        vulnerability: record.vulnerability_data,
    })
}

fn adapt_shap(property: &str, raw: RawShapValue) -> Result<FeatureAttribution, ValidationError> {
    let feature = raw
        .feature
        .filter(|feature| !feature.trim().is_empty())
        .ok_or_else(|| missing(property, "shap_values.feature"))?;
    let contribution = raw
        .contribution
        .ok_or_else(|| missing(property, "shap_values.contribution"))?;
    if !contribution.is_finite() {
        return Err(ValidationError::OutOfRange {
            property: property.to_string(),
            field: "shap_values.contribution",
            value: contribution.to_string(),
        });
    }
    Ok(FeatureAttribution {
        feature,
        contribution,
        value: raw.value,
    })
}

fn adapt_flagged(
    property: &str,
    raw: RawFlaggedParameter,
) -> Result<FlaggedParameter, ValidationError> {
    let name = raw
        .name
        .filter(|name| !name.trim().is_empty())
        .ok_or_else(|| missing(property, "flagged_parameters.name"))?;
    let value = match raw.value {
        serde_json::Value::String(text) => text,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    };
    Ok(FlaggedParameter {
        name,
        value,
        description: raw.description,
    })
}

fn unit_interval(
    property: &str,
    field: &'static str,
    value: Option<f64>,
) -> Result<Option<f64>, ValidationError> {
    match value {
        Some(score) if !(0.0..=1.0).contains(&score) => Err(ValidationError::OutOfRange {
            property: property.to_string(),
            field,
            value: score.to_string(),
        }),
        other => Ok(other),
    }
}

fn missing(property: &str, field: &'static str) -> ValidationError {
    ValidationError::MissingField {
        property: property.to_string(),
        field,
    }
}

fn unknown(property: &str, field: &'static str, value: &str) -> ValidationError {
    ValidationError::UnknownLabel {
        property: property.to_string(),
        field,
        value: value.to_string(),
    }
}
