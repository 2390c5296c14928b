use std::cmp::Ordering;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::super::domain::{FeatureAttribution, ValidationError};

/// Global driver averaged across properties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedDriver {
    pub feature: String,
    pub mean_magnitude: f64,
    pub bar_width_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RankedDriverList {
    pub property_count: usize,
    pub drivers: Vec<RankedDriver>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriverDirection {
    Increases,
    Decreases,
}

/// Local SHAP entry prepared for a single property's bar chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalDriver {
    pub feature: String,
    pub contribution: f64,
    pub magnitude: f64,
    pub direction: DriverDirection,
    pub bar_width_pct: f64,
}

/// `roof_material_Wood` -> `roof material Wood`.
pub fn normalize_feature_name(raw: &str) -> String {
    raw.trim().replace(['_', '-'], " ")
}

/// Rank features by mean absolute contribution across all supplied properties.
///
/// Features are grouped by their normalized display name. Ties keep first-seen order.
pub fn aggregate_shap_drivers<'a, I>(
    per_property: I,
    top_n: usize,
    magnitude_floor: f64,
) -> Result<RankedDriverList, ValidationError>
where
    I: IntoIterator<Item = (String, &'a [FeatureAttribution])>,
{
    let mut order: Vec<String> = Vec::new();
    let mut totals: HashMap<String, f64> = HashMap::new();
    let mut property_count = 0usize;

    for (property, attributions) in per_property {
        property_count += 1;
        for attribution in attributions {
            ensure_finite(&property, attribution)?;
            let name = normalize_feature_name(&attribution.feature);
            let entry = totals.entry(name.clone()).or_insert_with(|| {
                order.push(name);
                0.0
            });
            *entry += attribution.contribution.abs();
        }
    }

    if property_count == 0 {
        return Ok(RankedDriverList::default());
    }

    let mut ranked: Vec<(String, f64)> = order
        .into_iter()
        .map(|name| {
            let total = totals.get(&name).copied().unwrap_or_default();
            (name, total / property_count as f64)
        })
        .collect();
    ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
    ranked.truncate(top_n);

    let max_mean = ranked.first().map(|(_, mean)| *mean).unwrap_or_default();
    let denominator = max_mean.max(magnitude_floor);

    let drivers = ranked
        .into_iter()
        .map(|(feature, mean_magnitude)| RankedDriver {
            feature,
            mean_magnitude,
            bar_width_pct: (mean_magnitude / denominator * 100.0).min(100.0),
        })
        .collect();

    Ok(RankedDriverList {
        property_count,
        drivers,
    })
}

/// Sort one property's attributions by signed contribution, largest first.
pub fn local_drivers(
    property: &str,
    attributions: &[FeatureAttribution],
    magnitude_floor: f64,
) -> Result<Vec<LocalDriver>, ValidationError> {
    for attribution in attributions {
        ensure_finite(property, attribution)?;
    }

    let max_magnitude = attributions
        .iter()
        .map(|attribution| attribution.contribution.abs())
        .fold(0.0_f64, f64::max)
        .max(magnitude_floor);

    let mut drivers: Vec<LocalDriver> = attributions
        .iter()
        .map(|attribution| {
            let magnitude = attribution.contribution.abs();
            LocalDriver {
                feature: normalize_feature_name(&attribution.feature),
                contribution: attribution.contribution,
                magnitude,
                direction: if attribution.contribution < 0.0 {
                    DriverDirection::Decreases
                } else {
                    DriverDirection::Increases
                },
                bar_width_pct: magnitude / max_magnitude * 100.0,
            }
        })
        .collect();
    drivers.sort_by(|a, b| {
        b.contribution
            .partial_cmp(&a.contribution)
            .unwrap_or(Ordering::Equal)
    });
    Ok(drivers)
}

fn ensure_finite(property: &str, attribution: &FeatureAttribution) -> Result<(), ValidationError> {
    if attribution.contribution.is_finite() {
        Ok(())
    } else {
        Err(ValidationError::OutOfRange {
            property: property.to_string(),
            field: "shap_values.contribution",
            value: attribution.contribution.to_string(),
        })
    }
}
