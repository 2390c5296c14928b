use super::common::*;
use crate::workflows::underwriting::domain::{FeatureAttribution, Tier, ValidationError};
use crate::workflows::underwriting::reconciliation::{
    aggregate_shap_drivers, local_drivers, normalize_feature_name, DriverDirection,
    ReconciliationEngine,
};

fn property_set(count: usize, features: usize) -> Vec<(String, Vec<FeatureAttribution>)> {
    (0..count)
        .map(|property| {
            let attributions = (0..features)
                .map(|feature| {
                    let sign = if feature % 2 == 0 { 1.0 } else { -1.0 };
                    attribution(
                        &format!("feature_{feature}"),
                        sign * (features - feature) as f64 * 0.1 + property as f64 * 0.01,
                    )
                })
                .collect();
            (format!("property {property}"), attributions)
        })
        .collect()
}

#[test]
fn driver_list_is_capped_and_sorted_descending() {
    let properties = property_set(6, 12);
    let ranked = aggregate_shap_drivers(
        properties
            .iter()
            .map(|(name, attributions)| (name.clone(), attributions.as_slice())),
        8,
        0.001,
    )
    .expect("drivers rank");

    assert_eq!(ranked.property_count, 6);
    assert_eq!(ranked.drivers.len(), 8);
    assert!(ranked
        .drivers
        .windows(2)
        .all(|pair| pair[0].mean_magnitude >= pair[1].mean_magnitude));
    assert_eq!(ranked.drivers[0].bar_width_pct, 100.0);
}

#[test]
fn single_property_mean_equals_absolute_contribution() {
    let attributions = vec![
        attribution("Local_Crime_Rate", -0.247),
        attribution("annual_income", 1.05),
    ];
    let ranked = aggregate_shap_drivers(
        [("A".to_string(), attributions.as_slice())],
        8,
        0.001,
    )
    .expect("drivers rank");

    assert_eq!(ranked.drivers[0].feature, "annual income");
    assert_eq!(ranked.drivers[0].mean_magnitude, 1.05);
    assert_eq!(ranked.drivers[1].feature, "Local Crime Rate");
    assert_eq!(ranked.drivers[1].mean_magnitude, 0.247);
}

#[test]
fn features_merge_on_normalized_name_and_average_over_all_properties() {
    let first = vec![attribution("roof_material_Wood", 0.6)];
    let second = vec![attribution("roof-material-Wood", -0.2)];
    let third = vec![attribution("property_age", 0.1)];
    let ranked = aggregate_shap_drivers(
        [
            ("A".to_string(), first.as_slice()),
            ("B".to_string(), second.as_slice()),
            ("C".to_string(), third.as_slice()),
        ],
        8,
        0.001,
    )
    .expect("drivers rank");

    assert_eq!(ranked.drivers.len(), 2);
    assert_eq!(ranked.drivers[0].feature, "roof material Wood");
    assert!((ranked.drivers[0].mean_magnitude - 0.8 / 3.0).abs() < 1e-12);
    assert!((ranked.drivers[1].mean_magnitude - 0.1 / 3.0).abs() < 1e-12);
}

#[test]
fn ties_keep_first_seen_order() {
    let attributions = vec![
        attribution("zeta", 0.3),
        attribution("alpha", -0.3),
        attribution("mid", 0.3),
    ];
    let ranked = aggregate_shap_drivers([("A".to_string(), attributions.as_slice())], 8, 0.001)
        .expect("drivers rank");
    let names: Vec<&str> = ranked.drivers.iter().map(|d| d.feature.as_str()).collect();
    assert_eq!(names, vec!["zeta", "alpha", "mid"]);
}

#[test]
fn tiny_magnitudes_use_the_floor_for_bar_widths() {
    let attributions = vec![attribution("noise", 0.0005)];
    let ranked = aggregate_shap_drivers([("A".to_string(), attributions.as_slice())], 8, 0.001)
        .expect("drivers rank");
    assert!((ranked.drivers[0].bar_width_pct - 50.0).abs() < 1e-9);
}

#[test]
fn empty_input_produces_empty_list() {
    let ranked = aggregate_shap_drivers(
        std::iter::empty::<(String, &[FeatureAttribution])>(),
        8,
        0.001,
    )
    .expect("drivers rank");
    assert_eq!(ranked.property_count, 0);
    assert!(ranked.drivers.is_empty());
}

#[test]
fn non_finite_contributions_are_rejected() {
    let attributions = vec![attribution("property_age", f64::NAN)];
    match aggregate_shap_drivers([("D".to_string(), attributions.as_slice())], 8, 0.001) {
        Err(ValidationError::OutOfRange { property, field, .. }) => {
            assert_eq!(property, "D");
            assert_eq!(field, "shap_values.contribution");
        }
        other => panic!("expected out of range error, got {other:?}"),
    }
}

#[test]
fn engine_ranks_drivers_across_predictions() {
    let engine = ReconciliationEngine::default();
    let ranked = engine
        .aggregate_drivers(&[prediction(1, Tier::High), prediction(2, Tier::Low)])
        .expect("drivers rank");
    assert_eq!(ranked.property_count, 2);
    assert_eq!(ranked.drivers[0].feature, "property age");
    assert_eq!(ranked.drivers[0].mean_magnitude, 0.4);
}

#[test]
fn local_drivers_sort_by_signed_contribution() {
    let attributions = vec![
        attribution("Local_Crime_Rate", -0.5),
        attribution("annual_income", 1.0),
        attribution("property_age", 0.25),
    ];
    let drivers = local_drivers("A", &attributions, 0.001).expect("local drivers");

    let names: Vec<&str> = drivers.iter().map(|d| d.feature.as_str()).collect();
    assert_eq!(names, vec!["annual income", "property age", "Local Crime Rate"]);
    assert_eq!(drivers[0].bar_width_pct, 100.0);
    assert_eq!(drivers[2].direction, DriverDirection::Decreases);
    assert_eq!(drivers[2].bar_width_pct, 50.0);
}

#[test]
fn normalizes_separators() {
    assert_eq!(
        normalize_feature_name(" cover_type_Building-Only "),
        "cover type Building Only"
    );
}
