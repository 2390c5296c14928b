use super::common::*;
use crate::workflows::underwriting::domain::{Decision, PropertyId, RiskLabel, SelectionState, Tier};
use crate::workflows::underwriting::reconciliation::{
    compute_score, decision_points, DiscardHighRule, HalfPoints, ReconciliationConfig,
    ReconciliationEngine, ReconciliationError, RowStatus, ScoringError, UserSelection,
};

use SelectionState::{Discarded as D, Prioritized as P, Unset as U};

#[test]
fn mixed_round_scores_fifty_eight_percent() {
    let decisions = decisions(
        &[P, D, U, D, P, D],
        &[Tier::High, Tier::Low, Tier::Mid, Tier::High, Tier::Mid, Tier::Low],
    );

    let points: Vec<f64> = decisions
        .iter()
        .map(|decision| decision_points(decision).as_points())
        .collect();
    assert_eq!(points, vec![1.0, 1.0, 0.0, 0.0, 0.5, 1.0]);

    let score = compute_score(&decisions, 6).expect("score computes");
    assert_eq!(score.percentage, 58);
    assert_eq!(score.earned_points, 3.5);
    assert_eq!(score.max_points, 6.0);
    assert!(!score.is_partial());
}

#[test]
fn perfect_alignment_scores_one_hundred() {
    let all_discard_low = decisions(&[D; 6], &[Tier::Low; 6]);
    let all_prioritize_high = decisions(&[P; 6], &[Tier::High; 6]);

    assert_eq!(compute_score(&all_discard_low, 6).unwrap().percentage, 100);
    assert_eq!(compute_score(&all_prioritize_high, 6).unwrap().percentage, 100);
}

#[test]
fn unset_or_inverted_choices_score_zero() {
    let all_unset = decisions(
        &[U; 6],
        &[Tier::High, Tier::Mid, Tier::Low, Tier::High, Tier::Mid, Tier::Low],
    );
    let prioritize_low = decisions(&[P; 6], &[Tier::Low; 6]);

    assert_eq!(compute_score(&all_unset, 6).unwrap().percentage, 0);
    assert_eq!(compute_score(&prioritize_low, 6).unwrap().percentage, 0);
}

#[test]
fn score_ignores_decision_order() {
    let forward = decisions(
        &[P, D, U, D, P, D],
        &[Tier::High, Tier::Low, Tier::Mid, Tier::High, Tier::Mid, Tier::Low],
    );
    let mut reversed = forward.clone();
    reversed.reverse();
    let mut rotated = forward.clone();
    rotated.rotate_left(2);

    let expected = compute_score(&forward, 6).unwrap();
    assert_eq!(compute_score(&reversed, 6).unwrap(), expected);
    assert_eq!(compute_score(&rotated, 6).unwrap(), expected);
}

#[test]
fn mid_tier_earns_half_for_any_decision() {
    let decision = Decision::new(P, &prediction(1, Tier::Mid));
    assert_eq!(decision_points(&decision), HalfPoints::HALF);
    let decision = Decision::new(D, &prediction(1, Tier::Mid));
    assert_eq!(decision_points(&decision), HalfPoints::HALF);
    let decision = Decision::new(U, &prediction(1, Tier::Mid));
    assert_eq!(decision_points(&decision), HalfPoints::ZERO);
}

#[test]
fn exclusion_rewards_only_discards() {
    let discarded = Decision::new(D, &excluded_prediction(1, Tier::High));
    let prioritized = Decision::new(P, &excluded_prediction(2, Tier::High));
    let unset = Decision::new(U, &excluded_prediction(3, Tier::Low));

    assert_eq!(decision_points(&discarded), HalfPoints::FULL);
    assert_eq!(decision_points(&prioritized), HalfPoints::ZERO);
    assert_eq!(decision_points(&unset), HalfPoints::ZERO);
}

#[test]
fn legacy_labels_score_like_their_tiers() {
    let high = Decision::new(P, &legacy_prediction(1, RiskLabel::High));
    let medium = Decision::new(D, &legacy_prediction(2, RiskLabel::Medium));
    let low = Decision::new(D, &legacy_prediction(3, RiskLabel::Low));

    assert_eq!(decision_points(&high), HalfPoints::FULL);
    assert_eq!(decision_points(&medium), HalfPoints::HALF);
    assert_eq!(decision_points(&low), HalfPoints::FULL);
}

#[test]
fn partial_results_keep_configured_denominator() {
    let decisions = decisions(&[P, P, P], &[Tier::High; 3]);
    let score = compute_score(&decisions, 6).expect("score computes");
    assert_eq!(score.percentage, 50);
    assert_eq!(score.scored_count, 3);
    assert!(score.is_partial());
}

#[test]
fn rejects_invalid_decision_sets() {
    let seven = decisions(&[P; 7], &[Tier::High; 7]);
    assert_eq!(
        compute_score(&seven, 6),
        Err(ScoringError::TooManyDecisions {
            supplied: 7,
            expected: 6
        })
    );

    let mut duplicated = decisions(&[P, D], &[Tier::High, Tier::Low]);
    duplicated[1].property_id = PropertyId(1);
    assert_eq!(
        compute_score(&duplicated, 6),
        Err(ScoringError::DuplicateProperty(PropertyId(1)))
    );

    assert_eq!(compute_score(&[], 0), Err(ScoringError::ZeroExpectedCount));
}

#[test]
fn reconcile_classifies_each_row() {
    let engine = ReconciliationEngine::default();
    let predictions = vec![
        prediction(1, Tier::High),
        prediction(2, Tier::Low),
        prediction(3, Tier::Mid),
        prediction(4, Tier::High),
        excluded_prediction(5, Tier::Low),
        prediction(6, Tier::Low),
    ];
    let selections: UserSelection = [
        (PropertyId(1), P),
        (PropertyId(2), P),
        (PropertyId(4), D),
        (PropertyId(5), P),
        (PropertyId(6), D),
    ]
    .into_iter()
    .collect();

    let result = engine
        .reconcile(&selections, &predictions)
        .expect("reconciliation succeeds");

    let statuses: Vec<RowStatus> = result.rows.iter().map(|row| row.status).collect();
    assert_eq!(
        statuses,
        vec![
            RowStatus::Match,
            RowStatus::Mismatch,
            RowStatus::Undecided,
            RowStatus::Match,
            RowStatus::Excluded,
            RowStatus::Match,
        ]
    );
    assert_eq!(result.mismatch_count(), 1);
    assert_eq!(result.rows[1].letter, 'B');
    assert_eq!(result.rows[1].ai_label.as_deref(), Some("Low Propensity"));
    assert_eq!(
        result.rows[4].exclusion_reason.as_deref(),
        Some("Property in flood zone AE without elevation certificate")
    );
    assert_eq!(result.rows[4].points, Some(0.0));
    // 1 + 0 + 0 + 0 + 0 + 1 = 2 of 6
    assert_eq!(result.score.percentage, 33);
}

#[test]
fn discard_high_rule_changes_flags_but_not_score() {
    let predictions = vec![
        prediction(1, Tier::High),
        legacy_prediction(2, RiskLabel::High),
    ];
    let selections: UserSelection = [(PropertyId(1), D), (PropertyId(2), D)]
        .into_iter()
        .collect();

    let flags = |rule: DiscardHighRule| {
        let engine = ReconciliationEngine::new(ReconciliationConfig {
            discard_high_rule: rule,
            ..ReconciliationConfig::default()
        });
        let result = engine
            .reconcile(&selections, &predictions)
            .expect("reconciliation succeeds");
        (
            result.rows.iter().map(|row| row.mismatch).collect::<Vec<_>>(),
            result.score.percentage,
        )
    };

    assert_eq!(flags(DiscardHighRule::LegacyOnly), (vec![false, true], 0));
    assert_eq!(flags(DiscardHighRule::Always), (vec![true, true], 0));
    assert_eq!(flags(DiscardHighRule::Never), (vec![false, false], 0));
}

#[test]
fn reconcile_reports_selections_without_predictions() {
    let engine = ReconciliationEngine::default();
    let predictions = vec![prediction(1, Tier::High)];
    let selections: UserSelection = [(PropertyId(1), P), (PropertyId(3), D)]
        .into_iter()
        .collect();

    let result = engine
        .reconcile(&selections, &predictions)
        .expect("reconciliation succeeds");

    assert_eq!(result.rows.len(), 2);
    assert_eq!(result.rows[1].status, RowStatus::Undecided);
    assert_eq!(result.rows[1].points, None);
    assert_eq!(result.score.scored_count, 1);
    assert_eq!(result.score.percentage, 17);
}

#[test]
fn reconcile_rejects_duplicate_predictions() {
    let engine = ReconciliationEngine::default();
    let predictions = vec![prediction(2, Tier::High), prediction(2, Tier::Low)];

    match engine.reconcile(&UserSelection::new(), &predictions) {
        Err(ReconciliationError::Scoring(ScoringError::DuplicateProperty(id))) => {
            assert_eq!(id, PropertyId(2));
        }
        other => panic!("expected duplicate property error, got {other:?}"),
    }
}
