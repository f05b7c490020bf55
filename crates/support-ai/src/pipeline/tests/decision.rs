use super::common::*;
use crate::pipeline::decision::{Classification, DecisionEngine, ReasonKind};
use crate::pipeline::features::{FeatureKind, FeatureVector};

fn engine() -> DecisionEngine {
    DecisionEngine::new(config())
}

fn feature_vector(monthly_income: f64, validation_score: f64) -> FeatureVector {
    FeatureVector::from_parts(vec![
        (FeatureKind::MonthlyIncome, monthly_income),
        (FeatureKind::IncomeStability, 0.6),
        (FeatureKind::EmploymentStability, 0.7),
        (FeatureKind::DebtToIncome, 0.4),
        (FeatureKind::FamilyBurden, 0.5),
        (FeatureKind::DocumentQuality, validation_score / 100.0),
    ])
}

#[test]
fn strong_profile_is_approved() {
    let decision = engine().decide(&feature_vector(95_000.0, 92.5), Some(0.89));

    assert_eq!(decision.classification, Classification::Approved);
    assert!(!decision.degraded);
    assert!(decision.rules_fired.is_empty());
    // 0.7 * 0.89 + 0.3 * 0.925
    assert!((decision.blended_score - 0.9005).abs() < 1e-9);
    assert!((decision.confidence - (0.9005 - 0.70) / 0.30).abs() < 1e-9);
}

#[test]
fn middling_profile_soft_declines() {
    let decision = engine().decide(&feature_vector(55_000.0, 65.0), Some(0.55));

    assert_eq!(decision.classification, Classification::SoftDecline);
    assert!(!decision.degraded);
    assert!((decision.blended_score - 0.58).abs() < 1e-9);
}

#[test]
fn low_income_fires_hard_rule() {
    let decision = engine().decide(&feature_vector(25_000.0, 35.0), Some(0.20));

    assert_eq!(decision.classification, Classification::HardDecline);
    assert!(decision
        .rules_fired
        .iter()
        .any(|firing| firing.rule_id == "income-below-minimum"));
    assert!(!decision
        .rules_fired
        .iter()
        .any(|firing| firing.rule_id == "documentation-below-minimum"));
}

#[test]
fn thin_documentation_fires_hard_rule_despite_model() {
    let decision = engine().decide(&feature_vector(50_000.0, 20.0), Some(0.90));

    assert_eq!(decision.classification, Classification::HardDecline);
    assert!(decision
        .rules_fired
        .iter()
        .any(|firing| firing.rule_id == "documentation-below-minimum"));
}

#[test]
fn nan_model_score_degrades_to_rules_only() {
    let decision = engine().decide(&feature_vector(95_000.0, 80.0), Some(f64::NAN));

    assert!(decision.degraded);
    assert_eq!(decision.model_score, None);
    // blended collapses to validation_score / 100
    assert!((decision.blended_score - 0.80).abs() < 1e-9);
    assert_eq!(decision.classification, Classification::Approved);
}

#[test]
fn out_of_range_model_score_degrades() {
    let decision = engine().decide(&feature_vector(95_000.0, 60.0), Some(1.5));

    assert!(decision.degraded);
    assert_eq!(decision.classification, Classification::SoftDecline);
}

#[test]
fn absent_model_score_degrades() {
    let decision = engine().decide(&feature_vector(95_000.0, 92.5), None);

    assert!(decision.degraded);
    assert_eq!(decision.classification, Classification::Approved);
}

#[test]
fn decide_is_deterministic_including_trace_order() {
    let features = feature_vector(55_000.0, 65.0);
    let engine = engine();

    let first = engine.decide(&features, Some(0.55));
    let second = engine.decide(&features, Some(0.55));

    assert_eq!(first, second);
}

#[test]
fn reason_trace_is_ranked_and_sums_to_blended_score() {
    let decision = engine().decide(&feature_vector(55_000.0, 65.0), Some(0.55));

    for window in decision.reason_trace.windows(2) {
        assert!(window[0].contribution >= window[1].contribution);
    }

    let feature_sum: f64 = decision
        .reason_trace
        .iter()
        .filter(|entry| matches!(entry.kind, ReasonKind::Feature(_)))
        .map(|entry| entry.contribution)
        .sum();
    assert!((feature_sum - decision.blended_score).abs() < 1e-9);
}

#[test]
fn fired_rules_lead_the_reason_trace() {
    let decision = engine().decide(&feature_vector(25_000.0, 35.0), Some(0.20));

    let first = decision.reason_trace.first().expect("trace never empty");
    assert!(matches!(first.kind, ReasonKind::Rule("income-below-minimum")));
}
