use super::common::*;
use crate::pipeline::domain::{FieldName, FieldValue, Observation, RiskLevel, SourceKind};
use crate::pipeline::reconcile::ReconciliationEngine;

fn engine() -> ReconciliationEngine {
    ReconciliationEngine::new(config())
}

#[test]
fn single_observation_keeps_source_confidence() {
    let observations = vec![observation(
        FieldName::MonthlyIncome,
        FieldValue::Number(52_000.0),
        SourceKind::BankStatement,
        83,
        0,
    )];

    let record = engine().reconcile(&observations);
    let field = &record.fields[&FieldName::MonthlyIncome];

    assert_eq!(field.confidence, 83);
    assert_eq!(field.resolved, Some(FieldValue::Number(52_000.0)));
    assert!(!field.conflicting);
    assert_eq!(field.contributing_sources, vec![SourceKind::BankStatement]);
}

#[test]
fn agreeing_sources_earn_corroboration_bonus() {
    let observations = vec![
        observation(
            FieldName::MonthlyIncome,
            FieldValue::Number(52_000.0),
            SourceKind::ApplicationForm,
            70,
            0,
        ),
        observation(
            FieldName::MonthlyIncome,
            FieldValue::Number(52_000.0),
            SourceKind::BankStatement,
            82,
            5,
        ),
    ];

    let record = engine().reconcile(&observations);
    let field = &record.fields[&FieldName::MonthlyIncome];

    assert_eq!(field.confidence, 92);
    assert!(!field.conflicting);
    assert_eq!(
        field.contributing_sources,
        vec![SourceKind::BankStatement, SourceKind::ApplicationForm]
    );
}

#[test]
fn corroboration_bonus_caps_at_one_hundred() {
    let observations = vec![
        observation(
            FieldName::FullName,
            FieldValue::Text("Amina Hassan".to_string()),
            SourceKind::GovernmentId,
            95,
            0,
        ),
        observation(
            FieldName::FullName,
            FieldValue::Text("amina  hassan".to_string()),
            SourceKind::ApplicationForm,
            70,
            1,
        ),
    ];

    let record = engine().reconcile(&observations);
    let field = &record.fields[&FieldName::FullName];

    assert_eq!(field.confidence, 100);
    assert!(!field.conflicting);
}

#[test]
fn disagreeing_sources_resolve_by_trust_rank() {
    let observations = vec![
        observation(
            FieldName::MonthlyIncome,
            FieldValue::Number(80_000.0),
            SourceKind::ApplicationForm,
            95,
            10,
        ),
        observation(
            FieldName::MonthlyIncome,
            FieldValue::Number(52_000.0),
            SourceKind::BankStatement,
            60,
            0,
        ),
    ];

    let record = engine().reconcile(&observations);
    let field = &record.fields[&FieldName::MonthlyIncome];

    assert_eq!(field.resolved, Some(FieldValue::Number(52_000.0)));
    assert_eq!(field.confidence, 45);
    assert!(field.conflicting);
    assert_eq!(
        field.contributing_sources,
        vec![SourceKind::BankStatement, SourceKind::ApplicationForm]
    );
}

#[test]
fn equal_trust_conflict_resolves_by_confidence() {
    let observations = vec![
        observation(
            FieldName::Address,
            FieldValue::Text("12 Palm Street".to_string()),
            SourceKind::UtilityBill,
            80,
            0,
        ),
        observation(
            FieldName::Address,
            FieldValue::Text("99 Harbor Road".to_string()),
            SourceKind::UtilityBill,
            60,
            20,
        ),
    ];

    let record = engine().reconcile(&observations);
    let field = &record.fields[&FieldName::Address];

    assert_eq!(
        field.resolved,
        Some(FieldValue::Text("12 Palm Street".to_string()))
    );
    assert_eq!(field.confidence, 65);
}

#[test]
fn equal_trust_and_confidence_resolves_by_recency() {
    let observations = vec![
        observation(
            FieldName::Employer,
            FieldValue::Text("Old Employer".to_string()),
            SourceKind::PayStub,
            75,
            0,
        ),
        observation(
            FieldName::Employer,
            FieldValue::Text("New Employer".to_string()),
            SourceKind::PayStub,
            75,
            30,
        ),
    ];

    let record = engine().reconcile(&observations);
    let field = &record.fields[&FieldName::Employer];

    assert_eq!(
        field.resolved,
        Some(FieldValue::Text("New Employer".to_string()))
    );
    assert!(field.conflicting);
}

#[test]
fn conflict_penalty_floors_at_zero() {
    let observations = vec![
        observation(
            FieldName::Phone,
            FieldValue::Text("+971-50-000-0000".to_string()),
            SourceKind::GovernmentId,
            10,
            0,
        ),
        observation(
            FieldName::Phone,
            FieldValue::Text("+971-50-111-1111".to_string()),
            SourceKind::ApplicationForm,
            90,
            0,
        ),
    ];

    let record = engine().reconcile(&observations);
    let field = &record.fields[&FieldName::Phone];

    assert_eq!(field.confidence, 0);
    assert!(field.conflicting);
}

#[test]
fn absent_fields_resolve_to_none_without_failing() {
    let record = engine().reconcile(&[]);

    let field = &record.fields[&FieldName::MonthlyIncome];
    assert_eq!(field.resolved, None);
    assert_eq!(field.confidence, 0);
    assert!(!field.conflicting);
    assert_eq!(record.validation_score, 0.0);
    assert_eq!(record.risk_level, RiskLevel::High);
}

#[test]
fn validation_score_follows_field_weights() {
    // monthly_income carries 20 of 100 weight points in the default table.
    let observations = vec![observation(
        FieldName::MonthlyIncome,
        FieldValue::Number(52_000.0),
        SourceKind::BankStatement,
        100,
        0,
    )];

    let record = engine().reconcile(&observations);

    assert!((record.validation_score - 20.0).abs() < 1e-9);
    assert_eq!(record.risk_level, RiskLevel::High);
}

#[test]
fn risk_tiers_follow_configured_thresholds() {
    let all_fields = |confidence: u8| -> Vec<Observation> {
        form_fields(52_000.0, 24)
            .into_iter()
            .map(|(field, value)| {
                observation(field, value, SourceKind::ApplicationForm, confidence, 0)
            })
            .collect()
    };

    let low = engine().reconcile(&all_fields(100));
    assert!((low.validation_score - 100.0).abs() < 1e-9);
    assert_eq!(low.risk_level, RiskLevel::Low);

    let medium = engine().reconcile(&all_fields(60));
    assert!((medium.validation_score - 60.0).abs() < 1e-9);
    assert_eq!(medium.risk_level, RiskLevel::Medium);
}
