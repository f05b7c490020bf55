use super::common::*;
use crate::pipeline::decision::{Classification, Decision};
use crate::pipeline::domain::{ApplicationRecord, FieldName, FieldValue, SourceKind};
use crate::pipeline::recommend::{RecommendationCategory, RecommendationSelector};
use crate::pipeline::reconcile::ReconciliationEngine;

fn selector() -> RecommendationSelector {
    RecommendationSelector::new(config())
}

fn decision(classification: Classification) -> Decision {
    Decision {
        classification,
        confidence: 0.5,
        reason_trace: Vec::new(),
        model_score: Some(0.5),
        blended_score: 0.5,
        rules_fired: Vec::new(),
        degraded: false,
    }
}

fn uniform_record() -> ApplicationRecord {
    let observations: Vec<_> = form_fields(62_000.0, 30)
        .into_iter()
        .map(|(field, value)| observation(field, value, SourceKind::ApplicationForm, 70, 0))
        .collect();
    ReconciliationEngine::new(config()).reconcile(&observations)
}

/// Record where the income evidence is visibly weaker than everything else.
fn weak_income_record() -> ApplicationRecord {
    let mut observations: Vec<_> = form_fields(62_000.0, 30)
        .into_iter()
        .map(|(field, value)| observation(field, value, SourceKind::ApplicationForm, 90, 0))
        .collect();
    observations.push(observation(
        FieldName::MonthlyIncome,
        FieldValue::Number(48_000.0),
        SourceKind::BankStatement,
        55,
        5,
    ));
    ReconciliationEngine::new(config()).reconcile(&observations)
}

#[test]
fn selection_is_non_empty_and_capped() {
    let set = selector().select(&decision(Classification::SoftDecline), &uniform_record());

    assert!(!set.actions.is_empty());
    assert!(set.actions.len() <= config().max_recommendations);
}

#[test]
fn selection_is_deterministic() {
    let record = uniform_record();
    let decision = decision(Classification::SoftDecline);
    let selector = selector();

    assert_eq!(
        selector.select(&decision, &record),
        selector.select(&decision, &record)
    );
}

#[test]
fn weak_income_evidence_promotes_debt_reduction() {
    let set = selector().select(&decision(Classification::SoftDecline), &weak_income_record());

    assert_eq!(set.category, RecommendationCategory::DebtReduction);
    assert_eq!(
        set.actions.first().map(|action| action.category),
        Some(RecommendationCategory::DebtReduction)
    );
}

#[test]
fn approved_decisions_lead_with_stability() {
    let set = selector().select(&decision(Classification::Approved), &uniform_record());

    assert_eq!(set.category, RecommendationCategory::Stability);
    assert!(set
        .actions
        .iter()
        .all(|action| matches!(
            action.category,
            RecommendationCategory::Stability | RecommendationCategory::FinancialEducation
        )));
}

/// Record whose weakest evidence is financial, not identity, so no weak-field
/// category overlaps the hard-decline pool.
fn weak_financials_record() -> ApplicationRecord {
    let mut observations: Vec<_> = form_fields(62_000.0, 30)
        .into_iter()
        .map(|(field, value)| observation(field, value, SourceKind::ApplicationForm, 90, 0))
        .collect();
    observations.extend([
        observation(
            FieldName::MonthlyIncome,
            FieldValue::Number(48_000.0),
            SourceKind::BankStatement,
            55,
            5,
        ),
        observation(
            FieldName::MonthlyObligations,
            FieldValue::Number(9_600.0),
            SourceKind::BankStatement,
            55,
            5,
        ),
        observation(
            FieldName::EmploymentLengthMonths,
            FieldValue::Count(14),
            SourceKind::PayStub,
            50,
            5,
        ),
    ]);
    ReconciliationEngine::new(config()).reconcile(&observations)
}

#[test]
fn hard_declines_lead_with_immediate_actions() {
    let set = selector().select(
        &decision(Classification::HardDecline),
        &weak_financials_record(),
    );

    assert_eq!(set.category, RecommendationCategory::ImmediateActions);
}

#[test]
fn weak_documentation_reorders_hard_decline_pool() {
    let set = selector().select(&decision(Classification::HardDecline), &uniform_record());

    // The uniformly low-confidence identity fields pull documentation fixes
    // ahead of the default pool order.
    assert_eq!(set.category, RecommendationCategory::Documentation);
}
