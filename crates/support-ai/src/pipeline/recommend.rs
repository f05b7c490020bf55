use serde::Serialize;

use super::config::PipelineConfig;
use super::decision::{Classification, Decision};
use super::domain::{ApplicationRecord, FieldName};

/// How many low-confidence fields steer the ordering of suggestions.
const WEAK_FIELD_COUNT: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationCategory {
    Stability,
    CreditImprovement,
    DebtReduction,
    Employment,
    FinancialEducation,
    Documentation,
    ImmediateActions,
    LongTermGoals,
}

impl RecommendationCategory {
    pub const fn label(self) -> &'static str {
        match self {
            RecommendationCategory::Stability => "stability",
            RecommendationCategory::CreditImprovement => "credit_improvement",
            RecommendationCategory::DebtReduction => "debt_reduction",
            RecommendationCategory::Employment => "employment",
            RecommendationCategory::FinancialEducation => "financial_education",
            RecommendationCategory::Documentation => "documentation",
            RecommendationCategory::ImmediateActions => "immediate_actions",
            RecommendationCategory::LongTermGoals => "long_term_goals",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RecommendedAction {
    pub category: RecommendationCategory,
    pub action: &'static str,
}

/// Ordered, capped, never-empty set of suggested next steps.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecommendationSet {
    /// Leading category, useful as a one-word summary for casework queues.
    pub category: RecommendationCategory,
    pub actions: Vec<RecommendedAction>,
}

const STABILITY_ACTIONS: &[&str] = &[
    "Keep income documentation current for annual reviews",
    "Maintain emergency savings of at least three months of expenses",
];

const CREDIT_IMPROVEMENT_ACTIONS: &[&str] = &[
    "Apply for a secured credit card to build credit history",
    "Set up automatic bill payments to improve payment history",
];

const DEBT_REDUCTION_ACTIONS: &[&str] = &[
    "Create a debt snowball plan to pay off obligations systematically",
    "Negotiate with creditors for lower interest rates",
];

const EMPLOYMENT_ACTIONS: &[&str] = &[
    "Obtain additional employment certifications",
    "Consider part-time work to supplement income",
];

const FINANCIAL_EDUCATION_ACTIONS: &[&str] = &[
    "Attend financial literacy workshops",
    "Use budgeting tools to track monthly expenses",
];

const DOCUMENTATION_ACTIONS: &[&str] = &[
    "Submit a bank statement covering the last three months",
    "Provide government identification to confirm identity details",
];

const IMMEDIATE_ACTIONS: &[&str] = &[
    "Focus on building emergency savings",
    "Reduce monthly expenses and create a budget",
    "Seek financial counseling services",
];

const LONG_TERM_ACTIONS: &[&str] = &[
    "Develop additional income streams",
    "Consider vocational training programs",
];

fn catalog(category: RecommendationCategory) -> &'static [&'static str] {
    match category {
        RecommendationCategory::Stability => STABILITY_ACTIONS,
        RecommendationCategory::CreditImprovement => CREDIT_IMPROVEMENT_ACTIONS,
        RecommendationCategory::DebtReduction => DEBT_REDUCTION_ACTIONS,
        RecommendationCategory::Employment => EMPLOYMENT_ACTIONS,
        RecommendationCategory::FinancialEducation => FINANCIAL_EDUCATION_ACTIONS,
        RecommendationCategory::Documentation => DOCUMENTATION_ACTIONS,
        RecommendationCategory::ImmediateActions => IMMEDIATE_ACTIONS,
        RecommendationCategory::LongTermGoals => LONG_TERM_ACTIONS,
    }
}

/// Candidate categories per classification, in default priority order.
fn candidate_pool(classification: Classification) -> &'static [RecommendationCategory] {
    match classification {
        Classification::Approved => &[
            RecommendationCategory::Stability,
            RecommendationCategory::FinancialEducation,
        ],
        Classification::SoftDecline => &[
            RecommendationCategory::Documentation,
            RecommendationCategory::CreditImprovement,
            RecommendationCategory::DebtReduction,
            RecommendationCategory::Employment,
            RecommendationCategory::FinancialEducation,
        ],
        Classification::HardDecline => &[
            RecommendationCategory::ImmediateActions,
            RecommendationCategory::Documentation,
            RecommendationCategory::LongTermGoals,
        ],
    }
}

/// Which category addresses a weakly-evidenced field.
fn category_for_field(field: FieldName) -> RecommendationCategory {
    match field {
        FieldName::MonthlyIncome | FieldName::MonthlyObligations => {
            RecommendationCategory::DebtReduction
        }
        FieldName::EmploymentLengthMonths | FieldName::Employer => {
            RecommendationCategory::Employment
        }
        FieldName::FullName
        | FieldName::DateOfBirth
        | FieldName::Email
        | FieldName::Phone
        | FieldName::Address
        | FieldName::FamilySize
        | FieldName::Dependents => RecommendationCategory::Documentation,
    }
}

/// Pure mapping from (decision, record) to suggested actions. Deterministic
/// given identical inputs; no side effects.
pub struct RecommendationSelector {
    config: PipelineConfig,
}

impl RecommendationSelector {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn select(&self, decision: &Decision, record: &ApplicationRecord) -> RecommendationSet {
        let pool = candidate_pool(decision.classification);

        // Categories tied to the weakest reconciled fields move to the front
        // of the pool; the remaining pool order is preserved.
        let mut ordered: Vec<RecommendationCategory> = Vec::with_capacity(pool.len());
        for field in record.weakest_fields(WEAK_FIELD_COUNT) {
            let category = category_for_field(field);
            if pool.contains(&category) && !ordered.contains(&category) {
                ordered.push(category);
            }
        }
        for category in pool {
            if !ordered.contains(category) {
                ordered.push(*category);
            }
        }

        let mut actions = Vec::new();
        'fill: for category in &ordered {
            for action in catalog(*category) {
                if actions.len() == self.config.max_recommendations {
                    break 'fill;
                }
                actions.push(RecommendedAction {
                    category: *category,
                    action,
                });
            }
        }

        RecommendationSet {
            category: ordered[0],
            actions,
        }
    }
}
