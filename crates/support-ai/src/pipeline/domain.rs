use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Applicant fields the pipeline reconciles across sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldName {
    FullName,
    DateOfBirth,
    Email,
    Phone,
    Address,
    MonthlyIncome,
    MonthlyObligations,
    EmploymentLengthMonths,
    Employer,
    FamilySize,
    Dependents,
}

impl FieldName {
    pub const fn label(self) -> &'static str {
        match self {
            FieldName::FullName => "full_name",
            FieldName::DateOfBirth => "date_of_birth",
            FieldName::Email => "email",
            FieldName::Phone => "phone",
            FieldName::Address => "address",
            FieldName::MonthlyIncome => "monthly_income",
            FieldName::MonthlyObligations => "monthly_obligations",
            FieldName::EmploymentLengthMonths => "employment_length_months",
            FieldName::Employer => "employer",
            FieldName::FamilySize => "family_size",
            FieldName::Dependents => "dependents",
        }
    }
}

/// Value representation shared by the application form and document payloads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldValue {
    Text(String),
    Number(f64),
    Count(u32),
}

impl FieldValue {
    /// Key used to decide whether two sources agree on a field. Text is
    /// case-folded with whitespace collapsed; numbers compare at two decimals.
    pub fn normalized(&self) -> String {
        match self {
            FieldValue::Text(raw) => raw
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ")
                .to_lowercase(),
            FieldValue::Number(value) => format!("{value:.2}"),
            FieldValue::Count(count) => count.to_string(),
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            FieldValue::Number(value) => Some(*value),
            FieldValue::Count(count) => Some(f64::from(*count)),
            FieldValue::Text(_) => None,
        }
    }
}

/// Origins an observation can come from, ordered by trust.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    GovernmentId,
    BankStatement,
    PayStub,
    TaxReturn,
    EmployerLetter,
    UtilityBill,
    ApplicationForm,
}

impl SourceKind {
    /// Trust ordering used to resolve conflicting observations. Higher wins.
    pub const fn trust_rank(self) -> u8 {
        match self {
            SourceKind::GovernmentId => 70,
            SourceKind::BankStatement => 60,
            SourceKind::PayStub => 50,
            SourceKind::TaxReturn => 40,
            SourceKind::EmployerLetter => 30,
            SourceKind::UtilityBill => 20,
            SourceKind::ApplicationForm => 10,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            SourceKind::GovernmentId => "government_id",
            SourceKind::BankStatement => "bank_statement",
            SourceKind::PayStub => "pay_stub",
            SourceKind::TaxReturn => "tax_return",
            SourceKind::EmployerLetter => "employer_letter",
            SourceKind::UtilityBill => "utility_bill",
            SourceKind::ApplicationForm => "application_form",
        }
    }
}

/// A single sourced fact about an applicant. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub field: FieldName,
    pub value: FieldValue,
    pub source: SourceKind,
    pub source_confidence: u8,
    pub observed_at: DateTime<Utc>,
}

/// Outcome of merging every observation of one field.
///
/// `resolved` is always one of the observed values; the engine never
/// fabricates data. A field nobody reported resolves to `None` at zero
/// confidence rather than failing the run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReconciledField {
    pub field: FieldName,
    pub resolved: Option<FieldValue>,
    pub confidence: u8,
    pub conflicting: bool,
    pub contributing_sources: Vec<SourceKind>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub const fn label(self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        }
    }
}

/// The reconciled, confidence-scored view of one application.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApplicationRecord {
    pub fields: BTreeMap<FieldName, ReconciledField>,
    pub validation_score: f64,
    pub risk_level: RiskLevel,
}

impl ApplicationRecord {
    pub fn resolved_number(&self, field: FieldName) -> Option<f64> {
        self.fields
            .get(&field)
            .and_then(|entry| entry.resolved.as_ref())
            .and_then(FieldValue::as_number)
    }

    pub fn confidence(&self, field: FieldName) -> u8 {
        self.fields
            .get(&field)
            .map(|entry| entry.confidence)
            .unwrap_or(0)
    }

    /// Fields ranked weakest first, used to target recommendations.
    pub fn weakest_fields(&self, limit: usize) -> Vec<FieldName> {
        let mut ranked: Vec<(FieldName, u8)> = self
            .fields
            .iter()
            .map(|(name, entry)| (*name, entry.confidence))
            .collect();
        ranked.sort_by(|a, b| a.1.cmp(&b.1).then(a.0.cmp(&b.0)));
        ranked.into_iter().take(limit).map(|(name, _)| name).collect()
    }
}
