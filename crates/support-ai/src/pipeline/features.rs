use serde::{Deserialize, Serialize};

use super::config::PipelineConfig;
use super::domain::{ApplicationRecord, FieldName};

/// Income scale used when projecting the raw income feature into [0, 1] for
/// explanation ranking.
const INCOME_UNIT_SCALE: f64 = 100_000.0;
/// Upper clamp for the debt-to-income ratio.
pub(crate) const DEBT_RATIO_CEILING: f64 = 3.0;

/// Named features in their fixed vector order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureKind {
    MonthlyIncome,
    IncomeStability,
    EmploymentStability,
    DebtToIncome,
    FamilyBurden,
    DocumentQuality,
}

impl FeatureKind {
    pub const ALL: [FeatureKind; 6] = [
        FeatureKind::MonthlyIncome,
        FeatureKind::IncomeStability,
        FeatureKind::EmploymentStability,
        FeatureKind::DebtToIncome,
        FeatureKind::FamilyBurden,
        FeatureKind::DocumentQuality,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            FeatureKind::MonthlyIncome => "monthly_income",
            FeatureKind::IncomeStability => "income_stability",
            FeatureKind::EmploymentStability => "employment_stability",
            FeatureKind::DebtToIncome => "debt_to_income",
            FeatureKind::FamilyBurden => "family_burden",
            FeatureKind::DocumentQuality => "document_quality",
        }
    }

    /// Scale a raw feature value into [0, 1] so contributions from features
    /// with different units rank comparably in the reason trace.
    pub fn unit_value(self, raw: f64) -> f64 {
        match self {
            FeatureKind::MonthlyIncome => (raw / INCOME_UNIT_SCALE).clamp(0.0, 1.0),
            FeatureKind::DebtToIncome => (raw / DEBT_RATIO_CEILING).clamp(0.0, 1.0),
            _ => raw.clamp(0.0, 1.0),
        }
    }
}

/// Ordered numeric view of one application, owned by a single evaluation run
/// and never mutated after construction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureVector {
    values: Vec<(FeatureKind, f64)>,
}

impl FeatureVector {
    pub fn from_parts(values: Vec<(FeatureKind, f64)>) -> Self {
        Self { values }
    }

    pub fn get(&self, kind: FeatureKind) -> f64 {
        self.values
            .iter()
            .find(|(candidate, _)| *candidate == kind)
            .map(|(_, value)| *value)
            .unwrap_or(0.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (FeatureKind, f64)> + '_ {
        self.values.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Raised only when an input is absent and its neutral default was removed
/// from configuration; the shipped defaults make this unreachable.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("no value or neutral default available for {feature:?} ({input})")]
pub struct InsufficientDataError {
    pub feature: FeatureKind,
    pub input: &'static str,
}

/// Derives the model-facing feature vector from a reconciled record.
/// Pure: identical records always yield identical vectors.
pub struct FeatureBuilder {
    config: PipelineConfig,
}

impl FeatureBuilder {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn build(&self, record: &ApplicationRecord) -> Result<FeatureVector, InsufficientDataError> {
        let income = match record.resolved_number(FieldName::MonthlyIncome) {
            Some(value) => value.max(0.0),
            None => self
                .config
                .neutral
                .monthly_income
                .ok_or(InsufficientDataError {
                    feature: FeatureKind::MonthlyIncome,
                    input: "monthly_income",
                })?,
        };

        let employment_months = match record.resolved_number(FieldName::EmploymentLengthMonths) {
            Some(value) => value.max(0.0),
            None => self
                .config
                .neutral
                .employment_length_months
                .ok_or(InsufficientDataError {
                    feature: FeatureKind::IncomeStability,
                    input: "employment_length_months",
                })?,
        };

        let debt_to_income = self.debt_to_income(record, income)?;
        let family_burden = self.family_burden(record)?;

        Ok(FeatureVector {
            values: vec![
                (FeatureKind::MonthlyIncome, income),
                (
                    FeatureKind::IncomeStability,
                    income_stability_bucket(employment_months),
                ),
                (
                    FeatureKind::EmploymentStability,
                    employment_stability_bucket(employment_months),
                ),
                (FeatureKind::DebtToIncome, debt_to_income),
                (FeatureKind::FamilyBurden, family_burden),
                (FeatureKind::DocumentQuality, record.validation_score / 100.0),
            ],
        })
    }

    /// Monthly obligations over monthly income, clamped to [0, 3]. Missing
    /// obligations fall back to a per-household-member estimate; missing or
    /// zero income falls back to the configured neutral ratio.
    fn debt_to_income(
        &self,
        record: &ApplicationRecord,
        income: f64,
    ) -> Result<f64, InsufficientDataError> {
        if income <= 0.0 {
            return self.config.neutral.debt_ratio.ok_or(InsufficientDataError {
                feature: FeatureKind::DebtToIncome,
                input: "monthly_income",
            });
        }

        let obligations = match record.resolved_number(FieldName::MonthlyObligations) {
            Some(value) => value.max(0.0),
            None => {
                let per_member =
                    self.config
                        .neutral
                        .per_member_obligation
                        .ok_or(InsufficientDataError {
                            feature: FeatureKind::DebtToIncome,
                            input: "monthly_obligations",
                        })?;
                let family_size = record
                    .resolved_number(FieldName::FamilySize)
                    .filter(|size| *size >= 1.0)
                    .unwrap_or(1.0);
                per_member * family_size
            }
        };

        Ok((obligations / income).clamp(0.0, DEBT_RATIO_CEILING))
    }

    /// Dependents over family size, clamped to [0, 1].
    fn family_burden(&self, record: &ApplicationRecord) -> Result<f64, InsufficientDataError> {
        let family_size = record.resolved_number(FieldName::FamilySize);
        let dependents = record.resolved_number(FieldName::Dependents);

        match (family_size, dependents) {
            (Some(size), Some(count)) if size >= 1.0 => Ok((count / size).clamp(0.0, 1.0)),
            _ => self
                .config
                .neutral
                .family_burden
                .ok_or(InsufficientDataError {
                    feature: FeatureKind::FamilyBurden,
                    input: "family_size",
                }),
        }
    }
}

fn income_stability_bucket(months: f64) -> f64 {
    if months >= 24.0 {
        1.0
    } else if months >= 12.0 {
        0.6
    } else if months >= 6.0 {
        0.3
    } else {
        0.1
    }
}

fn employment_stability_bucket(months: f64) -> f64 {
    if months >= 36.0 {
        1.0
    } else if months >= 18.0 {
        0.7
    } else if months >= 6.0 {
        0.4
    } else {
        0.1
    }
}
