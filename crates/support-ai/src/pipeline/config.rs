use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::domain::{FieldName, RiskLevel};
use super::features::FeatureKind;

const DEFAULT_FORM_SOURCE_CONFIDENCE: u8 = 70;
const DEFAULT_BLEND_ALPHA: f64 = 0.7;
const DEFAULT_APPROVE_AT: f64 = 0.70;
const DEFAULT_SOFT_DECLINE_AT: f64 = 0.40;
const DEFAULT_CONFIDENCE_SATURATION: f64 = 0.30;
const DEFAULT_MINIMUM_MONTHLY_INCOME: f64 = 30_000.0;
const DEFAULT_MINIMUM_VALIDATION_SCORE: f64 = 30.0;
const DEFAULT_SCORING_TIMEOUT_MS: u64 = 2_000;
const DEFAULT_MAX_RECOMMENDATIONS: usize = 5;

/// Every tunable the pipeline consumes, kept in one place so thresholds are
/// configuration rather than constants scattered across stages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Baseline confidence assigned to self-reported form fields.
    pub form_source_confidence: u8,
    /// Per-field weights backing the overall validation score.
    pub field_weights: BTreeMap<FieldName, f64>,
    pub risk: RiskThresholds,
    /// Share of the blended score taken from the model output.
    pub blend_alpha: f64,
    pub approve_at: f64,
    pub soft_decline_at: f64,
    /// Threshold margin at which decision confidence saturates to 1.0.
    pub confidence_saturation: f64,
    pub minimum_monthly_income: f64,
    pub minimum_validation_score: f64,
    /// Per-feature weights used when ranking reason-trace contributions.
    pub explanation_weights: BTreeMap<FeatureKind, f64>,
    pub neutral: NeutralDefaults,
    pub scoring_timeout_ms: u64,
    pub max_recommendations: usize,
}

impl PipelineConfig {
    /// Clamp out-of-range dials back to their defaults instead of failing at
    /// construction, mirroring how invalid policy values are absorbed at the
    /// compliance boundary.
    pub fn sanitized(mut self) -> Self {
        if self.form_source_confidence > 100 {
            self.form_source_confidence = DEFAULT_FORM_SOURCE_CONFIDENCE;
        }
        if !self.blend_alpha.is_finite() || !(0.0..=1.0).contains(&self.blend_alpha) {
            self.blend_alpha = DEFAULT_BLEND_ALPHA;
        }
        if !self.approve_at.is_finite()
            || !self.soft_decline_at.is_finite()
            || self.soft_decline_at >= self.approve_at
        {
            self.approve_at = DEFAULT_APPROVE_AT;
            self.soft_decline_at = DEFAULT_SOFT_DECLINE_AT;
        }
        if !self.confidence_saturation.is_finite() || self.confidence_saturation <= 0.0 {
            self.confidence_saturation = DEFAULT_CONFIDENCE_SATURATION;
        }
        if self.max_recommendations == 0 {
            self.max_recommendations = DEFAULT_MAX_RECOMMENDATIONS;
        }
        if self.field_weights.is_empty() {
            self.field_weights = default_field_weights();
        }
        self
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            form_source_confidence: DEFAULT_FORM_SOURCE_CONFIDENCE,
            field_weights: default_field_weights(),
            risk: RiskThresholds::default(),
            blend_alpha: DEFAULT_BLEND_ALPHA,
            approve_at: DEFAULT_APPROVE_AT,
            soft_decline_at: DEFAULT_SOFT_DECLINE_AT,
            confidence_saturation: DEFAULT_CONFIDENCE_SATURATION,
            minimum_monthly_income: DEFAULT_MINIMUM_MONTHLY_INCOME,
            minimum_validation_score: DEFAULT_MINIMUM_VALIDATION_SCORE,
            explanation_weights: default_explanation_weights(),
            neutral: NeutralDefaults::default(),
            scoring_timeout_ms: DEFAULT_SCORING_TIMEOUT_MS,
            max_recommendations: DEFAULT_MAX_RECOMMENDATIONS,
        }
    }
}

/// Identity and income fields carry more weight than contact details, so a
/// well-documented income with a shaky address still validates reasonably.
fn default_field_weights() -> BTreeMap<FieldName, f64> {
    BTreeMap::from([
        (FieldName::FullName, 15.0),
        (FieldName::DateOfBirth, 10.0),
        (FieldName::Email, 10.0),
        (FieldName::Phone, 10.0),
        (FieldName::Address, 5.0),
        (FieldName::MonthlyIncome, 20.0),
        (FieldName::MonthlyObligations, 5.0),
        (FieldName::EmploymentLengthMonths, 10.0),
        (FieldName::Employer, 5.0),
        (FieldName::FamilySize, 5.0),
        (FieldName::Dependents, 5.0),
    ])
}

fn default_explanation_weights() -> BTreeMap<FeatureKind, f64> {
    BTreeMap::from([
        (FeatureKind::MonthlyIncome, 0.20),
        (FeatureKind::IncomeStability, 0.15),
        (FeatureKind::EmploymentStability, 0.15),
        (FeatureKind::DebtToIncome, 0.20),
        (FeatureKind::FamilyBurden, 0.10),
        (FeatureKind::DocumentQuality, 0.20),
    ])
}

/// Validation-score cutoffs backing the risk tiers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskThresholds {
    pub low_at: f64,
    pub medium_at: f64,
}

impl RiskThresholds {
    pub fn tier(&self, validation_score: f64) -> RiskLevel {
        if validation_score >= self.low_at {
            RiskLevel::Low
        } else if validation_score >= self.medium_at {
            RiskLevel::Medium
        } else {
            RiskLevel::High
        }
    }
}

impl Default for RiskThresholds {
    fn default() -> Self {
        Self {
            low_at: 80.0,
            medium_at: 50.0,
        }
    }
}

/// Fallback values the feature builder substitutes for absent inputs.
///
/// Every field must stay `Some` in the shipped defaults; a `None` here turns
/// a missing applicant input into an `InsufficientDataError`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NeutralDefaults {
    pub monthly_income: Option<f64>,
    pub employment_length_months: Option<f64>,
    pub debt_ratio: Option<f64>,
    pub per_member_obligation: Option<f64>,
    pub family_burden: Option<f64>,
}

impl Default for NeutralDefaults {
    fn default() -> Self {
        Self {
            monthly_income: Some(0.0),
            employment_length_months: Some(0.0),
            debt_ratio: Some(0.35),
            per_member_obligation: Some(200.0),
            family_burden: Some(0.3),
        }
    }
}
