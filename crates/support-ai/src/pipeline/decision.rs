use serde::Serialize;
use tracing::warn;

use super::config::PipelineConfig;
use super::features::{FeatureKind, FeatureVector};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    Approved,
    SoftDecline,
    HardDecline,
}

impl Classification {
    pub const fn label(self) -> &'static str {
        match self {
            Classification::Approved => "approved",
            Classification::SoftDecline => "soft_decline",
            Classification::HardDecline => "hard_decline",
        }
    }
}

/// Hard business rules, kept as data so audits can enumerate them and tests
/// can exercise each one independently.
#[derive(Debug, Clone, Copy)]
pub struct HardRule {
    pub id: &'static str,
    pub description: &'static str,
    guard: RuleGuard,
}

#[derive(Debug, Clone, Copy)]
enum RuleGuard {
    MinimumMonthlyIncome,
    MinimumValidationScore,
}

pub const HARD_RULES: &[HardRule] = &[
    HardRule {
        id: "income-below-minimum",
        description: "declared monthly income is below the absolute support floor",
        guard: RuleGuard::MinimumMonthlyIncome,
    },
    HardRule {
        id: "documentation-below-minimum",
        description: "documentation validation score is below the audit floor",
        guard: RuleGuard::MinimumValidationScore,
    },
];

/// Record of one rule that fired during RuleCheck.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleFiring {
    pub rule_id: &'static str,
    pub detail: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasonKind {
    Feature(FeatureKind),
    Rule(&'static str),
}

/// One ranked entry of the decision explanation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReasonEntry {
    pub kind: ReasonKind,
    pub label: String,
    pub contribution: f64,
}

/// The classified outcome for one application. Immutable once emitted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Decision {
    pub classification: Classification,
    /// Margin-based certainty in [0, 1]; distinct from the model score.
    pub confidence: f64,
    pub reason_trace: Vec<ReasonEntry>,
    /// The validated model output, `None` when the run was degraded.
    pub model_score: Option<f64>,
    pub blended_score: f64,
    pub rules_fired: Vec<RuleFiring>,
    pub degraded: bool,
}

/// Combines the external model score with deterministic business rules.
///
/// One evaluation walks Scoring -> RuleCheck -> Classified -> Explained with
/// no loops or re-entry; every step below is a pure function of its inputs.
pub struct DecisionEngine {
    config: PipelineConfig,
}

impl DecisionEngine {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Classify one evaluation. A model score outside [0, 1] (or absent)
    /// switches to the rules-only fallback and marks the decision degraded.
    pub fn decide(&self, features: &FeatureVector, model_score: Option<f64>) -> Decision {
        let validation_score = features.get(FeatureKind::DocumentQuality) * 100.0;

        let valid_model =
            model_score.filter(|score| score.is_finite() && (0.0..=1.0).contains(score));
        let degraded = valid_model.is_none();
        if degraded && model_score.is_some() {
            warn!(
                ?model_score,
                "model score outside [0, 1], falling back to rules-only classification"
            );
        }

        let rules_fired = self.rule_check(features, validation_score);

        let blended = match valid_model {
            Some(score) => {
                self.config.blend_alpha * score
                    + (1.0 - self.config.blend_alpha) * validation_score / 100.0
            }
            None => validation_score / 100.0,
        };

        let classification = if !rules_fired.is_empty() {
            Classification::HardDecline
        } else if blended >= self.config.approve_at {
            Classification::Approved
        } else if blended >= self.config.soft_decline_at {
            Classification::SoftDecline
        } else {
            Classification::HardDecline
        };

        let confidence = self.threshold_margin_confidence(blended);
        let reason_trace = self.explain(features, blended, &rules_fired);

        Decision {
            classification,
            confidence,
            reason_trace,
            model_score: valid_model,
            blended_score: blended,
            rules_fired,
            degraded,
        }
    }

    /// Hard rules run before the blended score and force a hard decline on
    /// their own, whatever the model said.
    fn rule_check(&self, features: &FeatureVector, validation_score: f64) -> Vec<RuleFiring> {
        HARD_RULES
            .iter()
            .filter_map(|rule| {
                let detail = match rule.guard {
                    RuleGuard::MinimumMonthlyIncome => {
                        let income = features.get(FeatureKind::MonthlyIncome);
                        (income < self.config.minimum_monthly_income).then(|| {
                            format!(
                                "monthly income {income:.0} below minimum {:.0}",
                                self.config.minimum_monthly_income
                            )
                        })
                    }
                    RuleGuard::MinimumValidationScore => (validation_score
                        < self.config.minimum_validation_score)
                        .then(|| {
                            format!(
                                "validation score {validation_score:.1} below minimum {:.1}",
                                self.config.minimum_validation_score
                            )
                        }),
                };
                detail.map(|detail| RuleFiring {
                    rule_id: rule.id,
                    detail,
                })
            })
            .collect()
    }

    /// Distance from the nearest classification threshold, saturating at the
    /// configured margin: a blended score deep inside a band reads as a more
    /// certain decision than one sitting on a boundary.
    fn threshold_margin_confidence(&self, blended: f64) -> f64 {
        let margin = (blended - self.config.approve_at)
            .abs()
            .min((blended - self.config.soft_decline_at).abs());
        (margin / self.config.confidence_saturation).clamp(0.0, 1.0)
    }

    /// Rank what drove the blended score. Feature contributions are weight
    /// times unit-scaled value, normalized so they sum to the blended score;
    /// fired rules pin to the top at full contribution. Reproducible from the
    /// stored (features, model_score, rules_fired) alone.
    fn explain(
        &self,
        features: &FeatureVector,
        blended: f64,
        rules_fired: &[RuleFiring],
    ) -> Vec<ReasonEntry> {
        let weighted: Vec<(FeatureKind, f64)> = features
            .iter()
            .map(|(kind, value)| {
                let weight = self
                    .config
                    .explanation_weights
                    .get(&kind)
                    .copied()
                    .unwrap_or(0.0);
                (kind, weight * kind.unit_value(value))
            })
            .collect();

        let total: f64 = weighted.iter().map(|(_, contribution)| contribution).sum();
        let scale = if total > 0.0 { blended / total } else { 0.0 };

        let mut trace: Vec<ReasonEntry> = weighted
            .into_iter()
            .map(|(kind, contribution)| ReasonEntry {
                kind: ReasonKind::Feature(kind),
                label: kind.label().to_string(),
                contribution: contribution * scale,
            })
            .collect();

        trace.extend(rules_fired.iter().map(|firing| ReasonEntry {
            kind: ReasonKind::Rule(firing.rule_id),
            label: firing.detail.clone(),
            contribution: 1.0,
        }));

        trace.sort_by(|a, b| {
            b.contribution
                .partial_cmp(&a.contribution)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        trace
    }
}
