use std::collections::BTreeMap;

use tracing::debug;

use super::config::PipelineConfig;
use super::domain::{ApplicationRecord, FieldName, Observation, ReconciledField, SourceKind};

/// Confidence boost when independent sources agree on a value.
pub(crate) const CORROBORATION_BONUS: u8 = 10;
/// Confidence penalty applied to the winning value of a conflict.
pub(crate) const CONFLICT_PENALTY: u8 = 15;

/// Merges observations from the form and all documents into a single
/// confidence-scored record. Conflicts resolve by source trust, then
/// confidence, then recency; the losing sources stay on the record for audit.
pub struct ReconciliationEngine {
    config: PipelineConfig,
}

impl ReconciliationEngine {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn reconcile(&self, observations: &[Observation]) -> ApplicationRecord {
        let mut grouped: BTreeMap<FieldName, Vec<&Observation>> = BTreeMap::new();
        for observation in observations {
            grouped.entry(observation.field).or_default().push(observation);
        }

        // Every weighted field appears in the record even when nobody
        // reported it; absence is valid input downstream, not an error.
        let mut fields = BTreeMap::new();
        for &field in self.config.field_weights.keys() {
            let entry = match grouped.get(&field) {
                Some(group) => resolve_field(field, group),
                None => ReconciledField {
                    field,
                    resolved: None,
                    confidence: 0,
                    conflicting: false,
                    contributing_sources: Vec::new(),
                },
            };
            fields.insert(field, entry);
        }
        for (&field, group) in &grouped {
            fields
                .entry(field)
                .or_insert_with(|| resolve_field(field, group));
        }

        let validation_score = self.validation_score(&fields);
        let risk_level = self.config.risk.tier(validation_score);

        ApplicationRecord {
            fields,
            validation_score,
            risk_level,
        }
    }

    /// Weighted mean of per-field confidences over the full weight table,
    /// scaled to 0-100.
    fn validation_score(&self, fields: &BTreeMap<FieldName, ReconciledField>) -> f64 {
        let total_weight: f64 = self.config.field_weights.values().sum();
        if total_weight <= 0.0 {
            return 0.0;
        }

        let weighted: f64 = self
            .config
            .field_weights
            .iter()
            .map(|(field, weight)| {
                let confidence = fields.get(field).map(|entry| entry.confidence).unwrap_or(0);
                weight * f64::from(confidence)
            })
            .sum();

        weighted / total_weight
    }
}

fn resolve_field(field: FieldName, group: &[&Observation]) -> ReconciledField {
    let mut sources: Vec<SourceKind> = group.iter().map(|obs| obs.source).collect();
    sources.sort_by(|a, b| b.trust_rank().cmp(&a.trust_rank()));
    sources.dedup();

    if let [only] = group {
        return ReconciledField {
            field,
            resolved: Some(only.value.clone()),
            confidence: only.source_confidence,
            conflicting: false,
            contributing_sources: sources,
        };
    }

    let mut distinct: Vec<String> = group.iter().map(|obs| obs.value.normalized()).collect();
    distinct.sort();
    distinct.dedup();

    if distinct.len() == 1 {
        // Corroborated: keep the most confident rendering of the value.
        let best = group
            .iter()
            .max_by_key(|obs| obs.source_confidence)
            .expect("non-empty observation group");
        let confidence = best
            .source_confidence
            .saturating_add(CORROBORATION_BONUS)
            .min(100);
        return ReconciledField {
            field,
            resolved: Some(best.value.clone()),
            confidence,
            conflicting: false,
            contributing_sources: sources,
        };
    }

    let winner = group
        .iter()
        .max_by(|a, b| {
            a.source
                .trust_rank()
                .cmp(&b.source.trust_rank())
                .then(a.source_confidence.cmp(&b.source_confidence))
                .then(a.observed_at.cmp(&b.observed_at))
        })
        .expect("non-empty observation group");

    debug!(
        field = field.label(),
        source = winner.source.label(),
        "conflicting observations resolved by source priority"
    );

    ReconciledField {
        field,
        resolved: Some(winner.value.clone()),
        confidence: winner.source_confidence.saturating_sub(CONFLICT_PENALTY),
        conflicting: true,
        contributing_sources: sources,
    }
}
