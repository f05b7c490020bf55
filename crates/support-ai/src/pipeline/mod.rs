//! Application evaluation pipeline: observation intake, cross-source
//! reconciliation, feature derivation, rule and score based decisioning, and
//! enablement recommendations, sequenced per run by the orchestrator.
//!
//! Stages within one run are strictly sequential; independent runs share
//! nothing mutable, so any number can execute concurrently against the same
//! scoring model.

pub mod config;
pub(crate) mod decision;
pub mod domain;
pub(crate) mod features;
pub mod intake;
pub(crate) mod orchestrator;
pub(crate) mod recommend;
pub(crate) mod reconcile;
pub mod repository;
pub mod router;
pub mod scoring;
pub mod service;

#[cfg(test)]
mod tests;

pub use config::{NeutralDefaults, PipelineConfig, RiskThresholds};
pub use decision::{
    Classification, Decision, DecisionEngine, HardRule, ReasonEntry, ReasonKind, RuleFiring,
    HARD_RULES,
};
pub use domain::{
    ApplicationRecord, FieldName, FieldValue, Observation, ReconciledField, RiskLevel, SourceKind,
};
pub use features::{FeatureBuilder, FeatureKind, FeatureVector, InsufficientDataError};
pub use intake::{
    observations_from_document, observations_from_form, ApplicationForm, DocumentExtraction,
    ExtractedField, ValidationInputError,
};
pub use orchestrator::{
    CancelToken, EvaluationReport, Orchestrator, PipelineRun, RunFailure, RunId, RunState, Stage,
    StageStatus,
};
pub use recommend::{
    RecommendationCategory, RecommendationSelector, RecommendationSet, RecommendedAction,
};
pub use reconcile::ReconciliationEngine;
pub use repository::{AuditError, AuditSink, RepositoryError, RunRepository, RunStatusView};
pub use router::{evaluation_router, EvaluationRequest};
pub use scoring::{ScoreError, ScoreModel};
pub use service::{EvaluationService, EvaluationServiceError};
