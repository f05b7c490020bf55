use serde::Serialize;

use super::orchestrator::{PipelineRun, RunId};

/// Storage abstraction for terminal runs so the service facade can be
/// exercised in isolation.
pub trait RunRepository: Send + Sync {
    fn insert(&self, run: PipelineRun) -> Result<(), RepositoryError>;
    fn fetch(&self, run_id: &RunId) -> Result<Option<PipelineRun>, RepositoryError>;
}

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("run already recorded")]
    Conflict,
    #[error("run not found")]
    NotFound,
    #[error("run store unavailable: {0}")]
    Unavailable(String),
}

/// Outbound seam delivering each terminal run, completed or failed, to the
/// external persistence/audit layer as one immutable record.
pub trait AuditSink: Send + Sync {
    fn publish(&self, run: &PipelineRun) -> Result<(), AuditError>;
}

#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    #[error("audit transport unavailable: {0}")]
    Transport(String),
}

/// Sanitized representation of a run's exposed status.
#[derive(Debug, Clone, Serialize)]
pub struct RunStatusView {
    pub run_id: String,
    pub state: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub classification: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub risk_level: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation_score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub degraded: Option<bool>,
}

impl RunStatusView {
    pub fn from_run(run: &PipelineRun) -> Self {
        Self {
            run_id: run.run_id.0.clone(),
            state: run.state.label(),
            classification: run
                .decision
                .as_ref()
                .map(|decision| decision.classification.label()),
            risk_level: run.record.as_ref().map(|record| record.risk_level.label()),
            validation_score: run.record.as_ref().map(|record| record.validation_score),
            degraded: run.decision.as_ref().map(|decision| decision.degraded),
        }
    }
}
