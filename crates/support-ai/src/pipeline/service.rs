use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use super::config::PipelineConfig;
use super::intake::{ApplicationForm, DocumentExtraction};
use super::orchestrator::{
    CancelToken, EvaluationReport, Orchestrator, RunFailure, RunId, Stage,
};
use super::repository::{AuditError, AuditSink, RepositoryError, RunRepository, RunStatusView};
use super::scoring::ScoreModel;

/// Facade composing the orchestrator with the run store and audit seam.
pub struct EvaluationService<R, A> {
    repository: Arc<R>,
    audit: Arc<A>,
    orchestrator: Orchestrator,
}

static RUN_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_run_id() -> RunId {
    let id = RUN_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    RunId(format!("run-{id:06}"))
}

impl<R, A> EvaluationService<R, A>
where
    R: RunRepository + 'static,
    A: AuditSink + 'static,
{
    pub fn new(
        repository: Arc<R>,
        audit: Arc<A>,
        model: Arc<dyn ScoreModel>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            repository,
            audit,
            orchestrator: Orchestrator::new(config, model),
        }
    }

    /// Run one application through the pipeline and archive the terminal run.
    pub async fn evaluate(
        &self,
        form: ApplicationForm,
        documents: Vec<DocumentExtraction>,
    ) -> Result<EvaluationReport, EvaluationServiceError> {
        self.evaluate_with_cancel(form, documents, &CancelToken::new())
            .await
    }

    pub async fn evaluate_with_cancel(
        &self,
        form: ApplicationForm,
        documents: Vec<DocumentExtraction>,
        cancel: &CancelToken,
    ) -> Result<EvaluationReport, EvaluationServiceError> {
        let run_id = next_run_id();
        let run = self
            .orchestrator
            .evaluate(run_id.clone(), &form, &documents, cancel, Utc::now())
            .await;

        // Failed runs are archived too; the audit trail must show why a run
        // never produced a decision.
        self.repository.insert(run.clone())?;
        self.audit.publish(&run)?;

        match run.report() {
            Some(report) => {
                info!(
                    run_id = %report.run_id,
                    classification = report.decision.classification.label(),
                    degraded = report.decision.degraded,
                    "application evaluated"
                );
                Ok(report)
            }
            None => {
                let RunFailure { stage, detail } = run.failure.unwrap_or(RunFailure {
                    stage: Stage::Extracting,
                    detail: "run did not complete".to_string(),
                });
                Err(EvaluationServiceError::RunFailed {
                    run_id,
                    stage,
                    detail,
                })
            }
        }
    }

    /// Fetch a stored run's sanitized status for API responses.
    pub fn status(&self, run_id: &RunId) -> Result<Option<RunStatusView>, EvaluationServiceError> {
        let run = self.repository.fetch(run_id)?;
        Ok(run.map(|run| RunStatusView::from_run(&run)))
    }
}

/// Error raised by the evaluation service.
#[derive(Debug, thiserror::Error)]
pub enum EvaluationServiceError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Audit(#[from] AuditError),
    #[error("run {run_id} failed at {stage}: {detail}")]
    RunFailed {
        run_id: RunId,
        stage: Stage,
        detail: String,
    },
}
