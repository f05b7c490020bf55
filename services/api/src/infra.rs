use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use support_ai::pipeline::{
    AuditError, AuditSink, FeatureKind, FeatureVector, PipelineConfig, PipelineRun,
    RepositoryError, RunId, RunRepository, ScoreError, ScoreModel,
};
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryRunRepository {
    runs: Arc<Mutex<HashMap<RunId, PipelineRun>>>,
}

impl RunRepository for InMemoryRunRepository {
    fn insert(&self, run: PipelineRun) -> Result<(), RepositoryError> {
        let mut guard = self.runs.lock().expect("run store mutex poisoned");
        if guard.contains_key(&run.run_id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(run.run_id.clone(), run);
        Ok(())
    }

    fn fetch(&self, run_id: &RunId) -> Result<Option<PipelineRun>, RepositoryError> {
        let guard = self.runs.lock().expect("run store mutex poisoned");
        Ok(guard.get(run_id).cloned())
    }
}

/// Audit sink that logs terminal runs; a deployment would hand them to the
/// persistence layer instead.
#[derive(Default, Clone)]
pub(crate) struct LoggingAuditSink;

impl AuditSink for LoggingAuditSink {
    fn publish(&self, run: &PipelineRun) -> Result<(), AuditError> {
        info!(
            run_id = %run.run_id,
            state = run.state.label(),
            "evaluation run archived"
        );
        Ok(())
    }
}

/// Deterministic stand-in for the external eligibility model so the service
/// runs without a model endpoint.
#[derive(Debug, Default, Clone)]
pub(crate) struct HeuristicScoreModel;

#[async_trait::async_trait]
impl ScoreModel for HeuristicScoreModel {
    async fn score(&self, features: &FeatureVector) -> Result<f64, ScoreError> {
        let income = (features.get(FeatureKind::MonthlyIncome) / 100_000.0).clamp(0.0, 1.0);
        let stability = 0.5 * features.get(FeatureKind::IncomeStability)
            + 0.5 * features.get(FeatureKind::EmploymentStability);
        let debt_relief = 1.0 - (features.get(FeatureKind::DebtToIncome) / 3.0).clamp(0.0, 1.0);

        Ok((0.45 * income + 0.35 * stability + 0.2 * debt_relief).clamp(0.0, 1.0))
    }
}

pub(crate) fn pipeline_config(scoring_timeout_ms: u64) -> PipelineConfig {
    PipelineConfig {
        scoring_timeout_ms,
        ..PipelineConfig::default()
    }
}
