use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::time::timeout;
use tracing::{info, warn};

use super::config::PipelineConfig;
use super::decision::{Decision, DecisionEngine};
use super::domain::ApplicationRecord;
use super::features::{FeatureBuilder, FeatureVector};
use super::intake::{self, ApplicationForm, DocumentExtraction};
use super::recommend::{RecommendationSelector, RecommendationSet};
use super::reconcile::ReconciliationEngine;
use super::scoring::{ScoreError, ScoreModel};

/// Identifier for one evaluation run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct RunId(pub String);

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Tracked stages of one run. Scoring is tracked separately from Deciding so
/// an absorbed model failure stays visible in the stage map instead of being
/// swallowed by the degraded decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Extracting,
    Reconciling,
    FeatureBuilding,
    Scoring,
    Deciding,
    Recommending,
}

impl Stage {
    pub const ALL: [Stage; 6] = [
        Stage::Extracting,
        Stage::Reconciling,
        Stage::FeatureBuilding,
        Stage::Scoring,
        Stage::Deciding,
        Stage::Recommending,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            Stage::Extracting => "extracting",
            Stage::Reconciling => "reconciling",
            Stage::FeatureBuilding => "feature_building",
            Stage::Scoring => "scoring",
            Stage::Deciding => "deciding",
            Stage::Recommending => "recommending",
        }
    }

    const fn predecessor(self) -> Option<Stage> {
        match self {
            Stage::Extracting => None,
            Stage::Reconciling => Some(Stage::Extracting),
            Stage::FeatureBuilding => Some(Stage::Reconciling),
            Stage::Scoring => Some(Stage::FeatureBuilding),
            Stage::Deciding => Some(Stage::Scoring),
            Stage::Recommending => Some(Stage::Deciding),
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    Pending,
    Running,
    Completed,
    Skipped,
    Failed { error: String },
}

/// Lifecycle of one run as a whole.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Created,
    Extracting,
    Reconciling,
    FeatureBuilding,
    Deciding,
    Recommending,
    Completed,
    Failed,
}

impl RunState {
    pub const fn label(self) -> &'static str {
        match self {
            RunState::Created => "created",
            RunState::Extracting => "extracting",
            RunState::Reconciling => "reconciling",
            RunState::FeatureBuilding => "feature_building",
            RunState::Deciding => "deciding",
            RunState::Recommending => "recommending",
            RunState::Completed => "completed",
            RunState::Failed => "failed",
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, RunState::Completed | RunState::Failed)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunFailure {
    pub stage: Stage,
    pub detail: String,
}

/// The aggregate for one application's evaluation. Only the orchestrator
/// advances it; once terminal it is emitted as an immutable audit record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineRun {
    pub run_id: RunId,
    pub state: RunState,
    pub stage_statuses: BTreeMap<Stage, StageStatus>,
    pub record: Option<ApplicationRecord>,
    pub features: Option<FeatureVector>,
    pub decision: Option<Decision>,
    pub recommendations: Option<RecommendationSet>,
    pub failure: Option<RunFailure>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl PipelineRun {
    fn new(run_id: RunId, started_at: DateTime<Utc>) -> Self {
        let stage_statuses = Stage::ALL
            .iter()
            .map(|stage| (*stage, StageStatus::Pending))
            .collect();
        Self {
            run_id,
            state: RunState::Created,
            stage_statuses,
            record: None,
            features: None,
            decision: None,
            recommendations: None,
            failure: None,
            started_at,
            finished_at: None,
        }
    }

    fn set_stage(&mut self, stage: Stage, status: StageStatus) {
        self.stage_statuses.insert(stage, status);
    }

    pub fn stage_status(&self, stage: Stage) -> &StageStatus {
        self.stage_statuses
            .get(&stage)
            .unwrap_or(&StageStatus::Pending)
    }

    /// Transition guard: a stage may start only once its predecessor is
    /// Completed or Skipped. The one sanctioned exception is Deciding after a
    /// Scoring failure, which is the degraded fallback path.
    fn can_enter(&self, stage: Stage) -> bool {
        match stage.predecessor() {
            None => true,
            Some(prior) => match self.stage_status(prior) {
                StageStatus::Completed | StageStatus::Skipped => true,
                StageStatus::Failed { .. } => {
                    stage == Stage::Deciding && prior == Stage::Scoring
                }
                StageStatus::Pending | StageStatus::Running => false,
            },
        }
    }

    /// The outbound result contract; available only for completed runs.
    pub fn report(&self) -> Option<EvaluationReport> {
        match (
            self.state,
            &self.record,
            &self.decision,
            &self.recommendations,
        ) {
            (RunState::Completed, Some(record), Some(decision), Some(recommendations)) => {
                Some(EvaluationReport {
                    run_id: self.run_id.clone(),
                    record: record.clone(),
                    decision: decision.clone(),
                    recommendations: recommendations.clone(),
                    stage_statuses: self.stage_statuses.clone(),
                })
            }
            _ => None,
        }
    }
}

/// Result contract consumed by the API layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationReport {
    pub run_id: RunId,
    pub record: ApplicationRecord,
    pub decision: Decision,
    pub recommendations: RecommendationSet,
    pub stage_statuses: BTreeMap<Stage, StageStatus>,
}

/// Cooperative cancellation checked between stages. Cancelling never rolls
/// back a completed stage.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}

/// Sequences the pipeline stages for one run and owns the failure/fallback
/// semantics around the external scoring call.
pub struct Orchestrator {
    config: PipelineConfig,
    reconciler: ReconciliationEngine,
    feature_builder: FeatureBuilder,
    decision_engine: DecisionEngine,
    recommender: RecommendationSelector,
    model: Arc<dyn ScoreModel>,
}

impl Orchestrator {
    pub fn new(config: PipelineConfig, model: Arc<dyn ScoreModel>) -> Self {
        let config = config.sanitized();
        Self {
            reconciler: ReconciliationEngine::new(config.clone()),
            feature_builder: FeatureBuilder::new(config.clone()),
            decision_engine: DecisionEngine::new(config.clone()),
            recommender: RecommendationSelector::new(config.clone()),
            model,
            config,
        }
    }

    /// Drive one application through every stage. The returned run is always
    /// terminal: Completed, or Failed with the originating stage recorded.
    pub async fn evaluate(
        &self,
        run_id: RunId,
        form: &ApplicationForm,
        documents: &[DocumentExtraction],
        cancel: &CancelToken,
        started_at: DateTime<Utc>,
    ) -> PipelineRun {
        let mut run = PipelineRun::new(run_id, started_at);

        // Extracting: normalize the form and any document payloads into the
        // uniform observation stream. No documents supplied is valid and the
        // stage is skipped; reconciliation then works from the form alone.
        if let Some(reason) = gate(&run, Stage::Extracting, cancel) {
            return self.fail(run, Stage::Extracting, reason);
        }
        let mut observations =
            match intake::observations_from_form(form, self.config.form_source_confidence) {
                Ok(observations) => observations,
                Err(error) => return self.fail(run, Stage::Extracting, error.to_string()),
            };
        if documents.is_empty() {
            run.set_stage(Stage::Extracting, StageStatus::Skipped);
        } else {
            run.state = RunState::Extracting;
            for document in documents {
                match intake::observations_from_document(document) {
                    Ok(extracted) => observations.extend(extracted),
                    Err(error) => return self.fail(run, Stage::Extracting, error.to_string()),
                }
            }
            run.set_stage(Stage::Extracting, StageStatus::Completed);
        }

        // Reconciling
        if let Some(reason) = gate(&run, Stage::Reconciling, cancel) {
            return self.fail(run, Stage::Reconciling, reason);
        }
        run.state = RunState::Reconciling;
        let record = self.reconciler.reconcile(&observations);
        run.record = Some(record);
        run.set_stage(Stage::Reconciling, StageStatus::Completed);

        // FeatureBuilding
        if let Some(reason) = gate(&run, Stage::FeatureBuilding, cancel) {
            return self.fail(run, Stage::FeatureBuilding, reason);
        }
        run.state = RunState::FeatureBuilding;
        let features = {
            let record = run.record.as_ref().expect("record set by reconciliation");
            match self.feature_builder.build(record) {
                Ok(features) => features,
                Err(error) => return self.fail(run, Stage::FeatureBuilding, error.to_string()),
            }
        };
        run.features = Some(features.clone());
        run.set_stage(Stage::FeatureBuilding, StageStatus::Completed);

        // Scoring: the external call, bounded by a timeout with one immediate
        // retry. A final failure is recorded on the stage map but does not
        // fail the run; the decision engine degrades to rules-only mode.
        if let Some(reason) = gate(&run, Stage::Scoring, cancel) {
            return self.fail(run, Stage::Scoring, reason);
        }
        run.state = RunState::Deciding;
        let model_score = match self.score_with_retry(&features).await {
            Ok(score) => {
                run.set_stage(Stage::Scoring, StageStatus::Completed);
                Some(score)
            }
            Err(error) => {
                warn!(
                    run_id = %run.run_id,
                    error = %error,
                    "scoring model failed, continuing with rules-only decision"
                );
                run.set_stage(
                    Stage::Scoring,
                    StageStatus::Failed {
                        error: error.to_string(),
                    },
                );
                None
            }
        };

        // Deciding
        if let Some(reason) = gate(&run, Stage::Deciding, cancel) {
            return self.fail(run, Stage::Deciding, reason);
        }
        let decision = self.decision_engine.decide(&features, model_score);
        run.decision = Some(decision);
        run.set_stage(Stage::Deciding, StageStatus::Completed);

        // Recommending
        if let Some(reason) = gate(&run, Stage::Recommending, cancel) {
            return self.fail(run, Stage::Recommending, reason);
        }
        run.state = RunState::Recommending;
        let recommendations = {
            let decision = run.decision.as_ref().expect("decision set by engine");
            let record = run.record.as_ref().expect("record set by reconciliation");
            self.recommender.select(decision, record)
        };
        run.recommendations = Some(recommendations);
        run.set_stage(Stage::Recommending, StageStatus::Completed);

        run.state = RunState::Completed;
        run.finished_at = Some(Utc::now());
        info!(
            run_id = %run.run_id,
            state = run.state.label(),
            "evaluation run completed"
        );
        run
    }

    fn fail(&self, mut run: PipelineRun, stage: Stage, detail: String) -> PipelineRun {
        warn!(
            run_id = %run.run_id,
            stage = stage.label(),
            %detail,
            "pipeline run failed"
        );
        run.set_stage(
            stage,
            StageStatus::Failed {
                error: detail.clone(),
            },
        );
        run.failure = Some(RunFailure { stage, detail });
        run.state = RunState::Failed;
        run.finished_at = Some(Utc::now());
        run
    }

    async fn score_with_retry(&self, features: &FeatureVector) -> Result<f64, ScoreError> {
        match self.score_once(features).await {
            Err(error) if error.is_transient() => {
                warn!(error = %error, "transient scoring failure, retrying once");
                self.score_once(features).await
            }
            result => result,
        }
    }

    async fn score_once(&self, features: &FeatureVector) -> Result<f64, ScoreError> {
        let timeout_ms = self.config.scoring_timeout_ms;
        match timeout(Duration::from_millis(timeout_ms), self.model.score(features)).await {
            Ok(result) => result,
            Err(_) => Err(ScoreError::Timeout { timeout_ms }),
        }
    }
}

/// Pre-stage check: cancellation first, then the transition guard. Returns
/// the failure reason when the stage must not start.
fn gate(run: &PipelineRun, stage: Stage, cancel: &CancelToken) -> Option<String> {
    if cancel.is_cancelled() {
        return Some("cancelled by caller".to_string());
    }
    if !run.can_enter(stage) {
        return Some("predecessor stage incomplete".to_string());
    }
    None
}
