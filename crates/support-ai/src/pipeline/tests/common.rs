use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};

use crate::pipeline::config::PipelineConfig;
use crate::pipeline::domain::{FieldName, FieldValue, Observation, SourceKind};
use crate::pipeline::features::FeatureVector;
use crate::pipeline::intake::{ApplicationForm, DocumentExtraction, ExtractedField};
use crate::pipeline::orchestrator::{Orchestrator, PipelineRun, RunId};
use crate::pipeline::repository::{
    AuditError, AuditSink, RepositoryError, RunRepository,
};
use crate::pipeline::scoring::{ScoreError, ScoreModel};
use crate::pipeline::service::EvaluationService;

pub(super) fn observed_at(offset_minutes: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0)
        .single()
        .expect("valid timestamp")
        + chrono::Duration::minutes(offset_minutes)
}

pub(super) fn config() -> PipelineConfig {
    PipelineConfig::default()
}

pub(super) fn observation(
    field: FieldName,
    value: FieldValue,
    source: SourceKind,
    confidence: u8,
    offset_minutes: i64,
) -> Observation {
    Observation {
        field,
        value,
        source,
        source_confidence: confidence,
        observed_at: observed_at(offset_minutes),
    }
}

pub(super) fn form_fields(
    monthly_income: f64,
    employment_months: u32,
) -> BTreeMap<FieldName, FieldValue> {
    BTreeMap::from([
        (
            FieldName::FullName,
            FieldValue::Text("Amina Hassan".to_string()),
        ),
        (
            FieldName::DateOfBirth,
            FieldValue::Text("1988-04-12".to_string()),
        ),
        (
            FieldName::Email,
            FieldValue::Text("amina.hassan@example.net".to_string()),
        ),
        (
            FieldName::Phone,
            FieldValue::Text("+971-50-123-4567".to_string()),
        ),
        (
            FieldName::Address,
            FieldValue::Text("12 Palm Street, Al Ain".to_string()),
        ),
        (FieldName::MonthlyIncome, FieldValue::Number(monthly_income)),
        (
            FieldName::MonthlyObligations,
            FieldValue::Number(monthly_income * 0.2),
        ),
        (
            FieldName::EmploymentLengthMonths,
            FieldValue::Count(employment_months),
        ),
        (
            FieldName::Employer,
            FieldValue::Text("Gulf Logistics LLC".to_string()),
        ),
        (FieldName::FamilySize, FieldValue::Count(4)),
        (FieldName::Dependents, FieldValue::Count(2)),
    ])
}

pub(super) fn form(monthly_income: f64, employment_months: u32) -> ApplicationForm {
    ApplicationForm {
        submitted_at: observed_at(0),
        fields: form_fields(monthly_income, employment_months),
    }
}

pub(super) fn bank_statement(monthly_income: f64) -> DocumentExtraction {
    DocumentExtraction {
        document_id: "doc-bank-001".to_string(),
        source: SourceKind::BankStatement,
        extracted_at: observed_at(5),
        fields: vec![
            ExtractedField {
                field: FieldName::MonthlyIncome,
                value: FieldValue::Number(monthly_income),
                confidence: 90,
            },
            ExtractedField {
                field: FieldName::MonthlyObligations,
                value: FieldValue::Number(monthly_income * 0.2),
                confidence: 85,
            },
        ],
    }
}

pub(super) fn government_id() -> DocumentExtraction {
    DocumentExtraction {
        document_id: "doc-id-001".to_string(),
        source: SourceKind::GovernmentId,
        extracted_at: observed_at(3),
        fields: vec![
            ExtractedField {
                field: FieldName::FullName,
                value: FieldValue::Text("Amina Hassan".to_string()),
                confidence: 95,
            },
            ExtractedField {
                field: FieldName::DateOfBirth,
                value: FieldValue::Text("1988-04-12".to_string()),
                confidence: 95,
            },
        ],
    }
}

#[derive(Debug)]
pub(super) struct FixedScoreModel {
    fixed: f64,
    pub(super) calls: AtomicUsize,
}

impl FixedScoreModel {
    pub(super) fn new(fixed: f64) -> Self {
        Self {
            fixed,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl ScoreModel for FixedScoreModel {
    async fn score(&self, _features: &FeatureVector) -> Result<f64, ScoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.fixed)
    }
}

#[derive(Debug, Default)]
pub(super) struct UnavailableScoreModel {
    pub(super) calls: AtomicUsize,
}

#[async_trait]
impl ScoreModel for UnavailableScoreModel {
    async fn score(&self, _features: &FeatureVector) -> Result<f64, ScoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(ScoreError::Unavailable("model endpoint offline".to_string()))
    }
}

#[derive(Debug)]
pub(super) struct SlowScoreModel {
    pub(super) delay_ms: u64,
}

#[async_trait]
impl ScoreModel for SlowScoreModel {
    async fn score(&self, _features: &FeatureVector) -> Result<f64, ScoreError> {
        tokio::time::sleep(Duration::from_millis(self.delay_ms)).await;
        Ok(0.9)
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryRuns {
    runs: Arc<Mutex<HashMap<RunId, PipelineRun>>>,
}

impl RunRepository for MemoryRuns {
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

#[derive(Default, Clone)]
pub(super) struct MemoryAudit {
    published: Arc<Mutex<Vec<PipelineRun>>>,
}

impl MemoryAudit {
    pub(super) fn published(&self) -> Vec<PipelineRun> {
        self.published.lock().expect("audit mutex poisoned").clone()
    }
}

impl AuditSink for MemoryAudit {
    fn publish(&self, run: &PipelineRun) -> Result<(), AuditError> {
        self.published
            .lock()
            .expect("audit mutex poisoned")
            .push(run.clone());
        Ok(())
    }
}

pub(super) fn orchestrator(model: Arc<dyn ScoreModel>) -> Orchestrator {
    Orchestrator::new(config(), model)
}

pub(super) fn orchestrator_with_timeout(model: Arc<dyn ScoreModel>, timeout_ms: u64) -> Orchestrator {
    let config = PipelineConfig {
        scoring_timeout_ms: timeout_ms,
        ..PipelineConfig::default()
    };
    Orchestrator::new(config, model)
}

pub(super) fn build_service(
    model: Arc<dyn ScoreModel>,
) -> (
    EvaluationService<MemoryRuns, MemoryAudit>,
    Arc<MemoryRuns>,
    Arc<MemoryAudit>,
) {
    let repository = Arc::new(MemoryRuns::default());
    let audit = Arc::new(MemoryAudit::default());
    let service = EvaluationService::new(repository.clone(), audit.clone(), model, config());
    (service, repository, audit)
}
