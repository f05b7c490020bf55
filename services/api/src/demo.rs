use crate::infra::{
    pipeline_config, HeuristicScoreModel, InMemoryRunRepository, LoggingAuditSink,
};
use chrono::Utc;
use clap::Args;
use std::collections::BTreeMap;
use std::sync::Arc;
use support_ai::config::AppConfig;
use support_ai::error::AppError;
use support_ai::pipeline::{
    ApplicationForm, DocumentExtraction, EvaluationService, ExtractedField, FieldName, FieldValue,
    SourceKind,
};

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Evaluate the sample application without any supporting documents.
    #[arg(long)]
    pub(crate) form_only: bool,
    /// Monthly income declared on the sample form.
    #[arg(long, default_value_t = 62_000.0)]
    pub(crate) monthly_income: f64,
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;

    let repository = Arc::new(InMemoryRunRepository::default());
    let audit = Arc::new(LoggingAuditSink);
    let model = Arc::new(HeuristicScoreModel);
    let service = EvaluationService::new(
        repository,
        audit,
        model,
        pipeline_config(config.scoring.timeout_ms),
    );

    let form = sample_form(args.monthly_income);
    let documents = if args.form_only {
        Vec::new()
    } else {
        sample_documents(args.monthly_income)
    };

    println!("Social support evaluation demo");
    println!(
        "Declared monthly income: {:.0} ({} supporting document(s))",
        args.monthly_income,
        documents.len()
    );

    let report = service.evaluate(form, documents).await?;

    println!("\nRun {}", report.run_id);
    println!(
        "Decision: {} (confidence {:.2}{})",
        report.decision.classification.label(),
        report.decision.confidence,
        if report.decision.degraded {
            ", degraded"
        } else {
            ""
        }
    );
    println!(
        "Validation score: {:.1} (risk {})",
        report.record.validation_score,
        report.record.risk_level.label()
    );

    if !report.decision.rules_fired.is_empty() {
        println!("\nRules fired:");
        for firing in &report.decision.rules_fired {
            println!("  - {}: {}", firing.rule_id, firing.detail);
        }
    }

    println!("\nTop factors:");
    for entry in report.decision.reason_trace.iter().take(3) {
        println!("  - {} ({:+.3})", entry.label, entry.contribution);
    }

    println!(
        "\nRecommendations ({}):",
        report.recommendations.category.label()
    );
    for action in &report.recommendations.actions {
        println!("  - [{}] {}", action.category.label(), action.action);
    }

    println!("\nStage statuses:");
    for (stage, status) in &report.stage_statuses {
        println!("  - {}: {:?}", stage.label(), status);
    }

    Ok(())
}

fn sample_form(monthly_income: f64) -> ApplicationForm {
    ApplicationForm {
        submitted_at: Utc::now(),
        fields: BTreeMap::from([
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
                FieldValue::Number(monthly_income * 0.25),
            ),
            (FieldName::EmploymentLengthMonths, FieldValue::Count(30)),
            (
                FieldName::Employer,
                FieldValue::Text("Gulf Logistics LLC".to_string()),
            ),
            (FieldName::FamilySize, FieldValue::Count(4)),
            (FieldName::Dependents, FieldValue::Count(2)),
        ]),
    }
}

fn sample_documents(monthly_income: f64) -> Vec<DocumentExtraction> {
    vec![
        DocumentExtraction {
            document_id: "demo-id-001".to_string(),
            source: SourceKind::GovernmentId,
            extracted_at: Utc::now(),
            fields: vec![
                ExtractedField {
                    field: FieldName::FullName,
                    value: FieldValue::Text("Amina Hassan".to_string()),
                    confidence: 95,
                },
                ExtractedField {
                    field: FieldName::Address,
                    // the ID still carries the previous address
                    value: FieldValue::Text("7 Corniche Road, Abu Dhabi".to_string()),
                    confidence: 88,
                },
            ],
        },
        DocumentExtraction {
            document_id: "demo-bank-001".to_string(),
            source: SourceKind::BankStatement,
            extracted_at: Utc::now(),
            fields: vec![ExtractedField {
                field: FieldName::MonthlyIncome,
                value: FieldValue::Number(monthly_income),
                confidence: 90,
            }],
        },
    ]
}
