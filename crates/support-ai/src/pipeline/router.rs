use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;

use super::intake::{ApplicationForm, DocumentExtraction};
use super::orchestrator::{RunId, RunState, Stage};
use super::repository::{AuditSink, RunRepository};
use super::service::{EvaluationService, EvaluationServiceError};

/// Inbound payload: the applicant form plus zero or more per-document
/// extraction results.
#[derive(Debug, Deserialize)]
pub struct EvaluationRequest {
    pub form: ApplicationForm,
    #[serde(default)]
    pub documents: Vec<DocumentExtraction>,
}

/// Router builder exposing HTTP endpoints for evaluation and status lookup.
pub fn evaluation_router<R, A>(service: Arc<EvaluationService<R, A>>) -> Router
where
    R: RunRepository + 'static,
    A: AuditSink + 'static,
{
    Router::new()
        .route(
            "/api/v1/applications/evaluate",
            post(evaluate_handler::<R, A>),
        )
        .route("/api/v1/applications/:run_id", get(status_handler::<R, A>))
        .with_state(service)
}

pub(crate) async fn evaluate_handler<R, A>(
    State(service): State<Arc<EvaluationService<R, A>>>,
    axum::Json(request): axum::Json<EvaluationRequest>,
) -> Response
where
    R: RunRepository + 'static,
    A: AuditSink + 'static,
{
    match service.evaluate(request.form, request.documents).await {
        Ok(report) => (StatusCode::OK, axum::Json(report)).into_response(),
        Err(EvaluationServiceError::RunFailed {
            run_id,
            stage,
            detail,
        }) => {
            // Extraction failures mean malformed inbound data; anything else
            // is an internal stage failure.
            let status = if stage == Stage::Extracting {
                StatusCode::UNPROCESSABLE_ENTITY
            } else {
                StatusCode::INTERNAL_SERVER_ERROR
            };
            let payload = json!({
                "run_id": run_id.0,
                "stage": stage.label(),
                "error": detail,
            });
            (status, axum::Json(payload)).into_response()
        }
        Err(other) => {
            let payload = json!({ "error": other.to_string() });
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
        }
    }
}

pub(crate) async fn status_handler<R, A>(
    State(service): State<Arc<EvaluationService<R, A>>>,
    Path(run_id): Path<String>,
) -> Response
where
    R: RunRepository + 'static,
    A: AuditSink + 'static,
{
    let id = RunId(run_id);
    match service.status(&id) {
        Ok(Some(view)) => (StatusCode::OK, axum::Json(view)).into_response(),
        Ok(None) => {
            let payload = json!({
                "run_id": id.0,
                "state": RunState::Created.label(),
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(other) => {
            let payload = json!({ "error": other.to_string() });
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
        }
    }
}
