use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use super::domain::{NewWorkflow, StepAction, StepId, WorkflowId};
use super::engine::{ApprovalEngine, WorkflowError};
use super::repository::WorkflowRepository;

/// Router builder exposing HTTP endpoints for approval workflows.
pub fn approval_router<R>(engine: Arc<ApprovalEngine<R>>) -> Router
where
    R: WorkflowRepository + 'static,
{
    Router::new()
        .route("/api/v1/workflows", post(start_handler::<R>))
        .route("/api/v1/workflows/:workflow_id", get(get_handler::<R>))
        .route(
            "/api/v1/workflows/steps/:step_id/complete",
            post(complete_step_handler::<R>),
        )
        .with_state(engine)
}

#[derive(Debug, Deserialize)]
pub(crate) struct CompleteStepRequest {
    pub action: StepAction,
    pub comments: Option<String>,
    pub actor: String,
}

fn error_response(error: WorkflowError) -> Response {
    let status = match &error {
        WorkflowError::UnknownWorkflow | WorkflowError::UnknownStep(_) => StatusCode::NOT_FOUND,
        WorkflowError::EmptyWorkflow | WorkflowError::MissingAssignee { .. } => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        WorkflowError::StepAlreadyResolved(_)
        | WorkflowError::StepNotActionable(_)
        | WorkflowError::ConcurrentModification => StatusCode::CONFLICT,
        WorkflowError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let payload = json!({
        "error": error.to_string(),
    });
    (status, axum::Json(payload)).into_response()
}

pub(crate) async fn start_handler<R>(
    State(engine): State<Arc<ApprovalEngine<R>>>,
    axum::Json(new): axum::Json<NewWorkflow>,
) -> Response
where
    R: WorkflowRepository + 'static,
{
    match engine.start(new, Utc::now()) {
        Ok(started) => (StatusCode::CREATED, axum::Json(started.record)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn get_handler<R>(
    State(engine): State<Arc<ApprovalEngine<R>>>,
    Path(workflow_id): Path<String>,
) -> Response
where
    R: WorkflowRepository + 'static,
{
    match engine.get(&WorkflowId(workflow_id)) {
        Ok(found) => (StatusCode::OK, axum::Json(found.record)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn complete_step_handler<R>(
    State(engine): State<Arc<ApprovalEngine<R>>>,
    Path(step_id): Path<String>,
    axum::Json(request): axum::Json<CompleteStepRequest>,
) -> Response
where
    R: WorkflowRepository + 'static,
{
    match engine.complete_step(
        &StepId(step_id),
        request.action,
        request.comments,
        &request.actor,
        Utc::now(),
    ) {
        Ok(updated) => (StatusCode::OK, axum::Json(updated.record)).into_response(),
        Err(error) => error_response(error),
    }
}
