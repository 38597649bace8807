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

use crate::approvals::{CompletionPolicy, NewStep, WorkflowError, WorkflowRepository};
use crate::documents::repository::DocumentRepository;

use super::domain::{FeeKind, NewSubmission, ProjectId, StatusUpdate, SubmissionId};
use super::repository::{SubmissionRepository, SubmissionView};
use super::service::{LifecycleError, SubmissionLifecycle};

/// Router builder exposing HTTP endpoints for the submission lifecycle.
pub fn submission_router<S, D, W>(service: Arc<SubmissionLifecycle<S, D, W>>) -> Router
where
    S: SubmissionRepository + 'static,
    D: DocumentRepository + 'static,
    W: WorkflowRepository + 'static,
{
    Router::new()
        .route("/api/v1/submissions", post(create_handler::<S, D, W>))
        .route(
            "/api/v1/submissions/:submission_id",
            get(get_handler::<S, D, W>),
        )
        .route(
            "/api/v1/submissions/:submission_id/submit",
            post(submit_handler::<S, D, W>),
        )
        .route(
            "/api/v1/submissions/:submission_id/status",
            post(status_handler::<S, D, W>),
        )
        .route(
            "/api/v1/submissions/:submission_id/withdraw",
            post(withdraw_handler::<S, D, W>),
        )
        .route(
            "/api/v1/submissions/:submission_id/expire",
            post(expire_handler::<S, D, W>),
        )
        .route(
            "/api/v1/submissions/:submission_id/fees/pay",
            post(pay_fee_handler::<S, D, W>),
        )
        .route(
            "/api/v1/submissions/:submission_id/fees/waive",
            post(waive_fee_handler::<S, D, W>),
        )
        .route(
            "/api/v1/submissions/:submission_id/review",
            post(begin_review_handler::<S, D, W>),
        )
        .route(
            "/api/v1/submissions/:submission_id/reviews",
            get(review_history_handler::<S, D, W>),
        )
        .route(
            "/api/v1/projects/:project_id/submissions",
            get(project_listing_handler::<S, D, W>),
        )
        .with_state(service)
}

#[derive(Debug, Deserialize)]
pub(crate) struct SubmitRequest {
    pub actor: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StatusUpdateRequest {
    #[serde(flatten)]
    pub update: StatusUpdate,
    pub actor: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WithdrawRequest {
    pub actor: String,
    #[serde(default)]
    pub comments: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ExpireRequest {
    pub actor: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PayFeeRequest {
    pub kind: FeeKind,
    #[serde(default)]
    pub reference: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WaiveFeeRequest {
    pub kind: FeeKind,
    pub reason: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct BeginReviewRequest {
    pub policy: CompletionPolicy,
    pub steps: Vec<NewStep>,
    pub started_by: String,
}

fn error_response(error: LifecycleError) -> Response {
    if let LifecycleError::Validation(validation) = &error {
        let issues: Vec<_> = validation
            .issues
            .iter()
            .map(|issue| {
                json!({
                    "field": issue.field,
                    "problem": issue.problem,
                })
            })
            .collect();
        let payload = json!({
            "error": validation.to_string(),
            "issues": issues,
        });
        return (StatusCode::UNPROCESSABLE_ENTITY, axum::Json(payload)).into_response();
    }

    let status = match &error {
        LifecycleError::NotFound | LifecycleError::UnknownFee(_) => StatusCode::NOT_FOUND,
        LifecycleError::Validation(_) | LifecycleError::Incomplete { .. } => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        LifecycleError::InvalidTransition { .. }
        | LifecycleError::ReviewPending { .. }
        | LifecycleError::ReviewNotStartable { .. }
        | LifecycleError::NotYetOverdue
        | LifecycleError::FeeAlreadySettled(_)
        | LifecycleError::ConcurrentModification => StatusCode::CONFLICT,
        LifecycleError::Review(review) => match review {
            WorkflowError::UnknownWorkflow | WorkflowError::UnknownStep(_) => StatusCode::NOT_FOUND,
            WorkflowError::EmptyWorkflow | WorkflowError::MissingAssignee { .. } => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            WorkflowError::StepAlreadyResolved(_)
            | WorkflowError::StepNotActionable(_)
            | WorkflowError::ConcurrentModification => StatusCode::CONFLICT,
            WorkflowError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        },
        LifecycleError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let payload = json!({
        "error": error.to_string(),
    });
    (status, axum::Json(payload)).into_response()
}

pub(crate) async fn create_handler<S, D, W>(
    State(service): State<Arc<SubmissionLifecycle<S, D, W>>>,
    axum::Json(new): axum::Json<NewSubmission>,
) -> Response
where
    S: SubmissionRepository + 'static,
    D: DocumentRepository + 'static,
    W: WorkflowRepository + 'static,
{
    let now = Utc::now();
    match service.create(new, now) {
        Ok(created) => {
            let view = SubmissionView::of(&created.record, now.date_naive());
            (StatusCode::CREATED, axum::Json(view)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn get_handler<S, D, W>(
    State(service): State<Arc<SubmissionLifecycle<S, D, W>>>,
    Path(submission_id): Path<String>,
) -> Response
where
    S: SubmissionRepository + 'static,
    D: DocumentRepository + 'static,
    W: WorkflowRepository + 'static,
{
    match service.get(&SubmissionId(submission_id)) {
        Ok(found) => {
            let view = SubmissionView::of(&found.record, Utc::now().date_naive());
            (StatusCode::OK, axum::Json(view)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn submit_handler<S, D, W>(
    State(service): State<Arc<SubmissionLifecycle<S, D, W>>>,
    Path(submission_id): Path<String>,
    axum::Json(request): axum::Json<SubmitRequest>,
) -> Response
where
    S: SubmissionRepository + 'static,
    D: DocumentRepository + 'static,
    W: WorkflowRepository + 'static,
{
    let now = Utc::now();
    match service.submit(&SubmissionId(submission_id), &request.actor, now) {
        Ok(updated) => {
            let view = SubmissionView::of(&updated.record, now.date_naive());
            (StatusCode::OK, axum::Json(view)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn status_handler<S, D, W>(
    State(service): State<Arc<SubmissionLifecycle<S, D, W>>>,
    Path(submission_id): Path<String>,
    axum::Json(request): axum::Json<StatusUpdateRequest>,
) -> Response
where
    S: SubmissionRepository + 'static,
    D: DocumentRepository + 'static,
    W: WorkflowRepository + 'static,
{
    let now = Utc::now();
    match service.update_status(
        &SubmissionId(submission_id),
        request.update,
        &request.actor,
        now,
    ) {
        Ok(updated) => {
            let view = SubmissionView::of(&updated.record, now.date_naive());
            (StatusCode::OK, axum::Json(view)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn withdraw_handler<S, D, W>(
    State(service): State<Arc<SubmissionLifecycle<S, D, W>>>,
    Path(submission_id): Path<String>,
    axum::Json(request): axum::Json<WithdrawRequest>,
) -> Response
where
    S: SubmissionRepository + 'static,
    D: DocumentRepository + 'static,
    W: WorkflowRepository + 'static,
{
    let now = Utc::now();
    match service.withdraw(
        &SubmissionId(submission_id),
        &request.actor,
        request.comments,
        now,
    ) {
        Ok(updated) => {
            let view = SubmissionView::of(&updated.record, now.date_naive());
            (StatusCode::OK, axum::Json(view)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn expire_handler<S, D, W>(
    State(service): State<Arc<SubmissionLifecycle<S, D, W>>>,
    Path(submission_id): Path<String>,
    axum::Json(request): axum::Json<ExpireRequest>,
) -> Response
where
    S: SubmissionRepository + 'static,
    D: DocumentRepository + 'static,
    W: WorkflowRepository + 'static,
{
    let now = Utc::now();
    match service.expire(&SubmissionId(submission_id), &request.actor, now) {
        Ok(updated) => {
            let view = SubmissionView::of(&updated.record, now.date_naive());
            (StatusCode::OK, axum::Json(view)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn pay_fee_handler<S, D, W>(
    State(service): State<Arc<SubmissionLifecycle<S, D, W>>>,
    Path(submission_id): Path<String>,
    axum::Json(request): axum::Json<PayFeeRequest>,
) -> Response
where
    S: SubmissionRepository + 'static,
    D: DocumentRepository + 'static,
    W: WorkflowRepository + 'static,
{
    let now = Utc::now();
    match service.record_fee_payment(
        &SubmissionId(submission_id),
        request.kind,
        request.reference,
        now,
    ) {
        Ok(updated) => {
            let view = SubmissionView::of(&updated.record, now.date_naive());
            (StatusCode::OK, axum::Json(view)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn waive_fee_handler<S, D, W>(
    State(service): State<Arc<SubmissionLifecycle<S, D, W>>>,
    Path(submission_id): Path<String>,
    axum::Json(request): axum::Json<WaiveFeeRequest>,
) -> Response
where
    S: SubmissionRepository + 'static,
    D: DocumentRepository + 'static,
    W: WorkflowRepository + 'static,
{
    let now = Utc::now();
    match service.waive_fee(&SubmissionId(submission_id), request.kind, request.reason, now) {
        Ok(updated) => {
            let view = SubmissionView::of(&updated.record, now.date_naive());
            (StatusCode::OK, axum::Json(view)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn begin_review_handler<S, D, W>(
    State(service): State<Arc<SubmissionLifecycle<S, D, W>>>,
    Path(submission_id): Path<String>,
    axum::Json(request): axum::Json<BeginReviewRequest>,
) -> Response
where
    S: SubmissionRepository + 'static,
    D: DocumentRepository + 'static,
    W: WorkflowRepository + 'static,
{
    match service.begin_internal_review(
        &SubmissionId(submission_id),
        request.policy,
        request.steps,
        &request.started_by,
        Utc::now(),
    ) {
        Ok(started) => (StatusCode::CREATED, axum::Json(started.record)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn review_history_handler<S, D, W>(
    State(service): State<Arc<SubmissionLifecycle<S, D, W>>>,
    Path(submission_id): Path<String>,
) -> Response
where
    S: SubmissionRepository + 'static,
    D: DocumentRepository + 'static,
    W: WorkflowRepository + 'static,
{
    match service.review_history(&SubmissionId(submission_id)) {
        Ok(instances) => {
            let records: Vec<_> = instances
                .into_iter()
                .map(|versioned| versioned.record)
                .collect();
            (StatusCode::OK, axum::Json(records)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn project_listing_handler<S, D, W>(
    State(service): State<Arc<SubmissionLifecycle<S, D, W>>>,
    Path(project_id): Path<String>,
) -> Response
where
    S: SubmissionRepository + 'static,
    D: DocumentRepository + 'static,
    W: WorkflowRepository + 'static,
{
    let today = Utc::now().date_naive();
    match service.list_for_project(&ProjectId(project_id)) {
        Ok(submissions) => {
            let views: Vec<_> = submissions
                .iter()
                .map(|versioned| SubmissionView::of(&versioned.record, today))
                .collect();
            (StatusCode::OK, axum::Json(views)).into_response()
        }
        Err(error) => error_response(error),
    }
}
