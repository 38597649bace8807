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

use super::domain::{
    CommentId, DocumentId, NewComment, NewDocument, NewShare, NewVersion, ShareId, ShareView,
    VersionId,
};
use super::repository::{DocumentRepository, ShareRepository};
use super::sharing::{ShareError, ShareManager};
use super::store::{DocumentStore, StoreError};

/// Shared state for the documents router: the version store and the share
/// manager, cloned per request.
pub struct DocumentRoutes<R, S> {
    pub store: Arc<DocumentStore<R>>,
    pub shares: Arc<ShareManager<S>>,
}

impl<R, S> Clone for DocumentRoutes<R, S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            shares: self.shares.clone(),
        }
    }
}

/// Router builder exposing HTTP endpoints for documents and shares.
pub fn document_router<R, S>(routes: DocumentRoutes<R, S>) -> Router
where
    R: DocumentRepository + 'static,
    S: ShareRepository + 'static,
{
    Router::new()
        .route("/api/v1/documents", post(create_handler::<R, S>))
        .route("/api/v1/documents/:document_id", get(get_handler::<R, S>))
        .route(
            "/api/v1/documents/:document_id/versions",
            post(upload_handler::<R, S>).get(list_versions_handler::<R, S>),
        )
        .route(
            "/api/v1/documents/:document_id/versions/:version_id/restore",
            post(restore_handler::<R, S>),
        )
        .route(
            "/api/v1/documents/:document_id/archive",
            post(archive_handler::<R, S>),
        )
        .route(
            "/api/v1/documents/:document_id/comments",
            post(comment_handler::<R, S>),
        )
        .route(
            "/api/v1/documents/:document_id/comments/:comment_id/resolve",
            post(resolve_comment_handler::<R, S>),
        )
        .route(
            "/api/v1/documents/:document_id/shares",
            post(grant_share_handler::<R, S>).get(list_shares_handler::<R, S>),
        )
        .route(
            "/api/v1/shares/:share_id/revoke",
            post(revoke_share_handler::<R, S>),
        )
        .route(
            "/api/v1/shares/:share_id/access",
            post(share_access_handler::<R, S>),
        )
        .with_state(routes)
}

#[derive(Debug, Deserialize)]
pub(crate) struct RestoreRequest {
    pub restored_by: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ResolveCommentRequest {
    pub resolved_by: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RevokeShareRequest {
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ShareAccessRequest {
    #[serde(default)]
    pub password: Option<String>,
}

fn store_error_response(error: StoreError) -> Response {
    let status = match &error {
        StoreError::NotFound | StoreError::VersionNotFound(_) | StoreError::UnknownComment(_) => {
            StatusCode::NOT_FOUND
        }
        StoreError::InvalidContentType(_) => StatusCode::UNPROCESSABLE_ENTITY,
        StoreError::Archived
        | StoreError::CommentAlreadyResolved(_)
        | StoreError::ConcurrentModification => StatusCode::CONFLICT,
        StoreError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let payload = json!({
        "error": error.to_string(),
    });
    (status, axum::Json(payload)).into_response()
}

fn share_error_response(error: ShareError) -> Response {
    let status = match &error {
        ShareError::UnknownShare => StatusCode::NOT_FOUND,
        ShareError::Revoked | ShareError::Expired => StatusCode::GONE,
        ShareError::PasswordRequired => StatusCode::FORBIDDEN,
        ShareError::ConcurrentModification => StatusCode::CONFLICT,
        ShareError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let payload = json!({
        "error": error.to_string(),
    });
    (status, axum::Json(payload)).into_response()
}

pub(crate) async fn create_handler<R, S>(
    State(routes): State<DocumentRoutes<R, S>>,
    axum::Json(new): axum::Json<NewDocument>,
) -> Response
where
    R: DocumentRepository + 'static,
    S: ShareRepository + 'static,
{
    match routes.store.create(new, Utc::now()) {
        Ok(created) => (StatusCode::CREATED, axum::Json(created.record)).into_response(),
        Err(error) => store_error_response(error),
    }
}

pub(crate) async fn get_handler<R, S>(
    State(routes): State<DocumentRoutes<R, S>>,
    Path(document_id): Path<String>,
) -> Response
where
    R: DocumentRepository + 'static,
    S: ShareRepository + 'static,
{
    match routes.store.get(&DocumentId(document_id)) {
        Ok(found) => (StatusCode::OK, axum::Json(found.record)).into_response(),
        Err(error) => store_error_response(error),
    }
}

pub(crate) async fn upload_handler<R, S>(
    State(routes): State<DocumentRoutes<R, S>>,
    Path(document_id): Path<String>,
    axum::Json(new): axum::Json<NewVersion>,
) -> Response
where
    R: DocumentRepository + 'static,
    S: ShareRepository + 'static,
{
    match routes
        .store
        .upload_version(&DocumentId(document_id), new, Utc::now())
    {
        Ok(updated) => (StatusCode::CREATED, axum::Json(updated.record)).into_response(),
        Err(error) => store_error_response(error),
    }
}

pub(crate) async fn list_versions_handler<R, S>(
    State(routes): State<DocumentRoutes<R, S>>,
    Path(document_id): Path<String>,
) -> Response
where
    R: DocumentRepository + 'static,
    S: ShareRepository + 'static,
{
    match routes.store.list_versions(&DocumentId(document_id)) {
        Ok(versions) => (StatusCode::OK, axum::Json(versions)).into_response(),
        Err(error) => store_error_response(error),
    }
}

pub(crate) async fn restore_handler<R, S>(
    State(routes): State<DocumentRoutes<R, S>>,
    Path((document_id, version_id)): Path<(String, String)>,
    axum::Json(request): axum::Json<RestoreRequest>,
) -> Response
where
    R: DocumentRepository + 'static,
    S: ShareRepository + 'static,
{
    match routes.store.restore(
        &DocumentId(document_id),
        &VersionId(version_id),
        &request.restored_by,
        Utc::now(),
    ) {
        Ok(updated) => (StatusCode::OK, axum::Json(updated.record)).into_response(),
        Err(error) => store_error_response(error),
    }
}

pub(crate) async fn archive_handler<R, S>(
    State(routes): State<DocumentRoutes<R, S>>,
    Path(document_id): Path<String>,
) -> Response
where
    R: DocumentRepository + 'static,
    S: ShareRepository + 'static,
{
    match routes.store.archive(&DocumentId(document_id)) {
        Ok(updated) => (StatusCode::OK, axum::Json(updated.record)).into_response(),
        Err(error) => store_error_response(error),
    }
}

pub(crate) async fn comment_handler<R, S>(
    State(routes): State<DocumentRoutes<R, S>>,
    Path(document_id): Path<String>,
    axum::Json(new): axum::Json<NewComment>,
) -> Response
where
    R: DocumentRepository + 'static,
    S: ShareRepository + 'static,
{
    match routes
        .store
        .add_comment(&DocumentId(document_id), new, Utc::now())
    {
        Ok(comment) => (StatusCode::CREATED, axum::Json(comment)).into_response(),
        Err(error) => store_error_response(error),
    }
}

pub(crate) async fn resolve_comment_handler<R, S>(
    State(routes): State<DocumentRoutes<R, S>>,
    Path((document_id, comment_id)): Path<(String, String)>,
    axum::Json(request): axum::Json<ResolveCommentRequest>,
) -> Response
where
    R: DocumentRepository + 'static,
    S: ShareRepository + 'static,
{
    match routes.store.resolve_comment(
        &DocumentId(document_id),
        &CommentId(comment_id),
        &request.resolved_by,
        Utc::now(),
    ) {
        Ok(comment) => (StatusCode::OK, axum::Json(comment)).into_response(),
        Err(error) => store_error_response(error),
    }
}

pub(crate) async fn grant_share_handler<R, S>(
    State(routes): State<DocumentRoutes<R, S>>,
    Path(document_id): Path<String>,
    axum::Json(new): axum::Json<NewShare>,
) -> Response
where
    R: DocumentRepository + 'static,
    S: ShareRepository + 'static,
{
    let document = DocumentId(document_id);
    // The grant must point at a real document.
    if let Err(error) = routes.store.get(&document) {
        return store_error_response(error);
    }
    match routes.shares.grant(&document, new, Utc::now()) {
        Ok(granted) => {
            let view = ShareView::of(&granted.record);
            (StatusCode::CREATED, axum::Json(view)).into_response()
        }
        Err(error) => share_error_response(error),
    }
}

pub(crate) async fn list_shares_handler<R, S>(
    State(routes): State<DocumentRoutes<R, S>>,
    Path(document_id): Path<String>,
) -> Response
where
    R: DocumentRepository + 'static,
    S: ShareRepository + 'static,
{
    match routes.shares.list_for_document(&DocumentId(document_id)) {
        Ok(shares) => {
            let views: Vec<ShareView> = shares
                .iter()
                .map(|versioned| ShareView::of(&versioned.record))
                .collect();
            (StatusCode::OK, axum::Json(views)).into_response()
        }
        Err(error) => share_error_response(error),
    }
}

pub(crate) async fn revoke_share_handler<R, S>(
    State(routes): State<DocumentRoutes<R, S>>,
    Path(share_id): Path<String>,
    axum::Json(request): axum::Json<RevokeShareRequest>,
) -> Response
where
    R: DocumentRepository + 'static,
    S: ShareRepository + 'static,
{
    match routes
        .shares
        .revoke(&ShareId(share_id), request.reason, Utc::now())
    {
        Ok(revoked) => {
            let view = ShareView::of(&revoked.record);
            (StatusCode::OK, axum::Json(view)).into_response()
        }
        Err(error) => share_error_response(error),
    }
}

pub(crate) async fn share_access_handler<R, S>(
    State(routes): State<DocumentRoutes<R, S>>,
    Path(share_id): Path<String>,
    axum::Json(request): axum::Json<ShareAccessRequest>,
) -> Response
where
    R: DocumentRepository + 'static,
    S: ShareRepository + 'static,
{
    match routes.shares.check_access(
        &ShareId(share_id),
        request.password.as_deref(),
        Utc::now(),
    ) {
        Ok(access) => (StatusCode::OK, axum::Json(access)).into_response(),
        Err(error) => share_error_response(error),
    }
}
