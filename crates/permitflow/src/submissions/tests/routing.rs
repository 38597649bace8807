use super::common::*;

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use chrono::Utc;
use serde_json::json;
use tower::ServiceExt;

use crate::directory::{AuthorityDirectory, AuthorityId};
use crate::submissions::domain::{AuthorityStatus, FeeKind, StatusUpdate};
use crate::submissions::router::{
    self, submission_router, ExpireRequest, PayFeeRequest, StatusUpdateRequest, SubmitRequest,
};
use crate::submissions::service::SubmissionLifecycle;

#[tokio::test]
async fn create_route_returns_a_draft_view() {
    let (service, _, _, _) = build_lifecycle();
    let router = submission_router(service);

    let response = router
        .oneshot(
            axum::http::Request::post("/api/v1/submissions")
                .header(axum::http::header::CONTENT_TYPE, "application/json")
                .body(axum::body::Body::from(
                    serde_json::to_vec(&draft_request()).expect("serializes"),
                ))
                .expect("request builds"),
        )
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::CREATED);
    let payload = read_json_body(response).await;
    assert_eq!(payload.get("status"), Some(&json!("draft")));
    assert_eq!(payload.get("total_amount"), Some(&json!("0")));
    assert!(payload
        .get("internal_reference")
        .and_then(serde_json::Value::as_str)
        .unwrap_or_default()
        .starts_with("SUB-"));
}

#[tokio::test]
async fn create_handler_reports_validation_issues() {
    let (service, _, _, _) = build_lifecycle();

    let mut request = draft_request();
    request.authority_id = AuthorityId("nowhere".to_string());

    let response = router::create_handler::<MemorySubmissions, MemoryDocuments, MemoryWorkflows>(
        State(service),
        axum::Json(request),
    )
    .await;

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let payload = read_json_body(response).await;
    let issues = payload
        .get("issues")
        .and_then(serde_json::Value::as_array)
        .expect("issues array");
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].get("field"), Some(&json!("authority_id")));
}

#[tokio::test]
async fn get_handler_returns_not_found_for_missing_records() {
    let (service, _, _, _) = build_lifecycle();

    let response = router::get_handler::<MemorySubmissions, MemoryDocuments, MemoryWorkflows>(
        State(service),
        Path("sub-missing".to_string()),
    )
    .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn submit_handler_maps_missing_documents_to_unprocessable() {
    let (service, _, _, _) = build_lifecycle();
    let created = service
        .create(draft_request(), at(creation_day(), 9))
        .expect("draft created");

    let response = router::submit_handler::<MemorySubmissions, MemoryDocuments, MemoryWorkflows>(
        State(service),
        Path(created.record.id.0.clone()),
        axum::Json(SubmitRequest {
            actor: "arch.lee".to_string(),
        }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let payload = read_json_body(response).await;
    assert!(payload
        .get("error")
        .and_then(serde_json::Value::as_str)
        .unwrap_or_default()
        .contains("required documents missing"));
}

#[tokio::test]
async fn status_handler_maps_rejected_transitions_to_conflict() {
    let (service, _, _, _) = build_lifecycle();
    let created = service
        .create(draft_request(), at(creation_day(), 9))
        .expect("draft created");

    let response = router::status_handler::<MemorySubmissions, MemoryDocuments, MemoryWorkflows>(
        State(service),
        Path(created.record.id.0.clone()),
        axum::Json(StatusUpdateRequest {
            update: StatusUpdate {
                status: AuthorityStatus::Approved,
                comments: None,
                submission_number: None,
            },
            actor: "mbpj-gateway".to_string(),
        }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn expire_handler_maps_premature_calls_to_conflict() {
    let (service, _, documents, _) = build_lifecycle();
    // The handler reads the wall clock, so the fixture must live on it too:
    // a submission created and submitted now is well inside its window.
    let created = service
        .create(draft_request(), Utc::now())
        .expect("draft created");
    let id = created.record.id.clone();
    attach_required_documents(&documents, &id, &created.record.category_id);
    service
        .submit(&id, "arch.lee", Utc::now())
        .expect("submit succeeds");

    let response = router::expire_handler::<MemorySubmissions, MemoryDocuments, MemoryWorkflows>(
        State(service),
        Path(id.0.clone()),
        axum::Json(ExpireRequest {
            actor: "scheduler".to_string(),
        }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn pay_handler_maps_absent_fee_lines_to_not_found() {
    let (service, _, documents, _) = build_lifecycle();
    let created = service
        .create(draft_request(), at(creation_day(), 9))
        .expect("draft created");
    let id = created.record.id.clone();
    attach_required_documents(&documents, &id, &created.record.category_id);
    service
        .submit(&id, "arch.lee", at(creation_day(), 10))
        .expect("submit succeeds");

    let response = router::pay_fee_handler::<MemorySubmissions, MemoryDocuments, MemoryWorkflows>(
        State(service),
        Path(id.0.clone()),
        axum::Json(PayFeeRequest {
            kind: FeeKind::Expedite,
            reference: None,
        }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn storage_outages_surface_as_internal_errors() {
    let service = Arc::new(SubmissionLifecycle::new(
        Arc::new(UnavailableSubmissions),
        Arc::new(MemoryDocuments::default()),
        Arc::new(MemoryWorkflows::default()),
        Arc::new(AuthorityDirectory::builtin()),
    ));

    let response = router::get_handler::<UnavailableSubmissions, MemoryDocuments, MemoryWorkflows>(
        State(service),
        Path("sub-any".to_string()),
    )
    .await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn the_router_serves_a_full_submit_round_trip() {
    let (service, _, documents, _) = build_lifecycle();
    let router = submission_router(service.clone());

    // The submit route stamps the wall-clock date; creating the draft on the
    // same clock keeps the submission inside its grace window.
    let created = service
        .create(draft_request(), Utc::now())
        .expect("draft created");
    let id = created.record.id.clone();
    attach_required_documents(&documents, &id, &created.record.category_id);

    let response = router
        .clone()
        .oneshot(
            axum::http::Request::post(format!("/api/v1/submissions/{}/submit", id.0))
                .header(axum::http::header::CONTENT_TYPE, "application/json")
                .body(axum::body::Body::from(
                    serde_json::to_vec(&json!({"actor": "arch.lee"})).expect("serializes"),
                ))
                .expect("request builds"),
        )
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload.get("status"), Some(&json!("submitted")));
    assert_eq!(payload.get("total_amount"), Some(&json!("300.00")));

    let listing = router
        .oneshot(
            axum::http::Request::get(format!(
                "/api/v1/projects/{}/submissions",
                created.record.project_id.0
            ))
            .body(axum::body::Body::empty())
            .expect("request builds"),
        )
        .await
        .expect("route executes");

    assert_eq!(listing.status(), StatusCode::OK);
    let payload = read_json_body(listing).await;
    let entries = payload.as_array().expect("array payload");
    assert_eq!(entries.len(), 1);
}
