use crate::infra::{deserialize_date, deserialize_optional_date, AppState};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Extension;
use axum::Json;
use chrono::NaiveDate;
use permitflow::approvals::{approval_router, ApprovalEngine, WorkflowRepository};
use permitflow::calendar::project_completion_date;
use permitflow::directory::{AuthorityDirectory, AuthorityId, CategoryId};
use permitflow::documents::{document_router, DocumentRepository, DocumentRoutes, ShareRepository};
use permitflow::submissions::{
    calculate_fees, submission_router, total_amount, FeeContext, SubmissionFee,
    SubmissionLifecycle, SubmissionRepository,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub(crate) struct FeeQuoteRequest {
    pub(crate) authority: String,
    pub(crate) category: String,
    #[serde(deserialize_with = "deserialize_date")]
    pub(crate) created_on: NaiveDate,
    /// Defaults to `created_on`, pricing an on-time submission.
    #[serde(default, deserialize_with = "deserialize_optional_date")]
    pub(crate) submission_date: Option<NaiveDate>,
    #[serde(default)]
    pub(crate) expedited: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct FeeQuoteResponse {
    pub(crate) authority: String,
    pub(crate) category: String,
    pub(crate) currency: String,
    pub(crate) processing_days: u32,
    pub(crate) submission_date: NaiveDate,
    pub(crate) expected_completion_date: NaiveDate,
    pub(crate) fees: Vec<SubmissionFee>,
    pub(crate) total_amount: Decimal,
}

pub(crate) fn with_api_routes<S, D, W, P>(
    lifecycle: Arc<SubmissionLifecycle<S, D, W>>,
    documents: DocumentRoutes<D, P>,
    engine: Arc<ApprovalEngine<W>>,
) -> axum::Router
where
    S: SubmissionRepository + 'static,
    D: DocumentRepository + 'static,
    W: WorkflowRepository + 'static,
    P: ShareRepository + 'static,
{
    submission_router(lifecycle)
        .merge(document_router(documents))
        .merge(approval_router(engine))
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
        .route(
            "/api/v1/fees/quote",
            axum::routing::post(fee_quote_endpoint),
        )
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

/// Prices a hypothetical submission without creating one. The same schedule
/// and projection rules run at submit time, so a quote matches the fees a
/// real submission would carry.
pub(crate) async fn fee_quote_endpoint(
    Extension(directory): Extension<Arc<AuthorityDirectory>>,
    Json(payload): Json<FeeQuoteRequest>,
) -> Response {
    let authority_id = AuthorityId(payload.authority.clone());
    let category_id = CategoryId(payload.category.clone());

    let Some(authority) = directory.authority(&authority_id) else {
        return quote_error(
            StatusCode::NOT_FOUND,
            format!("unknown authority '{}'", payload.authority),
        );
    };
    let Some(category) = directory.category(&category_id) else {
        return quote_error(
            StatusCode::NOT_FOUND,
            format!("unknown category '{}'", payload.category),
        );
    };
    if !authority.accepts(&category_id) {
        return quote_error(
            StatusCode::UNPROCESSABLE_ENTITY,
            format!(
                "authority '{}' does not accept category '{}'",
                payload.authority, payload.category
            ),
        );
    }

    let submission_date = payload.submission_date.unwrap_or(payload.created_on);
    let context = FeeContext {
        created_on: payload.created_on,
        submission_date,
        expedited: payload.expedited,
    };
    let fees = calculate_fees(&category.fees, &context);
    let processing_days = directory
        .processing_days(&authority_id, &category_id)
        .unwrap_or(category.typical_processing_days);

    let quote = FeeQuoteResponse {
        authority: authority.name.clone(),
        category: category.name.clone(),
        currency: category.fees.currency.clone(),
        processing_days,
        submission_date,
        expected_completion_date: project_completion_date(submission_date, processing_days),
        total_amount: total_amount(&fees),
        fees,
    };
    (StatusCode::OK, Json(quote)).into_response()
}

fn quote_error(status: StatusCode, message: String) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn builtin_directory() -> Extension<Arc<AuthorityDirectory>> {
        Extension(Arc::new(AuthorityDirectory::builtin()))
    }

    fn renovation_quote() -> FeeQuoteRequest {
        FeeQuoteRequest {
            authority: "mbpj".to_string(),
            category: "renovation-permit".to_string(),
            created_on: NaiveDate::from_ymd_opt(2024, 3, 4).expect("valid date"),
            submission_date: None,
            expedited: false,
        }
    }

    async fn read_json_body(response: Response) -> Value {
        let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
            .await
            .expect("read body");
        serde_json::from_slice(&body).expect("json payload")
    }

    #[tokio::test]
    async fn fee_quote_endpoint_prices_the_builtin_schedule() {
        let response = fee_quote_endpoint(builtin_directory(), Json(renovation_quote())).await;

        assert_eq!(response.status(), StatusCode::OK);
        let body = read_json_body(response).await;
        assert_eq!(body["currency"], "MYR");
        assert_eq!(body["processing_days"], 14);
        assert_eq!(body["expected_completion_date"], "2024-03-22");
        assert_eq!(body["fees"].as_array().map(Vec::len), Some(1));
        assert_eq!(body["total_amount"], json!("300.00"));
    }

    #[tokio::test]
    async fn fee_quote_endpoint_adds_late_and_expedite_lines() {
        let mut request = renovation_quote();
        request.submission_date = NaiveDate::from_ymd_opt(2024, 3, 20);
        request.expedited = true;

        let response = fee_quote_endpoint(builtin_directory(), Json(request)).await;

        assert_eq!(response.status(), StatusCode::OK);
        let body = read_json_body(response).await;
        let kinds: Vec<&str> = body["fees"]
            .as_array()
            .expect("fee lines")
            .iter()
            .map(|fee| fee["kind"].as_str().expect("fee kind"))
            .collect();
        assert_eq!(kinds, vec!["base", "late", "expedite"]);
        assert_eq!(body["total_amount"], json!("550.00"));
    }

    #[tokio::test]
    async fn fee_quote_endpoint_rejects_unknown_authorities() {
        let mut request = renovation_quote();
        request.authority = "putrajaya".to_string();

        let response = fee_quote_endpoint(builtin_directory(), Json(request)).await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = read_json_body(response).await;
        assert!(body["error"]
            .as_str()
            .expect("error message")
            .contains("putrajaya"));
    }
}
