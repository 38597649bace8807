use crate::cli::ServeArgs;
use crate::infra::{
    AppState, InMemoryDocumentRepository, InMemoryShareRepository, InMemorySubmissionRepository,
    InMemoryWorkflowRepository,
};
use crate::routes::with_api_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use permitflow::approvals::ApprovalEngine;
use permitflow::config::AppConfig;
use permitflow::directory::{import, AuthorityDirectory};
use permitflow::documents::{DocumentRoutes, DocumentStore, ShareManager};
use permitflow::error::AppError;
use permitflow::submissions::SubmissionLifecycle;
use permitflow::telemetry;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let directory = match (args.authorities_csv.take(), args.categories_csv.take()) {
        (Some(authorities), Some(categories)) => {
            let directory = import::directory_from_paths(&authorities, &categories)?;
            info!(path = %authorities.display(), "loaded authority directory from csv");
            Arc::new(directory)
        }
        _ => Arc::new(AuthorityDirectory::builtin()),
    };

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let submissions = Arc::new(InMemorySubmissionRepository::default());
    let documents = Arc::new(InMemoryDocumentRepository::default());
    let workflows = Arc::new(InMemoryWorkflowRepository::default());
    let shares = Arc::new(InMemoryShareRepository::default());

    let lifecycle = Arc::new(SubmissionLifecycle::new(
        submissions,
        documents.clone(),
        workflows.clone(),
        directory.clone(),
    ));
    let document_routes = DocumentRoutes {
        store: Arc::new(DocumentStore::new(documents)),
        shares: Arc::new(ShareManager::new(shares)),
    };
    let engine = Arc::new(ApprovalEngine::new(workflows));

    let app = with_api_routes(lifecycle, document_routes, engine)
        .layer(Extension(app_state))
        .layer(Extension(directory))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "permit tracking service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
