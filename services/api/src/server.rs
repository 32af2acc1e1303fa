use crate::cli::ServeArgs;
use crate::infra::{build_controller, AppState, InMemoryClaimRepository};
use crate::routes::with_claim_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use claim_validator::config::AppConfig;
use claim_validator::error::AppError;
use claim_validator::telemetry;
use claim_validator::workflows::claims::ClaimValidationService;
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

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let controller = build_controller(&config.validation, None)?;
    let repository = Arc::new(InMemoryClaimRepository::default());
    let claim_service = Arc::new(ClaimValidationService::new(
        repository,
        Arc::new(controller),
    ));

    let app = with_claim_routes(claim_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        target_score = config.validation.target_score,
        delegated = config.validation.judgment.is_some(),
        "claim validation service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
