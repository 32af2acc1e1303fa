use crate::infra::AppState;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use claim_validator::workflows::claims::{claim_router, ClaimRepository, ClaimValidationService};
use serde_json::json;
use std::sync::Arc;

pub(crate) fn with_claim_routes<R>(service: Arc<ClaimValidationService<R>>) -> axum::Router
where
    R: ClaimRepository + 'static,
{
    claim_router(service)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::{build_controller, InMemoryClaimRepository};
    use axum::body::Body;
    use axum::http::Request;
    use claim_validator::config::ValidationSettings;
    use metrics_exporter_prometheus::PrometheusBuilder;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tower::ServiceExt;

    fn app(ready: bool) -> axum::Router {
        let controller =
            build_controller(&ValidationSettings::default(), None).expect("controller builds");
        let service = Arc::new(ClaimValidationService::new(
            Arc::new(InMemoryClaimRepository::default()),
            Arc::new(controller),
        ));
        let state = AppState {
            readiness: Arc::new(AtomicBool::new(false)),
            metrics: Arc::new(PrometheusBuilder::new().build_recorder().handle()),
        };
        state.readiness.store(ready, Ordering::Release);
        with_claim_routes(service).layer(Extension(state))
    }

    async fn status_of(router: axum::Router, uri: &str) -> StatusCode {
        router
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
            .status()
    }

    #[tokio::test]
    async fn health_and_readiness_endpoints_report_state() {
        assert_eq!(status_of(app(false), "/health").await, StatusCode::OK);
        assert_eq!(
            status_of(app(false), "/ready").await,
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(status_of(app(true), "/ready").await, StatusCode::OK);
        assert_eq!(status_of(app(true), "/metrics").await, StatusCode::OK);
    }

    #[tokio::test]
    async fn claim_routes_are_mounted() {
        assert_eq!(status_of(app(true), "/api/v1/claims").await, StatusCode::OK);
        assert_eq!(
            status_of(app(true), "/api/v1/claims/WF-NONE/status").await,
            StatusCode::NOT_FOUND
        );
    }
}
