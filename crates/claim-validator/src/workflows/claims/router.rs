use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;

use super::domain::{ClaimId, ClaimPacket};
use super::repository::{ClaimRecord, ClaimRepository, ClaimStatusView, RepositoryError};
use super::service::{ClaimServiceError, ClaimValidationService};

const DEFAULT_PAGE_SIZE: usize = 25;

/// Router builder exposing HTTP endpoints for intake and validation.
pub fn claim_router<R>(service: Arc<ClaimValidationService<R>>) -> Router
where
    R: ClaimRepository + 'static,
{
    Router::new()
        .route(
            "/api/v1/claims",
            post(submit_handler::<R>).get(list_handler::<R>),
        )
        .route("/api/v1/claims/:claim_id/status", get(status_handler::<R>))
        .route(
            "/api/v1/claims/:claim_id/validation-loop",
            post(validate_handler::<R>),
        )
        .route("/api/v1/validation-loop", post(validate_packet_handler::<R>))
        .with_state(service)
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub(crate) struct ListParams {
    #[serde(default = "default_page_size")]
    limit: usize,
    #[serde(default)]
    offset: usize,
}

fn default_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}

pub(crate) async fn submit_handler<R>(
    State(service): State<Arc<ClaimValidationService<R>>>,
    axum::Json(packet): axum::Json<ClaimPacket>,
) -> Response
where
    R: ClaimRepository + 'static,
{
    match service.submit(packet) {
        Ok(record) => {
            let view = record.status_view();
            (StatusCode::ACCEPTED, axum::Json(view)).into_response()
        }
        Err(ClaimServiceError::Repository(RepositoryError::Conflict)) => {
            let payload = json!({
                "error": "claim already exists",
            });
            (StatusCode::CONFLICT, axum::Json(payload)).into_response()
        }
        Err(other) => error_response(other),
    }
}

pub(crate) async fn list_handler<R>(
    State(service): State<Arc<ClaimValidationService<R>>>,
    Query(params): Query<ListParams>,
) -> Response
where
    R: ClaimRepository + 'static,
{
    match service.list(params.limit, params.offset) {
        Ok(records) => {
            let claims: Vec<ClaimStatusView> =
                records.iter().map(ClaimRecord::status_view).collect();
            let payload = json!({
                "claims": claims,
                "limit": params.limit,
                "offset": params.offset,
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(other) => error_response(other),
    }
}

pub(crate) async fn status_handler<R>(
    State(service): State<Arc<ClaimValidationService<R>>>,
    Path(claim_id): Path<String>,
) -> Response
where
    R: ClaimRepository + 'static,
{
    let id = ClaimId(claim_id);
    match service.get(&id) {
        Ok(record) => (StatusCode::OK, axum::Json(record.status_view())).into_response(),
        Err(ClaimServiceError::Repository(RepositoryError::NotFound)) => not_found(&id),
        Err(other) => error_response(other),
    }
}

pub(crate) async fn validate_handler<R>(
    State(service): State<Arc<ClaimValidationService<R>>>,
    Path(claim_id): Path<String>,
) -> Response
where
    R: ClaimRepository + 'static,
{
    let id = ClaimId(claim_id);
    match service.validate(&id).await {
        Ok(report) => (StatusCode::OK, axum::Json(report)).into_response(),
        Err(ClaimServiceError::Repository(RepositoryError::NotFound)) => not_found(&id),
        Err(other) => error_response(other),
    }
}

pub(crate) async fn validate_packet_handler<R>(
    State(service): State<Arc<ClaimValidationService<R>>>,
    axum::Json(packet): axum::Json<ClaimPacket>,
) -> Response
where
    R: ClaimRepository + 'static,
{
    match service.validate_packet(packet).await {
        Ok(report) => (StatusCode::OK, axum::Json(report)).into_response(),
        Err(other) => error_response(other),
    }
}

fn not_found(id: &ClaimId) -> Response {
    let payload = json!({
        "claim_id": id.as_str(),
        "error": "claim not found",
    });
    (StatusCode::NOT_FOUND, axum::Json(payload)).into_response()
}

fn error_response(error: ClaimServiceError) -> Response {
    let payload = json!({
        "error": error.to_string(),
    });
    (error.status_code(), axum::Json(payload)).into_response()
}
