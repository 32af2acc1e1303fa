use crate::config::ConfigError;
use crate::telemetry::TelemetryError;
use crate::workflows::claims::enhancement::ReceiptImportError;
use crate::workflows::claims::judgment::JudgmentError;
use crate::workflows::claims::service::ClaimServiceError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Server(axum::Error),
    Packet(serde_json::Error),
    Judgment(JudgmentError),
    Receipts(ReceiptImportError),
    Claims(ClaimServiceError),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Server(err) => write!(f, "server error: {}", err),
            AppError::Packet(err) => write!(f, "claim packet is not valid JSON: {}", err),
            AppError::Judgment(err) => write!(f, "judgment client error: {}", err),
            AppError::Receipts(err) => write!(f, "receipt import error: {}", err),
            AppError::Claims(err) => write!(f, "claim validation error: {}", err),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Server(err) => Some(err),
            AppError::Packet(err) => Some(err),
            AppError::Judgment(err) => Some(err),
            AppError::Receipts(err) => Some(err),
            AppError::Claims(err) => Some(err),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self {
            AppError::Packet(_) => StatusCode::BAD_REQUEST,
            AppError::Claims(ref err) => err.status_code(),
            AppError::Config(_)
            | AppError::Telemetry(_)
            | AppError::Io(_)
            | AppError::Server(_)
            | AppError::Judgment(_)
            | AppError::Receipts(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<axum::Error> for AppError {
    fn from(value: axum::Error) -> Self {
        Self::Server(value)
    }
}

impl From<serde_json::Error> for AppError {
    fn from(value: serde_json::Error) -> Self {
        Self::Packet(value)
    }
}

impl From<JudgmentError> for AppError {
    fn from(value: JudgmentError) -> Self {
        Self::Judgment(value)
    }
}

impl From<ReceiptImportError> for AppError {
    fn from(value: ReceiptImportError) -> Self {
        Self::Receipts(value)
    }
}

impl From<ClaimServiceError> for AppError {
    fn from(value: ClaimServiceError) -> Self {
        Self::Claims(value)
    }
}
