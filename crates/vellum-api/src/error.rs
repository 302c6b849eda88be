//! HTTP error response conversion
//!
//! Retrieval handlers return `Result<Response, HttpAppError>`. Every retrieval failure is
//! rendered as `400 Bad Request` with a stable client message, the full error chain and a
//! machine-readable code. Ingestion failures never reach this module; they travel inside
//! [`vellum_core::UploadResult`].

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use vellum_core::{AppError, ErrorMetadata, LogLevel};

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    /// Full error chain for operators
    pub trace: String,
    /// Machine-readable error code for programmatic handling
    pub code: String,
    /// Whether this error is recoverable (can be retried)
    pub recoverable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_action: Option<String>,
}

impl ErrorResponse {
    pub fn from_app_error(error: &AppError) -> Self {
        Self {
            error: error.client_message(),
            trace: error.detailed_message(),
            code: error.error_code().to_string(),
            recoverable: error.is_recoverable(),
            suggested_action: error.suggested_action().map(String::from),
        }
    }
}

/// Wrapper type for AppError to implement IntoResponse
/// This is necessary because of Rust's orphan rules - we can't implement
/// IntoResponse (external trait) for AppError (external type from vellum-core)
#[derive(Debug)]
pub struct HttpAppError(pub AppError);

impl From<AppError> for HttpAppError {
    fn from(err: AppError) -> Self {
        HttpAppError(err)
    }
}

impl From<anyhow::Error> for HttpAppError {
    fn from(err: anyhow::Error) -> Self {
        HttpAppError(AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        })
    }
}

fn log_error(error: &AppError) {
    let error_type = error.error_type();
    let details = error.detailed_message();
    match error.log_level() {
        LogLevel::Debug => {
            tracing::debug!(error = %details, error_type = error_type, "Download failed");
        }
        LogLevel::Warn => {
            tracing::warn!(error = %details, error_type = error_type, "Download failed");
        }
        LogLevel::Error => {
            tracing::error!(error = %details, error_type = error_type, "Download failed");
        }
    }
}

impl IntoResponse for HttpAppError {
    fn into_response(self) -> Response {
        log_error(&self.0);
        (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::from_app_error(&self.0)),
        )
            .into_response()
    }
}
