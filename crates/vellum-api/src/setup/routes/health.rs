//! Health check handlers and response types.

use crate::constants::HEALTH_CHECK_TIMEOUT_SECS;
use crate::state::AppState;
use axum::{http::StatusCode, response::IntoResponse, Json};
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Run an async check with timeout; returns status string "healthy", "timeout", or "{prefix}: {error}".
async fn run_check<F, E>(timeout: Duration, f: F, error_prefix: &str) -> String
where
    F: Future<Output = Result<(), E>>,
    E: Display,
{
    match tokio::time::timeout(timeout, f).await {
        Ok(Ok(())) => "healthy".to_string(),
        Ok(Err(e)) => format!("{}: {}", error_prefix, e),
        Err(_) => "timeout".to_string(),
    }
}

#[derive(serde::Serialize)]
pub(super) struct HealthCheckResponse {
    pub status: String,
    pub database: String,
    /// Detected storage of `file_content.content`: "large_object", "binary_column", or the diagnostic.
    pub content_capability: String,
}

/// Liveness check: process is running.
pub async fn liveness_check(_state: Arc<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(serde_json::json!({ "status": "alive" })),
    )
}

/// Readiness check: critical dependencies (database).
pub async fn readiness_check(state: Arc<AppState>) -> impl IntoResponse {
    const TIMEOUT: Duration = Duration::from_secs(HEALTH_CHECK_TIMEOUT_SECS);

    let mut response = serde_json::json!({
        "status": "ready",
        "database": "unknown"
    });

    let mut overall_ready = true;
    match &state.pool {
        Some(pool) => {
            match tokio::time::timeout(TIMEOUT, sqlx::query("SELECT 1").execute(pool)).await {
                Ok(Ok(_)) => response["database"] = serde_json::json!("ready"),
                Ok(Err(e)) => {
                    tracing::error!(error = %e, "Database readiness check failed");
                    response["database"] = serde_json::json!(format!("not_ready: {}", e));
                    overall_ready = false;
                }
                Err(_) => {
                    tracing::error!("Database readiness check timed out");
                    response["database"] = serde_json::json!("timeout");
                    overall_ready = false;
                }
            }
        }
        None => response["database"] = serde_json::json!("in_process"),
    }

    if !overall_ready {
        response["status"] = serde_json::json!("not_ready");
    }
    let status_code = if overall_ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(response))
}

/// Full health check (database connectivity and detected content capability).
pub async fn health_check(state: Arc<AppState>) -> impl IntoResponse {
    const TIMEOUT: Duration = Duration::from_secs(HEALTH_CHECK_TIMEOUT_SECS);

    let mut response = HealthCheckResponse {
        status: "healthy".to_string(),
        database: "unknown".to_string(),
        content_capability: "unknown".to_string(),
    };

    response.database = match state.pool.clone() {
        Some(pool) => {
            run_check(
                TIMEOUT,
                async move { sqlx::query("SELECT 1").execute(&pool).await.map(drop) },
                "unhealthy",
            )
            .await
        }
        None => "healthy".to_string(),
    };
    let overall_healthy = response.database == "healthy";

    response.content_capability =
        match tokio::time::timeout(TIMEOUT, state.database.detect_capability()).await {
            Ok(Ok(capability)) => capability.as_str().to_string(),
            Ok(Err(e)) => format!("misconfigured: {}", e),
            Err(_) => "timeout".to_string(),
        };

    if !overall_healthy {
        response.status = "unhealthy".to_string();
    }
    let status_code = if overall_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(response))
}
