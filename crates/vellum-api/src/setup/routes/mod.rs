//! Route configuration and setup.
//!
//! Content routes live under [`API_PREFIX`]; health checks in [health](health).

mod health;

use crate::constants::API_PREFIX;
use crate::handlers::{content_download, content_upload};
use crate::state::AppState;
use axum::{
    extract::{DefaultBodyLimit, State},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::trace::TraceLayer;

/// Setup all application routes
pub fn setup_routes(state: Arc<AppState>) -> Router<()> {
    let http_concurrency_limit = std::env::var("HTTP_CONCURRENCY_LIMIT")
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
        .unwrap_or(10_000)
        .max(1);
    tracing::info!(
        http_concurrency_limit = http_concurrency_limit,
        "HTTP concurrency limit layer enabled"
    );

    Router::new()
        .nest(API_PREFIX, content_routes())
        .merge(health_routes())
        .layer(ConcurrencyLimitLayer::new(http_concurrency_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn content_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/documents/{id}/content",
            get(content_download::download_document),
        )
        .route("/content/{id}", get(content_download::download_content))
        .route(
            "/content",
            post(content_upload::upload_content).layer(DefaultBodyLimit::disable()),
        )
}

fn health_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health_check))
        .route("/health/live", get(liveness_check))
        .route("/health/ready", get(readiness_check))
}

async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    health::health_check(state).await
}

async fn liveness_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    health::liveness_check(state).await
}

async fn readiness_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    health::readiness_check(state).await
}
