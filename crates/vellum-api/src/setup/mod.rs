//! Application setup and initialization

pub mod database;
pub mod routes;
pub mod server;
pub mod services;
pub mod storage;

use crate::state::AppState;
use anyhow::{Context, Result};
use std::sync::Arc;
use vellum_core::Config;

/// Initialize the entire application
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, axum::Router)> {
    config.validate().context("Configuration validation failed")?;

    crate::telemetry::init_telemetry(config.log_format, config.is_production())
        .map_err(|e| anyhow::anyhow!("Failed to initialize telemetry: {}", e))?;

    tracing::info!(
        environment = %config.environment,
        chunk_size_bytes = config.chunk_size,
        "Configuration loaded and validated successfully"
    );

    let pool = database::setup_database(&config).await?;

    let object_storage = storage::setup_object_storage(&config);

    let state = services::initialize_services(&config, pool, object_storage);

    let router = routes::setup_routes(state.clone());

    Ok((state, router))
}
