use crate::services::{DownloadService, UploadService};
use sqlx::PgPool;
use std::sync::Arc;
use vellum_db::ContentDatabase;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub downloads: Arc<DownloadService>,
    pub uploads: Arc<UploadService>,
    /// Content backend used by the health checks to report the detected capability.
    pub database: Arc<dyn ContentDatabase>,
    /// Postgres pool; absent when the gateway runs on an in-process backend.
    pub pool: Option<PgPool>,
}
