//! Service initialization and application state setup

use crate::services::{DownloadService, UploadService};
use crate::state::AppState;
use sqlx::PgPool;
use std::sync::Arc;
use vellum_core::Config;
use vellum_db::{ContentDatabase, DocumentMetadataRepository, FileContentRepository, MetadataResolver};
use vellum_storage::{BlobStoreProvider, ObjectStorageReader};

/// Initialize the Postgres-backed services, returning the application state
pub fn initialize_services(
    config: &Config,
    pool: PgPool,
    object_storage: Arc<dyn BlobStoreProvider>,
) -> Arc<AppState> {
    let resolver: Arc<dyn MetadataResolver> = Arc::new(DocumentMetadataRepository::new(pool.clone()));
    let database: Arc<dyn ContentDatabase> = Arc::new(FileContentRepository::new(pool.clone()));
    build_state(resolver, database, object_storage, config.chunk_size, Some(pool))
}

/// Wire the services over the given backends.
pub fn build_state(
    resolver: Arc<dyn MetadataResolver>,
    database: Arc<dyn ContentDatabase>,
    object_storage: Arc<dyn BlobStoreProvider>,
    chunk_size: usize,
    pool: Option<PgPool>,
) -> Arc<AppState> {
    let object_reader = ObjectStorageReader::new(
        object_storage,
        chunk_size,
        tracing::info_span!("object_storage"),
    );
    let downloads = DownloadService::new(
        resolver,
        database.clone(),
        object_reader,
        chunk_size,
        tracing::info_span!("download_service"),
    );
    let uploads = UploadService::new(
        database.clone(),
        chunk_size,
        tracing::info_span!("upload_service"),
    );

    Arc::new(AppState {
        downloads: Arc::new(downloads),
        uploads: Arc::new(uploads),
        database,
        pool,
    })
}
