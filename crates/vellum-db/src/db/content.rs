//! File content repository: database-resident content tiers.

use crate::db::binary_column::BinaryColumnSource;
use crate::db::capability::{self, is_undefined_object};
use crate::db::ingest::PgIngestTransaction;
use crate::db::large_object::{self, LargeObjectSource, INV_READ};
use crate::missing_content_message;
use crate::traits::{ContentDatabase, IngestTransaction};
use async_trait::async_trait;
use sqlx::postgres::types::Oid;
use sqlx::PgPool;
use uuid::Uuid;
use vellum_core::{AppError, ContentCapability};
use vellum_storage::{copy_chunked, ChunkSink};

/// Repository for `file_content` payloads.
#[derive(Clone)]
pub struct FileContentRepository {
    pool: PgPool,
}

impl FileContentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn dangling_large_object(content_id: Uuid) -> AppError {
    AppError::CapabilityMisconfigured(format!(
        "FileContent '{}' has no large object behind file_content.content although the column is OID. \
         Restore the large object or convert the column to BYTEA; content stays readable through the database once fixed",
        content_id
    ))
}

#[async_trait]
impl ContentDatabase for FileContentRepository {
    async fn detect_capability(&self) -> Result<ContentCapability, AppError> {
        capability::detect(&self.pool).await
    }

    #[tracing::instrument(skip(self, sink), fields(db.table = "file_content", tier = "large_object"))]
    async fn read_large_object(
        &self,
        content_id: Uuid,
        sink: &mut dyn ChunkSink,
        chunk_size: usize,
    ) -> Result<u64, AppError> {
        let mut tx = self.pool.begin().await?;

        let oid: Option<Option<Oid>> =
            sqlx::query_scalar("SELECT content FROM file_content WHERE id = $1")
                .bind(content_id)
                .fetch_optional(&mut *tx)
                .await?;

        let oid = match oid {
            None => return Err(AppError::NotFound(missing_content_message(content_id))),
            Some(None) => return Err(dangling_large_object(content_id)),
            Some(Some(oid)) => oid,
        };

        let fd = match large_object::open(&mut tx, oid, INV_READ).await {
            Ok(fd) => fd,
            Err(e) if is_undefined_object(&e) => return Err(dangling_large_object(content_id)),
            Err(e) => return Err(e.into()),
        };

        // On error the transaction is dropped, which rolls back and closes the descriptor
        let written = {
            let mut source = LargeObjectSource::new(&mut tx, fd);
            copy_chunked(&mut source, sink, chunk_size).await?
        };

        large_object::close(&mut tx, fd).await?;
        tx.commit().await?;
        Ok(written)
    }

    #[tracing::instrument(skip(self, sink), fields(db.table = "file_content", tier = "binary_column"))]
    async fn read_binary_column(
        &self,
        content_id: Uuid,
        sink: &mut dyn ChunkSink,
        chunk_size: usize,
    ) -> Result<u64, AppError> {
        let exists: Option<Uuid> = sqlx::query_scalar("SELECT id FROM file_content WHERE id = $1")
            .bind(content_id)
            .fetch_optional(&self.pool)
            .await?;
        if exists.is_none() {
            return Err(AppError::NotFound(missing_content_message(content_id)));
        }

        let mut source = BinaryColumnSource::new(self.pool.clone(), content_id);
        copy_chunked(&mut source, sink, chunk_size).await
    }

    async fn begin_ingest(&self) -> Result<Box<dyn IngestTransaction>, AppError> {
        let tx = PgIngestTransaction::begin(&self.pool).await?;
        Ok(Box::new(tx))
    }
}
