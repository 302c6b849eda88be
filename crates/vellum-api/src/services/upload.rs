//! Transactional content ingestion.

use std::sync::Arc;
use std::time::Instant;
use tracing::{Instrument, Span};
use uuid::Uuid;
use vellum_core::{AppError, ErrorMetadata, LogLevel, UploadResult, UploadStatus};
use vellum_db::{ContentDatabase, IngestTransaction};
use vellum_storage::{copy_chunked, ChunkSource};

/// Writes an incoming byte stream into a new content row.
///
/// The capability is checked once per upload inside the ingestion transaction, and the
/// payload is then written chunk by chunk through the matching write path. Any failure
/// rolls the transaction back, so no partial row survives. Failures are reported in the
/// returned [`UploadResult`] rather than as an error.
pub struct UploadService {
    database: Arc<dyn ContentDatabase>,
    chunk_size: usize,
    span: Span,
}

impl UploadService {
    pub fn new(database: Arc<dyn ContentDatabase>, chunk_size: usize, span: Span) -> Self {
        Self {
            database,
            chunk_size,
            span,
        }
    }

    pub async fn upload<S>(&self, source: &mut S) -> UploadResult
    where
        S: ChunkSource + ?Sized,
    {
        let content_id = Uuid::new_v4();
        self.upload_inner(content_id, source)
            .instrument(self.span.clone())
            .await
    }

    async fn upload_inner<S>(&self, content_id: Uuid, source: &mut S) -> UploadResult
    where
        S: ChunkSource + ?Sized,
    {
        let start = Instant::now();

        let mut tx = match self.database.begin_ingest().await {
            Ok(tx) => tx,
            Err(e) => return failed(content_id, e, start),
        };

        match write_content(tx.as_mut(), content_id, source, self.chunk_size).await {
            Ok(size) => match tx.commit().await {
                Ok(()) => {
                    tracing::info!(
                        content_id = %content_id,
                        size_bytes = size,
                        duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                        "Content uploaded"
                    );
                    UploadResult::success(content_id)
                }
                Err(e) => failed(content_id, e, start),
            },
            Err(e) => {
                if let Err(rollback_err) = tx.rollback().await {
                    tracing::warn!(
                        error = %rollback_err,
                        content_id = %content_id,
                        "Rollback after failed upload also failed"
                    );
                }
                failed(content_id, e, start)
            }
        }
    }
}

async fn write_content<S>(
    tx: &mut dyn IngestTransaction,
    content_id: Uuid,
    source: &mut S,
    chunk_size: usize,
) -> Result<u64, AppError>
where
    S: ChunkSource + ?Sized,
{
    let capability = tx.detect_capability().await?;
    tx.create_content(content_id, capability).await?;
    copy_chunked(source, tx, chunk_size).await?;
    tx.finalize().await
}

fn failed(content_id: Uuid, error: AppError, start: Instant) -> UploadResult {
    let duration_ms = start.elapsed().as_secs_f64() * 1000.0;
    let details = error.detailed_message();
    match error.log_level() {
        LogLevel::Debug => {
            tracing::debug!(error = %details, content_id = %content_id, duration_ms, "Upload failed")
        }
        LogLevel::Warn => {
            tracing::warn!(error = %details, content_id = %content_id, duration_ms, "Upload failed")
        }
        LogLevel::Error => {
            tracing::error!(error = %details, content_id = %content_id, duration_ms, "Upload failed")
        }
    }

    let status = if error.is_capability_misconfigured() {
        UploadStatus::ClientError
    } else {
        UploadStatus::ServerError
    };
    UploadResult::failure(content_id, status, error.client_message())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::RngCore;
    use vellum_core::{ContentCapability, ContentTarget};
    use vellum_db::{InMemoryContentDatabase, MetadataResolver};
    use vellum_storage::ReaderSource;

    const CHUNK: usize = 100 * 1024;

    fn service(db: &InMemoryContentDatabase) -> UploadService {
        UploadService::new(Arc::new(db.clone()), CHUNK, Span::none())
    }

    fn payload(len: usize) -> Vec<u8> {
        let mut data = vec![0u8; len];
        rand::rng().fill_bytes(&mut data);
        data
    }

    #[tokio::test]
    async fn test_upload_writes_in_chunks_and_commits_once() {
        let db = InMemoryContentDatabase::new(ContentCapability::BinaryColumn);
        let data = payload(250 * 1024);
        let mut source = ReaderSource::new(data.as_slice());

        let result = service(&db).upload(&mut source).await;

        assert!(result.is_success());
        let stats = db.stats();
        assert_eq!(stats.capability_checks, 1);
        assert_eq!(stats.writes, vec![CHUNK, CHUNK, 50 * 1024]);
        assert_eq!(stats.commits, 1);
        assert_eq!(stats.rollbacks, 0);
        assert_eq!(db.content(result.content_id).unwrap(), data);
    }

    #[tokio::test]
    async fn test_empty_upload_creates_empty_content() {
        let db = InMemoryContentDatabase::new(ContentCapability::LargeObject);
        let mut source = ReaderSource::new(&b""[..]);

        let result = service(&db).upload(&mut source).await;

        assert!(result.is_success());
        assert_eq!(db.content(result.content_id).unwrap(), Vec::<u8>::new());
        assert!(db.stats().writes.is_empty());
    }

    #[tokio::test]
    async fn test_failed_write_rolls_back() {
        let db = InMemoryContentDatabase::new(ContentCapability::BinaryColumn);
        db.fail_write_at(1);
        let data = payload(250 * 1024);
        let mut source = ReaderSource::new(data.as_slice());

        let result = service(&db).upload(&mut source).await;

        assert_eq!(result.status, UploadStatus::ServerError);
        assert!(result.error.is_some());
        let stats = db.stats();
        assert_eq!(stats.commits, 0);
        assert_eq!(stats.rollbacks, 1);
        assert_eq!(db.content_count(), 0);
        let err = db
            .resolve(ContentTarget::Content(result.content_id))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_misconfigured_capability_is_client_error() {
        let db = InMemoryContentDatabase::misconfigured();
        let mut source = ReaderSource::new(&b"data"[..]);

        let result = service(&db).upload(&mut source).await;

        assert_eq!(result.status, UploadStatus::ClientError);
        assert_eq!(result.status.http_status_code(), 400);
        let message = result.error.unwrap();
        assert!(message.contains("OID"), "got {}", message);
        assert!(message.contains("BYTEA"), "got {}", message);
        assert_eq!(db.stats().rollbacks, 1);
    }

    #[tokio::test]
    async fn test_rollback_failure_keeps_original_error() {
        let db = InMemoryContentDatabase::new(ContentCapability::BinaryColumn);
        db.fail_write_at(0);
        db.fail_rollback(true);
        let mut source = ReaderSource::new(&b"payload"[..]);

        let result = service(&db).upload(&mut source).await;

        assert_eq!(result.status, UploadStatus::ServerError);
        assert_eq!(result.error.as_deref(), Some("Content transfer failed"));
    }

    #[tokio::test]
    async fn test_each_upload_gets_a_new_identifier() {
        let db = InMemoryContentDatabase::new(ContentCapability::BinaryColumn);
        let svc = service(&db);
        let first = svc.upload(&mut ReaderSource::new(&b"a"[..])).await;
        let second = svc.upload(&mut ReaderSource::new(&b"b"[..])).await;
        assert_ne!(first.content_id, second.content_id);
        assert_eq!(db.content_count(), 2);
    }
}
