//! Tier selection for downloads.

use std::sync::Arc;
use tracing::{Instrument, Span};
use vellum_core::{AppError, ContentCapability, ContentTarget, FileMetadata};
use vellum_db::{ContentDatabase, MetadataResolver};
use vellum_storage::{ObjectStorageReader, ResponseHeaders, ResponseSink, TierOutcome};

/// Streams document content from the first tier able to serve it.
///
/// Externally flagged content is tried in object storage first. Everything else, and
/// external content object storage could not serve, is read from the database using
/// whichever content capability the database advertises at request time.
pub struct DownloadService {
    resolver: Arc<dyn MetadataResolver>,
    database: Arc<dyn ContentDatabase>,
    object_reader: ObjectStorageReader,
    chunk_size: usize,
    span: Span,
}

impl DownloadService {
    pub fn new(
        resolver: Arc<dyn MetadataResolver>,
        database: Arc<dyn ContentDatabase>,
        object_reader: ObjectStorageReader,
        chunk_size: usize,
        span: Span,
    ) -> Self {
        Self {
            resolver,
            database,
            object_reader,
            chunk_size,
            span,
        }
    }

    /// Look up download metadata, applying an optional filename override.
    pub async fn resolve(
        &self,
        target: ContentTarget,
        file_name_override: Option<String>,
    ) -> Result<FileMetadata, AppError> {
        let metadata = self
            .resolver
            .resolve(target)
            .instrument(self.span.clone())
            .await?;
        Ok(metadata.with_file_name_override(file_name_override))
    }

    /// Stream the content described by `metadata` into `sink`.
    ///
    /// Returns the number of bytes written.
    pub async fn download<S>(&self, metadata: &FileMetadata, sink: &mut S) -> Result<u64, AppError>
    where
        S: ResponseSink,
    {
        self.download_inner(metadata, sink)
            .instrument(self.span.clone())
            .await
    }

    async fn download_inner<S>(&self, metadata: &FileMetadata, sink: &mut S) -> Result<u64, AppError>
    where
        S: ResponseSink,
    {
        let content_id = metadata.content_id;

        if metadata.storage_location.is_external() {
            match self.object_reader.try_fetch(metadata, sink).await {
                TierOutcome::Found(written) => return Ok(written),
                TierOutcome::Fatal(e) => return Err(e),
                TierOutcome::SoftMiss => {}
            }
        }

        let capability = self.database.detect_capability().await?;
        tracing::debug!(
            content_id = %content_id,
            tier = capability.as_str(),
            size_bytes = metadata.size,
            "Serving content from database"
        );

        sink.start(ResponseHeaders::for_file(&metadata.file_name, metadata.size));
        let written = match capability {
            ContentCapability::LargeObject => {
                self.database
                    .read_large_object(content_id, sink, self.chunk_size)
                    .await?
            }
            ContentCapability::BinaryColumn => {
                self.database
                    .read_binary_column(content_id, sink, self.chunk_size)
                    .await?
            }
        };

        if written != metadata.size {
            return Err(AppError::Transfer(format!(
                "FileContent '{}' recorded {} bytes but {} were read",
                content_id, metadata.size, written
            )));
        }
        Ok(written)
    }
}
