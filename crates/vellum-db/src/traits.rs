//! Seams between the gateway services and the database.

use async_trait::async_trait;
use uuid::Uuid;
use vellum_core::{AppError, ContentCapability, ContentTarget, FileMetadata};
use vellum_storage::ChunkSink;

/// Resolves a request identifier to download metadata.
#[async_trait]
pub trait MetadataResolver: Send + Sync {
    /// Fails with `AppError::NotFound` when no row matches.
    async fn resolve(&self, target: ContentTarget) -> Result<FileMetadata, AppError>;
}

/// Database-resident content tiers.
#[async_trait]
pub trait ContentDatabase: Send + Sync {
    /// Report how `file_content.content` stores bytes.
    ///
    /// Column types other than large-object references and bytea are reported as
    /// `AppError::CapabilityMisconfigured`.
    async fn detect_capability(&self) -> Result<ContentCapability, AppError>;

    /// Stream content through a transaction-bound large-object handle.
    async fn read_large_object(
        &self,
        content_id: Uuid,
        sink: &mut dyn ChunkSink,
        chunk_size: usize,
    ) -> Result<u64, AppError>;

    /// Stream content with offset reads on the bytea column.
    async fn read_binary_column(
        &self,
        content_id: Uuid,
        sink: &mut dyn ChunkSink,
        chunk_size: usize,
    ) -> Result<u64, AppError>;

    /// Open an ingestion transaction.
    async fn begin_ingest(&self) -> Result<Box<dyn IngestTransaction>, AppError>;
}

/// One ingestion, bound to one database transaction.
///
/// Chunks written through the `ChunkSink` half go to the write path chosen by
/// [`IngestTransaction::create_content`]. Nothing is visible to other sessions until
/// [`IngestTransaction::commit`].
#[async_trait]
pub trait IngestTransaction: ChunkSink {
    /// Capability detection inside this transaction.
    async fn detect_capability(&mut self) -> Result<ContentCapability, AppError>;

    /// Create the content row and open the write path for `capability`.
    async fn create_content(
        &mut self,
        content_id: Uuid,
        capability: ContentCapability,
    ) -> Result<(), AppError>;

    /// Close the write handle and record the final size. Returns bytes written.
    async fn finalize(&mut self) -> Result<u64, AppError>;

    async fn commit(self: Box<Self>) -> Result<(), AppError>;

    async fn rollback(self: Box<Self>) -> Result<(), AppError>;
}
