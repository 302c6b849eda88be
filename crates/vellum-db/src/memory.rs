//! In-memory content database
//!
//! Implements [`MetadataResolver`] and [`ContentDatabase`] without Postgres. Writes are
//! buffered per transaction and only become visible on commit. Failures can be injected
//! and every ingestion step is counted, which makes it the backend of choice for
//! exercising the gateway services.

use crate::missing_content_message;
use crate::traits::{ContentDatabase, IngestTransaction, MetadataResolver};
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use uuid::Uuid;
use vellum_core::constants::UNKNOWN_FILE_NAME;
use vellum_core::{AppError, ContentCapability, ContentTarget, FileMetadata, StorageLocation};
use vellum_storage::{copy_chunked, ChunkSink, ReaderSource};

/// Counters for ingestion activity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestStats {
    pub capability_checks: usize,
    /// Size of every chunk written, in order.
    pub writes: Vec<usize>,
    pub commits: usize,
    pub rollbacks: usize,
}

struct StoredContent {
    /// Database-resident bytes; `None` when only object storage holds the payload.
    data: Option<Vec<u8>>,
    size: u64,
    location: StorageLocation,
}

struct DocumentVersion {
    file_name: String,
    content_id: Uuid,
}

struct State {
    capability: Option<ContentCapability>,
    dangling_large_objects: bool,
    contents: HashMap<Uuid, StoredContent>,
    documents: HashMap<Uuid, DocumentVersion>,
    fail_write_at: Option<usize>,
    fail_rollback: bool,
    stats: IngestStats,
}

#[derive(Clone)]
pub struct InMemoryContentDatabase {
    state: Arc<Mutex<State>>,
}

impl InMemoryContentDatabase {
    pub fn new(capability: ContentCapability) -> Self {
        Self::with_capability(Some(capability))
    }

    /// Database whose content column is neither a large-object reference nor bytea.
    pub fn misconfigured() -> Self {
        Self::with_capability(None)
    }

    fn with_capability(capability: Option<ContentCapability>) -> Self {
        Self {
            state: Arc::new(Mutex::new(State {
                capability,
                dangling_large_objects: false,
                contents: HashMap::new(),
                documents: HashMap::new(),
                fail_write_at: None,
                fail_rollback: false,
                stats: IngestStats::default(),
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Store database-resident content.
    pub fn insert_content(&self, content_id: Uuid, data: impl Into<Vec<u8>>) {
        let data = data.into();
        self.lock().contents.insert(
            content_id,
            StoredContent {
                size: data.len() as u64,
                data: Some(data),
                location: StorageLocation::Database,
            },
        );
    }

    /// Store a row flagged as externally held, optionally with a database copy.
    pub fn insert_external_content(&self, content_id: Uuid, size: u64, database_copy: Option<Vec<u8>>) {
        self.lock().contents.insert(
            content_id,
            StoredContent {
                data: database_copy,
                size,
                location: StorageLocation::External,
            },
        );
    }

    pub fn insert_document_version(&self, version_id: Uuid, file_name: &str, content_id: Uuid) {
        self.lock().documents.insert(
            version_id,
            DocumentVersion {
                file_name: file_name.to_string(),
                content_id,
            },
        );
    }

    /// Make large-object reads fail as if the referenced objects were missing.
    pub fn set_dangling_large_objects(&self, dangling: bool) {
        self.lock().dangling_large_objects = dangling;
    }

    /// Fail the write of the chunk with this zero-based index.
    pub fn fail_write_at(&self, chunk_index: usize) {
        self.lock().fail_write_at = Some(chunk_index);
    }

    pub fn fail_rollback(&self, fail: bool) {
        self.lock().fail_rollback = fail;
    }

    /// Committed database-resident bytes of a content row.
    pub fn content(&self, content_id: Uuid) -> Option<Vec<u8>> {
        self.lock()
            .contents
            .get(&content_id)
            .and_then(|c| c.data.clone())
    }

    pub fn content_count(&self) -> usize {
        self.lock().contents.len()
    }

    pub fn stats(&self) -> IngestStats {
        self.lock().stats.clone()
    }

    fn check_capability(&self) -> Result<ContentCapability, AppError> {
        let mut state = self.lock();
        state.stats.capability_checks += 1;
        state.capability.ok_or_else(|| {
            AppError::CapabilityMisconfigured(
                "file_content.content is neither OID nor BYTEA".to_string(),
            )
        })
    }

    async fn stream(&self, data: Vec<u8>, sink: &mut dyn ChunkSink, chunk_size: usize) -> Result<u64, AppError> {
        let mut source = ReaderSource::new(data.as_slice());
        copy_chunked(&mut source, sink, chunk_size).await
    }
}

#[async_trait]
impl MetadataResolver for InMemoryContentDatabase {
    async fn resolve(&self, target: ContentTarget) -> Result<FileMetadata, AppError> {
        let state = self.lock();
        let (content_id, file_name) = match target {
            ContentTarget::DocumentVersion(id) => {
                let version = state
                    .documents
                    .get(&id)
                    .ok_or_else(|| AppError::NotFound(format!("Missing DocumentVersion '{}'", id)))?;
                (version.content_id, version.file_name.clone())
            }
            ContentTarget::Content(id) => (id, UNKNOWN_FILE_NAME.to_string()),
        };

        let content = state
            .contents
            .get(&content_id)
            .ok_or_else(|| AppError::NotFound(missing_content_message(content_id)))?;

        Ok(FileMetadata {
            content_id,
            file_name,
            storage_location: content.location,
            size: content.size,
        })
    }
}

#[async_trait]
impl ContentDatabase for InMemoryContentDatabase {
    async fn detect_capability(&self) -> Result<ContentCapability, AppError> {
        self.check_capability()
    }

    async fn read_large_object(
        &self,
        content_id: Uuid,
        sink: &mut dyn ChunkSink,
        chunk_size: usize,
    ) -> Result<u64, AppError> {
        let data = {
            let state = self.lock();
            let content = state
                .contents
                .get(&content_id)
                .ok_or_else(|| AppError::NotFound(missing_content_message(content_id)))?;
            match (&content.data, state.dangling_large_objects) {
                (Some(data), false) => data.clone(),
                _ => {
                    return Err(AppError::CapabilityMisconfigured(format!(
                        "FileContent '{}' has no large object behind file_content.content",
                        content_id
                    )))
                }
            }
        };
        self.stream(data, sink, chunk_size).await
    }

    async fn read_binary_column(
        &self,
        content_id: Uuid,
        sink: &mut dyn ChunkSink,
        chunk_size: usize,
    ) -> Result<u64, AppError> {
        let data = self
            .lock()
            .contents
            .get(&content_id)
            .map(|c| c.data.clone().unwrap_or_default())
            .ok_or_else(|| AppError::NotFound(missing_content_message(content_id)))?;
        self.stream(data, sink, chunk_size).await
    }

    async fn begin_ingest(&self) -> Result<Box<dyn IngestTransaction>, AppError> {
        Ok(Box::new(InMemoryIngestTransaction {
            db: self.clone(),
            content_id: None,
            buffer: Vec::new(),
            chunks: 0,
        }))
    }
}

struct InMemoryIngestTransaction {
    db: InMemoryContentDatabase,
    content_id: Option<Uuid>,
    buffer: Vec<u8>,
    chunks: usize,
}

#[async_trait]
impl ChunkSink for InMemoryIngestTransaction {
    async fn write_chunk(&mut self, chunk: Bytes) -> Result<(), AppError> {
        if self.content_id.is_none() {
            return Err(AppError::Internal("no content row opened for writing".to_string()));
        }
        let mut state = self.db.lock();
        if state.fail_write_at == Some(self.chunks) {
            return Err(AppError::Transfer("injected write failure".to_string()));
        }
        state.stats.writes.push(chunk.len());
        self.buffer.extend_from_slice(&chunk);
        self.chunks += 1;
        Ok(())
    }

    async fn flush(&mut self) -> Result<(), AppError> {
        Ok(())
    }
}

#[async_trait]
impl IngestTransaction for InMemoryIngestTransaction {
    async fn detect_capability(&mut self) -> Result<ContentCapability, AppError> {
        self.db.check_capability()
    }

    async fn create_content(
        &mut self,
        content_id: Uuid,
        _capability: ContentCapability,
    ) -> Result<(), AppError> {
        self.content_id = Some(content_id);
        self.buffer.clear();
        self.chunks = 0;
        Ok(())
    }

    async fn finalize(&mut self) -> Result<u64, AppError> {
        Ok(self.buffer.len() as u64)
    }

    async fn commit(self: Box<Self>) -> Result<(), AppError> {
        let this = *self;
        let mut state = this.db.lock();
        state.stats.commits += 1;
        if let Some(content_id) = this.content_id {
            state.contents.insert(
                content_id,
                StoredContent {
                    size: this.buffer.len() as u64,
                    data: Some(this.buffer),
                    location: StorageLocation::Database,
                },
            );
        }
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), AppError> {
        let mut state = self.db.lock();
        state.stats.rollbacks += 1;
        if state.fail_rollback {
            return Err(AppError::Internal("injected rollback failure".to_string()));
        }
        Ok(())
    }
}
