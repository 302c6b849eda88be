//! Object storage tier reader.

use crate::headers::ResponseHeaders;
use crate::keys::blob_key;
use crate::traits::{BlobStore, BlobStoreProvider, StorageError};
use crate::transfer::{copy_chunked, ResponseSink, StreamSource};
use std::sync::Arc;
use tracing::{Instrument, Span};
use vellum_core::{AppError, FileMetadata};

/// Result of trying one content tier.
#[derive(Debug)]
pub enum TierOutcome {
    /// The tier served the content; carries the number of bytes written.
    Found(u64),
    /// The tier could not serve the content; the next tier should be tried.
    SoftMiss,
    /// The tier failed in a way no other tier can recover from.
    Fatal(AppError),
}

/// Serves externally stored content straight from object storage.
///
/// Missing or malformed connection settings and an absent container are fatal. An
/// absent blob is a quiet soft miss; any other failure before the first byte reaches
/// the client is logged as an error and also reported as a soft miss. Once bytes have
/// been sent a failure is fatal, since the response can no longer change.
pub struct ObjectStorageReader {
    provider: Arc<dyn BlobStoreProvider>,
    chunk_size: usize,
    span: Span,
}

impl ObjectStorageReader {
    pub fn new(provider: Arc<dyn BlobStoreProvider>, chunk_size: usize, span: Span) -> Self {
        Self {
            provider,
            chunk_size,
            span,
        }
    }

    /// Try to stream the blob for `metadata` into `sink`.
    pub async fn try_fetch<S>(&self, metadata: &FileMetadata, sink: &mut S) -> TierOutcome
    where
        S: ResponseSink + ?Sized,
    {
        self.fetch(metadata, sink)
            .instrument(self.span.clone())
            .await
    }

    async fn fetch<S>(&self, metadata: &FileMetadata, sink: &mut S) -> TierOutcome
    where
        S: ResponseSink + ?Sized,
    {
        let content_id = metadata.content_id;

        let store = match self.provider.connect().await {
            Ok(store) => store,
            Err(e) if e.is_config_error() => return TierOutcome::Fatal(e.into()),
            Err(e) => {
                tracing::error!(error = %e, content_id = %content_id, "Object storage connection failed, falling back to database");
                return TierOutcome::SoftMiss;
            }
        };

        match store.container_exists().await {
            Ok(true) => {}
            Ok(false) => {
                return TierOutcome::Fatal(AppError::Configuration(format!(
                    "Object storage container doesn't exist: {}",
                    store.container()
                )))
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    container = %store.container(),
                    content_id = %content_id,
                    "Object storage container check failed, falling back to database"
                );
                return TierOutcome::SoftMiss;
            }
        }

        let key = blob_key(content_id);
        let length = match store.content_length(&key).await {
            Ok(Some(length)) => length,
            Ok(None) => {
                tracing::debug!(key = %key, "Blob not in object storage, falling back to database");
                return TierOutcome::SoftMiss;
            }
            Err(e) => {
                tracing::error!(error = %e, key = %key, "Object storage lookup failed, falling back to database");
                return TierOutcome::SoftMiss;
            }
        };

        let start = std::time::Instant::now();
        match self
            .stream_blob(store.as_ref(), &key, &metadata.file_name, length, sink)
            .await
        {
            Ok(written) => {
                tracing::info!(
                    key = %key,
                    container = %store.container(),
                    size_bytes = written,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "Served content from object storage"
                );
                TierOutcome::Found(written)
            }
            Err(e) if sink.committed() => {
                tracing::error!(error = %e, key = %key, "Object storage transfer failed after response started");
                TierOutcome::Fatal(e)
            }
            Err(AppError::NotFound(_)) => {
                tracing::debug!(key = %key, "Blob disappeared before download, falling back to database");
                TierOutcome::SoftMiss
            }
            Err(e) => {
                tracing::error!(error = %e, key = %key, "Object storage download failed, falling back to database");
                TierOutcome::SoftMiss
            }
        }
    }

    async fn stream_blob<S>(
        &self,
        store: &dyn BlobStore,
        key: &str,
        file_name: &str,
        length: u64,
        sink: &mut S,
    ) -> Result<u64, AppError>
    where
        S: ResponseSink + ?Sized,
    {
        let stream = store.get_stream(key).await?;
        sink.start(ResponseHeaders::for_file(file_name, length));

        let mut source = StreamSource::new(stream);
        let written = copy_chunked(&mut source, sink, self.chunk_size).await?;
        if written != length {
            return Err(StorageError::DownloadFailed(format!(
                "blob {} changed during download: expected {} bytes, read {}",
                key, length, written
            ))
            .into());
        }
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::ObjectStoreBlobStore;
    use crate::provider::StaticBlobStoreProvider;
    use crate::traits::{BlobStream, StorageResult};
    use crate::transfer::ChunkSink;
    use async_trait::async_trait;
    use bytes::Bytes;
    use object_store::memory::InMemory;
    use object_store::path::Path;
    use object_store::{ObjectStore, ObjectStoreExt, PutPayload};
    use uuid::Uuid;
    use vellum_core::StorageLocation;

    #[derive(Default)]
    struct TestSink {
        headers: Option<ResponseHeaders>,
        body: Vec<u8>,
        flushes: usize,
    }

    #[async_trait]
    impl ChunkSink for TestSink {
        async fn write_chunk(&mut self, chunk: Bytes) -> Result<(), AppError> {
            self.body.extend_from_slice(&chunk);
            Ok(())
        }

        async fn flush(&mut self) -> Result<(), AppError> {
            self.flushes += 1;
            Ok(())
        }
    }

    impl ResponseSink for TestSink {
        fn start(&mut self, headers: ResponseHeaders) {
            self.headers = Some(headers);
        }

        fn committed(&self) -> bool {
            !self.body.is_empty()
        }
    }

    struct FailingStore {
        exists: StorageResult<bool>,
    }

    #[async_trait]
    impl BlobStore for FailingStore {
        fn container(&self) -> &str {
            "documents"
        }

        async fn container_exists(&self) -> StorageResult<bool> {
            match self.exists {
                Ok(v) => Ok(v),
                Err(_) => Err(StorageError::BackendError("timeout".to_string())),
            }
        }

        async fn content_length(&self, _key: &str) -> StorageResult<Option<u64>> {
            Ok(Some(4))
        }

        async fn get_stream(&self, _key: &str) -> StorageResult<BlobStream> {
            Err(StorageError::DownloadFailed("connection reset".to_string()))
        }
    }

    fn metadata(content_id: Uuid) -> FileMetadata {
        FileMetadata {
            content_id,
            file_name: "contract.pdf".to_string(),
            storage_location: StorageLocation::External,
            size: 0,
        }
    }

    fn reader_for(store: Arc<dyn BlobStore>) -> ObjectStorageReader {
        ObjectStorageReader::new(
            Arc::new(StaticBlobStoreProvider::new(store)),
            4,
            Span::none(),
        )
    }

    async fn memory_store_with(content_id: Uuid, data: &'static [u8]) -> Arc<dyn BlobStore> {
        let memory: Arc<dyn ObjectStore> = Arc::new(InMemory::new());
        memory
            .put(
                &Path::from(format!("documents/{}", blob_key(content_id))),
                PutPayload::from(Bytes::from_static(data)),
            )
            .await
            .unwrap();
        Arc::new(ObjectStoreBlobStore::new(memory, "documents"))
    }

    #[tokio::test]
    async fn test_existing_blob_is_streamed_with_its_length() {
        let id = Uuid::new_v4();
        let reader = reader_for(memory_store_with(id, b"ten bytes!").await);
        let mut sink = TestSink::default();

        let outcome = reader.try_fetch(&metadata(id), &mut sink).await;

        assert!(matches!(outcome, TierOutcome::Found(10)));
        assert_eq!(sink.body, b"ten bytes!");
        assert_eq!(sink.flushes, 3);
        let headers = sink.headers.unwrap();
        assert_eq!(headers.content_length, 10);
        assert_eq!(headers.content_type, "application/pdf");
    }

    #[tokio::test]
    async fn test_absent_blob_is_soft_miss() {
        let reader = reader_for(memory_store_with(Uuid::new_v4(), b"other").await);
        let mut sink = TestSink::default();

        let outcome = reader.try_fetch(&metadata(Uuid::new_v4()), &mut sink).await;

        assert!(matches!(outcome, TierOutcome::SoftMiss));
        assert!(sink.headers.is_none());
    }

    #[tokio::test]
    async fn test_missing_container_is_fatal() {
        let reader = reader_for(Arc::new(FailingStore { exists: Ok(false) }));
        let mut sink = TestSink::default();

        match reader.try_fetch(&metadata(Uuid::new_v4()), &mut sink).await {
            TierOutcome::Fatal(AppError::Configuration(msg)) => {
                assert!(msg.contains("container doesn't exist"))
            }
            other => panic!("expected fatal configuration error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_container_check_failure_is_soft_miss() {
        let reader = reader_for(Arc::new(FailingStore {
            exists: Err(StorageError::BackendError(String::new())),
        }));
        let mut sink = TestSink::default();

        let outcome = reader.try_fetch(&metadata(Uuid::new_v4()), &mut sink).await;
        assert!(matches!(outcome, TierOutcome::SoftMiss));
    }

    #[tokio::test]
    async fn test_fetch_failure_before_first_byte_is_soft_miss() {
        let reader = reader_for(Arc::new(FailingStore { exists: Ok(true) }));
        let mut sink = TestSink::default();

        let outcome = reader.try_fetch(&metadata(Uuid::new_v4()), &mut sink).await;
        assert!(matches!(outcome, TierOutcome::SoftMiss));
        assert!(!sink.committed());
    }

    #[tokio::test]
    async fn test_configuration_error_from_provider_is_fatal() {
        struct Unconfigured;

        #[async_trait]
        impl BlobStoreProvider for Unconfigured {
            async fn connect(&self) -> StorageResult<Arc<dyn BlobStore>> {
                Err(StorageError::ConfigError("Invalid connection string".to_string()))
            }
        }

        let reader = ObjectStorageReader::new(Arc::new(Unconfigured), 4, Span::none());
        let mut sink = TestSink::default();

        let outcome = reader.try_fetch(&metadata(Uuid::new_v4()), &mut sink).await;
        assert!(matches!(outcome, TierOutcome::Fatal(AppError::Configuration(_))));
    }

    /// Serves one chunk, then fails mid-transfer.
    struct BrokenStreamStore;

    #[async_trait]
    impl BlobStore for BrokenStreamStore {
        fn container(&self) -> &str {
            "documents"
        }

        async fn container_exists(&self) -> StorageResult<bool> {
            Ok(true)
        }

        async fn content_length(&self, _key: &str) -> StorageResult<Option<u64>> {
            Ok(Some(8))
        }

        async fn get_stream(&self, _key: &str) -> StorageResult<BlobStream> {
            let parts: Vec<Result<Bytes, StorageError>> = vec![
                Ok(Bytes::from_static(b"abcd")),
                Err(StorageError::DownloadFailed("connection reset".to_string())),
            ];
            Ok(Box::pin(futures::stream::iter(parts)))
        }
    }

    #[tokio::test]
    async fn test_failure_after_first_byte_is_fatal() {
        let reader = reader_for(Arc::new(BrokenStreamStore));
        let mut sink = TestSink::default();

        match reader.try_fetch(&metadata(Uuid::new_v4()), &mut sink).await {
            TierOutcome::Fatal(AppError::Storage(msg)) => assert!(msg.contains("connection reset")),
            other => panic!("expected fatal storage error, got {:?}", other),
        }
        assert_eq!(sink.body, b"abcd");
    }

    #[tokio::test]
    async fn test_missing_azure_container_is_fatal() {
        let addr = crate::test_support::serve_not_found("ContainerNotFound").await;
        let conn: crate::connection::ConnectionString = format!(
            "AccountName=acme;AccountKey=a2V5Cg==;BlobEndpoint=http://{}/acme",
            addr
        )
        .parse()
        .unwrap();
        let reader = reader_for(Arc::new(conn.build_store("missing-container").unwrap()));
        let mut sink = TestSink::default();

        match reader.try_fetch(&metadata(Uuid::new_v4()), &mut sink).await {
            TierOutcome::Fatal(AppError::Configuration(msg)) => {
                assert!(msg.contains("missing-container"), "got {}", msg)
            }
            other => panic!("expected fatal configuration error, got {:?}", other),
        }
        assert!(sink.headers.is_none());
    }
}
