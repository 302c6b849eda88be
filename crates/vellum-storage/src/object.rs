//! `BlobStore` over any `object_store` backend.

use crate::traits::{BlobStore, BlobStream, StorageError, StorageResult};
use async_trait::async_trait;
use futures::StreamExt;
use object_store::path::Path;
use object_store::Error as ObjectStoreError;
use object_store::{ObjectStore, ObjectStoreExt};
use std::path::PathBuf;
use std::sync::Arc;

/// Markers a failed list request carries when the bucket or container itself is absent.
/// Listing an existing container never answers 404, whatever the prefix.
const MISSING_CONTAINER_MARKERS: &[&str] = &[
    "404 Not Found",
    "ContainerNotFound",
    "NoSuchBucket",
    "The specified bucket does not exist",
];

/// How [`BlobStore::container_exists`] decides whether the container is there.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContainerCheck {
    /// List the container; a 404 from the service means it does not exist.
    List,
    /// The container is a prefix with no existence of its own (`memory://`); it exists
    /// once something has been stored below it.
    Populated,
    /// The container is a directory on the local filesystem.
    Directory(PathBuf),
}

/// Object store addressing one container.
///
/// A container is either the store itself (Azure containers, where the client is
/// bound to it) or a top-level prefix inside the store (buckets, local roots, memory).
#[derive(Clone)]
pub struct ObjectStoreBlobStore {
    store: Arc<dyn ObjectStore>,
    container: String,
    prefix: Option<Path>,
    check: ContainerCheck,
}

impl std::fmt::Debug for ObjectStoreBlobStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectStoreBlobStore")
            .field("store", &self.store.to_string())
            .field("container", &self.container)
            .field("prefix", &self.prefix)
            .field("check", &self.check)
            .finish()
    }
}

impl ObjectStoreBlobStore {
    /// Use `container` as a top-level prefix of `store`.
    pub fn new(store: Arc<dyn ObjectStore>, container: impl Into<String>) -> Self {
        let container = container.into();
        let prefix = Path::from(container.as_str());
        Self::prefixed(store, prefix, container)
    }

    /// Store whose client is already bound to the container.
    pub fn container_scoped(store: Arc<dyn ObjectStore>, container: impl Into<String>) -> Self {
        Self {
            store,
            container: container.into(),
            prefix: None,
            check: ContainerCheck::List,
        }
    }

    pub(crate) fn prefixed(
        store: Arc<dyn ObjectStore>,
        prefix: Path,
        container: impl Into<String>,
    ) -> Self {
        Self {
            store,
            container: container.into(),
            prefix: Some(prefix),
            check: ContainerCheck::List,
        }
    }

    pub fn with_container_check(mut self, check: ContainerCheck) -> Self {
        self.check = check;
        self
    }

    fn location(&self, key: &str) -> Path {
        match self.prefix {
            Some(ref prefix) => prefix.child(key),
            None => Path::from(key),
        }
    }
}

/// Whether a failed list request reports that the bucket or container is absent.
///
/// Remote stores surface this as a generic error wrapping the HTTP response, so the
/// whole source chain is inspected.
pub fn is_missing_container(err: &ObjectStoreError) -> bool {
    if matches!(err, ObjectStoreError::NotFound { .. }) {
        return true;
    }

    let mut current: Option<&(dyn std::error::Error + 'static)> = Some(err);
    while let Some(e) = current {
        let message = e.to_string();
        if MISSING_CONTAINER_MARKERS
            .iter()
            .any(|marker| message.contains(marker))
        {
            return true;
        }
        current = e.source();
    }
    false
}

#[async_trait]
impl BlobStore for ObjectStoreBlobStore {
    fn container(&self) -> &str {
        &self.container
    }

    async fn container_exists(&self) -> StorageResult<bool> {
        match self.check {
            ContainerCheck::Directory(ref dir) => match tokio::fs::metadata(dir).await {
                Ok(meta) => Ok(meta.is_dir()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
                Err(e) => Err(StorageError::IoError(e)),
            },
            ContainerCheck::List | ContainerCheck::Populated => {
                match self.store.list_with_delimiter(self.prefix.as_ref()).await {
                    Ok(listing) if self.check == ContainerCheck::Populated => {
                        Ok(!listing.objects.is_empty() || !listing.common_prefixes.is_empty())
                    }
                    Ok(_) => Ok(true),
                    Err(e) if is_missing_container(&e) => Ok(false),
                    Err(e) => Err(StorageError::BackendError(e.to_string())),
                }
            }
        }
    }

    async fn content_length(&self, key: &str) -> StorageResult<Option<u64>> {
        let location = self.location(key);
        match self.store.head(&location).await {
            Ok(meta) => Ok(Some(meta.size)),
            Err(ObjectStoreError::NotFound { .. }) => Ok(None),
            Err(e) => Err(StorageError::BackendError(e.to_string())),
        }
    }

    async fn get_stream(&self, key: &str) -> StorageResult<BlobStream> {
        let start = std::time::Instant::now();
        let location = self.location(key);

        let result = self.store.get(&location).await.map_err(|e| match e {
            ObjectStoreError::NotFound { .. } => StorageError::NotFound(key.to_string()),
            other => StorageError::DownloadFailed(other.to_string()),
        })?;

        let container = self.container.clone();
        let key = key.to_string();

        let stream = result.into_stream().map(move |res| match res {
            Ok(bytes) => Ok(bytes),
            Err(e) => {
                tracing::error!(
                    error = %e,
                    container = %container,
                    key = %key,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "Object storage stream error"
                );
                Err(StorageError::DownloadFailed(e.to_string()))
            }
        });

        Ok(Box::pin(stream))
    }
}
