//! Blob store providers.

use crate::connection::ConnectionString;
use crate::traits::{BlobStore, BlobStoreProvider, StorageError, StorageResult};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::OnceCell;
use vellum_core::ObjectStorageSettings;

/// Resolves the connection string from the environment variable named in the settings.
///
/// The variable is read on first use rather than at startup. A successful connection is
/// kept for the lifetime of the provider; failures are not cached, so correcting the
/// environment takes effect on the next request.
pub struct EnvBlobStoreProvider {
    settings: ObjectStorageSettings,
    store: OnceCell<Arc<dyn BlobStore>>,
}

impl EnvBlobStoreProvider {
    pub fn new(settings: ObjectStorageSettings) -> Self {
        Self {
            settings,
            store: OnceCell::new(),
        }
    }

    fn build(&self) -> StorageResult<Arc<dyn BlobStore>> {
        let variable = self.settings.connection_variable.as_deref().ok_or_else(|| {
            StorageError::ConfigError("Object storage connection variable name missing".to_string())
        })?;

        let raw = std::env::var(variable)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| {
                StorageError::ConfigError(format!(
                    "Object storage environment variable missing: {}",
                    variable
                ))
            })?;

        let connection: ConnectionString = raw.parse()?;

        let container = self.settings.container.as_deref().ok_or_else(|| {
            StorageError::ConfigError("Object storage container name missing".to_string())
        })?;

        let store = connection.build_store(container)?;
        tracing::info!(
            variable = %variable,
            container = %container,
            "Object storage connection established"
        );
        Ok(Arc::new(store))
    }
}

#[async_trait]
impl BlobStoreProvider for EnvBlobStoreProvider {
    async fn connect(&self) -> StorageResult<Arc<dyn BlobStore>> {
        self.store
            .get_or_try_init(|| async { self.build() })
            .await
            .cloned()
    }
}

/// Provider around an already-built store.
#[derive(Clone)]
pub struct StaticBlobStoreProvider {
    store: Arc<dyn BlobStore>,
}

impl StaticBlobStoreProvider {
    pub fn new(store: Arc<dyn BlobStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl BlobStoreProvider for StaticBlobStoreProvider {
    async fn connect(&self) -> StorageResult<Arc<dyn BlobStore>> {
        Ok(self.store.clone())
    }
}
