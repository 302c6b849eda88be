//! Object storage setup

use std::sync::Arc;
use vellum_core::Config;
use vellum_storage::{BlobStoreProvider, EnvBlobStoreProvider};

/// Build the object storage provider.
///
/// Nothing is resolved here: the connection string is read on first use, so missing
/// settings only fail downloads of externally stored content.
pub fn setup_object_storage(config: &Config) -> Arc<dyn BlobStoreProvider> {
    let settings = config.object_storage.clone();
    match (&settings.connection_variable, &settings.container) {
        (Some(variable), Some(container)) => tracing::info!(
            connection_variable = %variable,
            container = %container,
            "Object storage configured"
        ),
        _ => tracing::warn!(
            "Object storage not fully configured; externally stored content cannot be served"
        ),
    }
    Arc::new(EnvBlobStoreProvider::new(settings))
}
