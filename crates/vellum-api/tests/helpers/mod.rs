//! Test helpers: build AppState and router over in-process backends.
//!
//! Run from workspace root: `cargo test -p vellum-api`. The content database is
//! `InMemoryContentDatabase` and object storage is `object_store`'s `InMemory`, so no
//! external services are needed.
#![allow(dead_code)]

use axum_test::TestServer;
use bytes::Bytes;
use object_store::memory::InMemory;
use object_store::path::Path;
use object_store::{ObjectStore, ObjectStoreExt, PutPayload};
use rand::RngCore;
use std::sync::Arc;
use uuid::Uuid;
use vellum_api::constants;
use vellum_api::setup::{routes, services};
use vellum_core::{ContentCapability, ObjectStorageSettings};
use vellum_db::InMemoryContentDatabase;
use vellum_storage::{
    BlobStore, BlobStoreProvider, EnvBlobStoreProvider, ObjectStoreBlobStore,
    StaticBlobStoreProvider,
};

pub const CHUNK_SIZE: usize = 100 * 1024;
pub const CONTAINER: &str = "documents";
pub const UNSET_CONNECTION_VARIABLE: &str = "VELLUM_API_TEST_UNSET_CONNECTION";

/// API path prefix for tests (e.g. `/api/v0`).
pub fn api_path(path: &str) -> String {
    format!("{}{}", constants::API_PREFIX, path)
}

/// Test application: server plus handles on the backends behind it.
pub struct TestApp {
    pub server: TestServer,
    pub db: InMemoryContentDatabase,
    pub objects: Arc<dyn ObjectStore>,
}

impl TestApp {
    pub fn client(&self) -> &TestServer {
        &self.server
    }

    /// Store `data` as the object storage blob for `content_id`.
    pub async fn put_blob(&self, content_id: Uuid, data: Vec<u8>) {
        self.objects
            .put(
                &Path::from(format!("{}/doc-{}", CONTAINER, content_id)),
                PutPayload::from(Bytes::from(data)),
            )
            .await
            .expect("Failed to store blob");
    }
}

fn build(
    db: InMemoryContentDatabase,
    provider: Arc<dyn BlobStoreProvider>,
    objects: Arc<dyn ObjectStore>,
) -> TestApp {
    let state = services::build_state(
        Arc::new(db.clone()),
        Arc::new(db.clone()),
        provider,
        CHUNK_SIZE,
        None,
    );
    let app = routes::setup_routes(state);
    let server = TestServer::new(app.into_make_service()).expect("Failed to create test server");
    TestApp {
        server,
        db,
        objects,
    }
}

/// Setup test app with the given database and a reachable in-memory object store.
pub fn setup_test_app_with(db: InMemoryContentDatabase) -> TestApp {
    let objects: Arc<dyn ObjectStore> = Arc::new(InMemory::new());
    let store: Arc<dyn BlobStore> =
        Arc::new(ObjectStoreBlobStore::new(objects.clone(), CONTAINER));
    build(db, Arc::new(StaticBlobStoreProvider::new(store)), objects)
}

/// Setup test app whose content column stores bytes the given way.
pub fn setup_test_app(capability: ContentCapability) -> TestApp {
    setup_test_app_with(InMemoryContentDatabase::new(capability))
}

/// Setup test app whose object storage settings name an unset environment variable.
pub fn setup_test_app_without_object_storage(capability: ContentCapability) -> TestApp {
    let settings = ObjectStorageSettings {
        connection_variable: Some(UNSET_CONNECTION_VARIABLE.to_string()),
        container: Some(CONTAINER.to_string()),
    };
    build(
        InMemoryContentDatabase::new(capability),
        Arc::new(EnvBlobStoreProvider::new(settings)),
        Arc::new(InMemory::new()),
    )
}

pub fn random_bytes(len: usize) -> Vec<u8> {
    let mut data = vec![0u8; len];
    rand::rng().fill_bytes(&mut data);
    data
}
