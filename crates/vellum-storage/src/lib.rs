//! Vellum Storage Library
//!
//! This crate provides the chunked transfer primitive shared by every content tier and
//! the external object storage tier built on `object_store`.
//!
//! # Blob key format
//!
//! The blob holding content `X` is named `doc-X` inside the configured container. Key
//! generation is centralized in the `keys` module.
//!
//! # Connection strings
//!
//! Object storage is addressed by a connection string read from an environment variable
//! whose *name* is configured. Both Azure-style `Key=Value;...` strings and object store
//! URLs (`s3://`, `gs://`, `az://`, `file://`, `memory://`) are accepted; see
//! [`connection`].

pub mod connection;
pub mod headers;
pub mod keys;
pub mod object;
pub mod provider;
pub mod reader;
pub mod traits;
pub mod transfer;

#[cfg(test)]
mod test_support;

// Re-export commonly used types
pub use connection::ConnectionString;
pub use headers::ResponseHeaders;
pub use object::{ContainerCheck, ObjectStoreBlobStore};
pub use provider::{EnvBlobStoreProvider, StaticBlobStoreProvider};
pub use reader::{ObjectStorageReader, TierOutcome};
pub use traits::{BlobStore, BlobStoreProvider, BlobStream, StorageError, StorageResult};
pub use transfer::{
    copy_chunked, ChunkSink, ChunkSource, ReaderSource, ResponseSink, StreamSource,
};
