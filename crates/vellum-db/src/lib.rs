//! Vellum Database Library
//!
//! Postgres access for document content: resolving download metadata, detecting how the
//! `file_content.content` column stores bytes, reading through the large-object and
//! bytea tiers, and the transactional ingestion path. With the `test-utils` feature,
//! `memory` provides an in-process implementation of the same traits.

pub mod db;
#[cfg(any(test, feature = "test-utils"))]
pub mod memory;
pub mod traits;

pub use db::{DocumentMetadataRepository, FileContentRepository, PgIngestTransaction};
#[cfg(any(test, feature = "test-utils"))]
pub use memory::{IngestStats, InMemoryContentDatabase};
pub use traits::{ContentDatabase, IngestTransaction, MetadataResolver};

/// Not-found message for a content identifier with no `file_content` row.
pub fn missing_content_message(content_id: uuid::Uuid) -> String {
    format!("Missing FileContent '{}'", content_id)
}
