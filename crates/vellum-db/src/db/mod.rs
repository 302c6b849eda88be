//! Postgres repositories
//!
//! `file_content.content` is either an `oid` column (payloads held as large objects,
//! read and written through transaction-bound descriptors) or a `bytea` column (payloads
//! read and written with offset SQL). [`capability`] tells the two apart from the
//! catalog.
//
// Capability detection
pub mod capability;
//
// Download metadata
pub mod metadata;
//
// Content reads and ingestion
pub mod binary_column;
pub mod content;
pub mod ingest;
pub mod large_object;

pub use content::FileContentRepository;
pub use ingest::PgIngestTransaction;
pub use metadata::DocumentMetadataRepository;
