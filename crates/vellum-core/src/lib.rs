//! Vellum Core Library
//!
//! This crate provides the domain models, error types and configuration shared by
//! the storage tiers, the database layer and the HTTP gateway.

pub mod config;
pub mod constants;
pub mod error;
pub mod models;

// Re-export commonly used types
pub use config::{Config, LogFormat, ObjectStorageSettings};
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use models::{
    ContentCapability, ContentTarget, FileMetadata, StorageLocation, UploadResult, UploadStatus,
};
