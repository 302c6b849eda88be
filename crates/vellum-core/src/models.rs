//! Domain models shared between the storage tiers and the gateway.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Where a content payload lives.
///
/// Set once when the content row is created; nothing in this system moves a payload
/// between tiers afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageLocation {
    /// Payload is held in the external object store.
    External,
    /// Payload is held by the database (large object or bytea column).
    Database,
}

impl StorageLocation {
    pub fn from_external_flag(external: bool) -> Self {
        if external {
            StorageLocation::External
        } else {
            StorageLocation::Database
        }
    }

    pub fn is_external(&self) -> bool {
        matches!(self, StorageLocation::External)
    }
}

/// How the database stores content, as reported by the capability check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentCapability {
    /// Content column holds large-object references read through transaction-bound handles.
    LargeObject,
    /// Content column holds the bytes inline (bytea).
    BinaryColumn,
}

impl ContentCapability {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentCapability::LargeObject => "large_object",
            ContentCapability::BinaryColumn => "binary_column",
        }
    }
}

impl std::fmt::Display for ContentCapability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifier a caller can request content by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentTarget {
    /// A document version; its file name is the stored one.
    DocumentVersion(Uuid),
    /// A bare content identifier; no file name is known.
    Content(Uuid),
}

/// Request-scoped description of one downloadable payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMetadata {
    pub content_id: Uuid,
    pub file_name: String,
    pub storage_location: StorageLocation,
    /// Declared byte length of the payload.
    pub size: u64,
}

impl FileMetadata {
    /// Replace the file name with a caller-supplied one, if any.
    pub fn with_file_name_override(self, file_name: Option<String>) -> Self {
        match file_name {
            Some(file_name) => Self { file_name, ..self },
            None => self,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadStatus {
    Success,
    ClientError,
    ServerError,
}

impl UploadStatus {
    pub fn http_status_code(&self) -> u16 {
        match self {
            UploadStatus::Success => 200,
            UploadStatus::ClientError => 400,
            UploadStatus::ServerError => 500,
        }
    }
}

/// Outcome of one ingestion call. Failures are carried here, never raised.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadResult {
    pub content_id: Uuid,
    pub status: UploadStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl UploadResult {
    pub fn success(content_id: Uuid) -> Self {
        Self {
            content_id,
            status: UploadStatus::Success,
            error: None,
        }
    }

    pub fn failure(content_id: Uuid, status: UploadStatus, error: impl Into<String>) -> Self {
        Self {
            content_id,
            status,
            error: Some(error.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == UploadStatus::Success
    }
}
