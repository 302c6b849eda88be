//! Download metadata repository: resolves document versions and bare content ids.

use crate::missing_content_message;
use crate::traits::MetadataResolver;
use async_trait::async_trait;
use sqlx::{PgPool, Postgres};
use uuid::Uuid;
use vellum_core::constants::UNKNOWN_FILE_NAME;
use vellum_core::{AppError, ContentTarget, FileMetadata, StorageLocation};

/// Row shared by both lookups.
#[derive(Debug, sqlx::FromRow)]
pub struct FileMetadataRow {
    pub content_id: Uuid,
    pub file_name: Option<String>,
    pub size: i64,
    pub external_storage: bool,
}

impl FileMetadataRow {
    pub fn to_file_metadata(self) -> FileMetadata {
        FileMetadata {
            content_id: self.content_id,
            file_name: self
                .file_name
                .unwrap_or_else(|| UNKNOWN_FILE_NAME.to_string()),
            storage_location: StorageLocation::from_external_flag(self.external_storage),
            size: u64::try_from(self.size).unwrap_or(0),
        }
    }
}

/// Repository over `document_version` and `file_content` metadata columns.
#[derive(Clone)]
pub struct DocumentMetadataRepository {
    pool: PgPool,
}

impl DocumentMetadataRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[tracing::instrument(skip(self), fields(db.table = "document_version"))]
    pub async fn by_document_version(&self, id: Uuid) -> Result<FileMetadata, AppError> {
        let row = sqlx::query_as::<Postgres, FileMetadataRow>(
            r#"
            SELECT dv.file_content_id AS content_id,
                   dv.file_name,
                   fc.size,
                   fc.external_storage
            FROM document_version dv
            JOIN file_content fc ON fc.id = dv.file_content_id
            WHERE dv.id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(FileMetadataRow::to_file_metadata)
            .ok_or_else(|| AppError::NotFound(format!("Missing DocumentVersion '{}'", id)))
    }

    #[tracing::instrument(skip(self), fields(db.table = "file_content"))]
    pub async fn by_content_id(&self, id: Uuid) -> Result<FileMetadata, AppError> {
        let row = sqlx::query_as::<Postgres, FileMetadataRow>(
            r#"
            SELECT id AS content_id,
                   NULL::text AS file_name,
                   size,
                   external_storage
            FROM file_content
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(FileMetadataRow::to_file_metadata)
            .ok_or_else(|| AppError::NotFound(missing_content_message(id)))
    }
}

#[async_trait]
impl MetadataResolver for DocumentMetadataRepository {
    async fn resolve(&self, target: ContentTarget) -> Result<FileMetadata, AppError> {
        match target {
            ContentTarget::DocumentVersion(id) => self.by_document_version(id).await,
            ContentTarget::Content(id) => self.by_content_id(id).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_without_file_name_uses_placeholder() {
        let row = FileMetadataRow {
            content_id: Uuid::new_v4(),
            file_name: None,
            size: 12,
            external_storage: true,
        };
        let meta = row.to_file_metadata();
        assert_eq!(meta.file_name, "unknown.txt");
        assert_eq!(meta.size, 12);
        assert!(meta.storage_location.is_external());
    }

    #[test]
    fn test_row_with_file_name() {
        let row = FileMetadataRow {
            content_id: Uuid::new_v4(),
            file_name: Some("minutes.docx".to_string()),
            size: 0,
            external_storage: false,
        };
        let meta = row.to_file_metadata();
        assert_eq!(meta.file_name, "minutes.docx");
        assert_eq!(meta.storage_location, StorageLocation::Database);
    }
}
