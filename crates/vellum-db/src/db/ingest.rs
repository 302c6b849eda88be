//! Ingestion transaction over Postgres.

use crate::db::binary_column;
use crate::db::capability;
use crate::db::large_object::{self, INV_WRITE};
use crate::traits::IngestTransaction;
use async_trait::async_trait;
use bytes::Bytes;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;
use vellum_core::{AppError, ContentCapability};
use vellum_storage::ChunkSink;

/// Open write path inside the transaction.
#[derive(Debug, Clone, Copy)]
enum WriteTarget {
    LargeObject { content_id: Uuid, fd: i32 },
    BinaryColumn { content_id: Uuid },
}

impl WriteTarget {
    fn content_id(&self) -> Uuid {
        match *self {
            WriteTarget::LargeObject { content_id, .. } | WriteTarget::BinaryColumn { content_id } => {
                content_id
            }
        }
    }
}

/// Read-uncommitted transaction holding one content row being written.
pub struct PgIngestTransaction {
    tx: Transaction<'static, Postgres>,
    target: Option<WriteTarget>,
    written: u64,
}

impl PgIngestTransaction {
    pub async fn begin(pool: &PgPool) -> Result<Self, AppError> {
        let mut tx = pool.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL READ UNCOMMITTED")
            .execute(&mut *tx)
            .await?;
        Ok(Self {
            tx,
            target: None,
            written: 0,
        })
    }

    fn target(&self) -> Result<WriteTarget, AppError> {
        self.target
            .ok_or_else(|| AppError::Internal("no content row opened for writing".to_string()))
    }
}

#[async_trait]
impl ChunkSink for PgIngestTransaction {
    async fn write_chunk(&mut self, chunk: Bytes) -> Result<(), AppError> {
        match self.target()? {
            WriteTarget::LargeObject { fd, .. } => {
                let n = large_object::write(&mut self.tx, fd, &chunk).await?;
                if usize::try_from(n).ok() != Some(chunk.len()) {
                    return Err(AppError::Transfer(format!(
                        "short large object write: {} of {} bytes",
                        n,
                        chunk.len()
                    )));
                }
            }
            WriteTarget::BinaryColumn { content_id } => {
                binary_column::write_at(&mut self.tx, content_id, self.written, &chunk).await?;
            }
        }
        self.written += chunk.len() as u64;
        Ok(())
    }

    async fn flush(&mut self) -> Result<(), AppError> {
        // Each chunk is a completed statement; nothing is buffered client-side.
        Ok(())
    }
}

#[async_trait]
impl IngestTransaction for PgIngestTransaction {
    async fn detect_capability(&mut self) -> Result<ContentCapability, AppError> {
        capability::detect(&mut *self.tx).await
    }

    #[tracing::instrument(skip(self), fields(db.table = "file_content"))]
    async fn create_content(
        &mut self,
        content_id: Uuid,
        capability: ContentCapability,
    ) -> Result<(), AppError> {
        let target = match capability {
            ContentCapability::LargeObject => {
                let oid = large_object::create(&mut self.tx).await?;
                sqlx::query(
                    r#"
                    INSERT INTO file_content (id, content, size, external_storage)
                    VALUES ($1, $2, 0, false)
                    "#,
                )
                .bind(content_id)
                .bind(oid)
                .execute(&mut *self.tx)
                .await?;
                let fd = large_object::open(&mut self.tx, oid, INV_WRITE).await?;
                WriteTarget::LargeObject { content_id, fd }
            }
            ContentCapability::BinaryColumn => {
                binary_column::insert_placeholder(&mut self.tx, content_id).await?;
                WriteTarget::BinaryColumn { content_id }
            }
        };
        self.target = Some(target);
        self.written = 0;
        Ok(())
    }

    async fn finalize(&mut self) -> Result<u64, AppError> {
        let target = self.target()?;
        if let WriteTarget::LargeObject { fd, .. } = target {
            large_object::close(&mut self.tx, fd).await?;
        }

        let size = i64::try_from(self.written)
            .map_err(|_| AppError::InvalidInput("content too large".to_string()))?;
        sqlx::query("UPDATE file_content SET size = $2 WHERE id = $1")
            .bind(target.content_id())
            .bind(size)
            .execute(&mut *self.tx)
            .await?;
        Ok(self.written)
    }

    async fn commit(self: Box<Self>) -> Result<(), AppError> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), AppError> {
        self.tx.rollback().await?;
        Ok(())
    }
}
