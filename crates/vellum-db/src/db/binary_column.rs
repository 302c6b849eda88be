//! Offset-based bytea primitives.

use crate::missing_content_message;
use async_trait::async_trait;
use bytes::Bytes;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;
use vellum_core::AppError;
use vellum_storage::ChunkSource;

/// Insert a content row with a zero-length payload.
pub async fn insert_placeholder(conn: &mut PgConnection, content_id: Uuid) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO file_content (id, content, size, external_storage)
        VALUES ($1, ''::bytea, 0, false)
        "#,
    )
    .bind(content_id)
    .execute(conn)
    .await
    .map(drop)
}

/// Write `data` at byte `offset` (zero-based) of the payload, extending it as needed.
pub async fn write_at(
    conn: &mut PgConnection,
    content_id: Uuid,
    offset: u64,
    data: &[u8],
) -> Result<(), AppError> {
    let position = sql_position(offset)?;
    let result = sqlx::query(
        r#"
        UPDATE file_content
        SET content = overlay(content PLACING $2 FROM $3)
        WHERE id = $1
        "#,
    )
    .bind(content_id)
    .bind(data)
    .bind(position)
    .execute(conn)
    .await?;

    if result.rows_affected() != 1 {
        return Err(AppError::NotFound(missing_content_message(content_id)));
    }
    Ok(())
}

/// One-based SQL position for a zero-based offset.
fn sql_position(offset: u64) -> Result<i32, AppError> {
    offset
        .checked_add(1)
        .and_then(|p| i32::try_from(p).ok())
        .ok_or_else(|| AppError::InvalidInput(format!("offset {} exceeds bytea limits", offset)))
}

/// Sequential reader issuing one `substring` query per chunk.
///
/// A chunk shorter than requested ends the read without another round trip.
pub struct BinaryColumnSource {
    pool: PgPool,
    content_id: Uuid,
    offset: u64,
    exhausted: bool,
}

impl BinaryColumnSource {
    pub fn new(pool: PgPool, content_id: Uuid) -> Self {
        Self {
            pool,
            content_id,
            offset: 0,
            exhausted: false,
        }
    }
}

#[async_trait]
impl ChunkSource for BinaryColumnSource {
    async fn read_chunk(&mut self, max: usize) -> Result<Bytes, AppError> {
        if self.exhausted || max == 0 {
            return Ok(Bytes::new());
        }

        let position = sql_position(self.offset)?;
        let len = i32::try_from(max).unwrap_or(i32::MAX);
        let row: Option<Option<Vec<u8>>> = sqlx::query_scalar(
            r#"
            SELECT substring(content FROM $2 FOR $3)
            FROM file_content
            WHERE id = $1
            "#,
        )
        .bind(self.content_id)
        .bind(position)
        .bind(len)
        .fetch_optional(&self.pool)
        .await?;

        let data = row
            .ok_or_else(|| AppError::NotFound(missing_content_message(self.content_id)))?
            .unwrap_or_default();

        if data.len() < max {
            self.exhausted = true;
        }
        self.offset += data.len() as u64;
        Ok(Bytes::from(data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sql_position_is_one_based() {
        assert_eq!(sql_position(0).unwrap(), 1);
        assert_eq!(sql_position(102_400).unwrap(), 102_401);
    }

    #[test]
    fn test_sql_position_rejects_overflow() {
        assert!(sql_position(i32::MAX as u64).is_err());
    }
}
