//! Large-object primitives.
//!
//! Descriptors returned by `lo_open` belong to the current transaction and are closed
//! automatically when it ends, whichever way it ends.

use async_trait::async_trait;
use bytes::Bytes;
use sqlx::postgres::types::Oid;
use sqlx::PgConnection;
use vellum_core::AppError;
use vellum_storage::ChunkSource;

/// `INV_READ` mode flag for `lo_open`.
pub const INV_READ: i32 = 0x0004_0000;
/// `INV_WRITE` mode flag for `lo_open`.
pub const INV_WRITE: i32 = 0x0002_0000;

/// Allocate a new, empty large object.
pub async fn create(conn: &mut PgConnection) -> Result<Oid, sqlx::Error> {
    sqlx::query_scalar("SELECT lo_create(0)")
        .fetch_one(conn)
        .await
}

/// Open a descriptor on `oid` with the given mode.
pub async fn open(conn: &mut PgConnection, oid: Oid, mode: i32) -> Result<i32, sqlx::Error> {
    sqlx::query_scalar("SELECT lo_open($1, $2)")
        .bind(oid)
        .bind(mode)
        .fetch_one(conn)
        .await
}

/// Read up to `len` bytes at the descriptor's current position.
pub async fn read(conn: &mut PgConnection, fd: i32, len: usize) -> Result<Vec<u8>, sqlx::Error> {
    let len = i32::try_from(len).unwrap_or(i32::MAX);
    sqlx::query_scalar("SELECT loread($1, $2)")
        .bind(fd)
        .bind(len)
        .fetch_one(conn)
        .await
}

/// Write `data` at the descriptor's current position. Returns the byte count written.
pub async fn write(conn: &mut PgConnection, fd: i32, data: &[u8]) -> Result<i32, sqlx::Error> {
    sqlx::query_scalar("SELECT lowrite($1, $2)")
        .bind(fd)
        .bind(data)
        .fetch_one(conn)
        .await
}

pub async fn close(conn: &mut PgConnection, fd: i32) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT lo_close($1)")
        .bind(fd)
        .execute(conn)
        .await
        .map(drop)
}

/// Sequential reader over an open descriptor.
pub struct LargeObjectSource<'c> {
    conn: &'c mut PgConnection,
    fd: i32,
}

impl<'c> LargeObjectSource<'c> {
    pub fn new(conn: &'c mut PgConnection, fd: i32) -> Self {
        Self { conn, fd }
    }
}

#[async_trait]
impl<'c> ChunkSource for LargeObjectSource<'c> {
    async fn read_chunk(&mut self, max: usize) -> Result<Bytes, AppError> {
        let data = read(&mut *self.conn, self.fd, max).await?;
        Ok(Bytes::from(data))
    }
}
