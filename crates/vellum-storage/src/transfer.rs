//! Chunked transfer primitive
//!
//! Every tier moves bytes through [`copy_chunked`]: read at most one chunk from a
//! [`ChunkSource`], write it to a [`ChunkSink`], flush, repeat. Only one chunk is held
//! in memory at a time and the next read never starts before the previous write has
//! completed, so a slow or closed sink stops the loop immediately.

use crate::headers::ResponseHeaders;
use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures::{Stream, StreamExt};
use tokio::io::{AsyncRead, AsyncReadExt};
use vellum_core::AppError;

/// Producer of sequential chunks.
#[async_trait]
pub trait ChunkSource: Send {
    /// Read up to `max` bytes. An empty chunk means the source is exhausted.
    async fn read_chunk(&mut self, max: usize) -> Result<Bytes, AppError>;
}

/// Consumer of sequential chunks.
#[async_trait]
pub trait ChunkSink: Send {
    async fn write_chunk(&mut self, chunk: Bytes) -> Result<(), AppError>;

    async fn flush(&mut self) -> Result<(), AppError>;
}

/// A sink that answers a download request.
///
/// Headers are buffered by [`ResponseSink::start`] and only become visible with the
/// first chunk, so a tier that fails before writing anything can still hand over to
/// the next tier, which calls `start` again with its own headers.
pub trait ResponseSink: ChunkSink {
    /// Set the pending response headers, replacing any previously set.
    fn start(&mut self, headers: ResponseHeaders);

    /// True once any byte has been handed to the client.
    fn committed(&self) -> bool;
}

/// Copy `source` into `sink` in chunks of at most `chunk_size` bytes, flushing after
/// every chunk. Returns the number of bytes copied.
pub async fn copy_chunked<S, K>(
    source: &mut S,
    sink: &mut K,
    chunk_size: usize,
) -> Result<u64, AppError>
where
    S: ChunkSource + ?Sized,
    K: ChunkSink + ?Sized,
{
    if chunk_size == 0 {
        return Err(AppError::InvalidInput(
            "chunk size must be greater than zero".to_string(),
        ));
    }

    let mut total: u64 = 0;
    loop {
        let chunk = source.read_chunk(chunk_size).await?;
        if chunk.is_empty() {
            break;
        }
        total += chunk.len() as u64;
        sink.write_chunk(chunk).await?;
        sink.flush().await?;
    }
    Ok(total)
}

/// Chunk source over an `AsyncRead`.
///
/// Each chunk is filled completely unless the reader ends, so a 250 KiB body read with
/// 100 KiB chunks yields exactly 100, 100 and 50 KiB.
pub struct ReaderSource<R> {
    reader: R,
    eof: bool,
}

impl<R> ReaderSource<R>
where
    R: AsyncRead + Unpin + Send,
{
    pub fn new(reader: R) -> Self {
        Self { reader, eof: false }
    }
}

#[async_trait]
impl<R> ChunkSource for ReaderSource<R>
where
    R: AsyncRead + Unpin + Send,
{
    async fn read_chunk(&mut self, max: usize) -> Result<Bytes, AppError> {
        if self.eof || max == 0 {
            return Ok(Bytes::new());
        }

        let mut buf = BytesMut::with_capacity(max);
        while buf.len() < max {
            let n = (&mut self.reader)
                .take((max - buf.len()) as u64)
                .read_buf(&mut buf)
                .await?;
            if n == 0 {
                self.eof = true;
                break;
            }
        }
        Ok(buf.freeze())
    }
}

/// Chunk source over a stream of byte buffers of arbitrary size.
///
/// Buffers larger than the requested chunk are split; smaller ones are passed through
/// as they arrive.
pub struct StreamSource<St> {
    stream: St,
    pending: Bytes,
    done: bool,
}

impl<St> StreamSource<St> {
    pub fn new(stream: St) -> Self {
        Self {
            stream,
            pending: Bytes::new(),
            done: false,
        }
    }
}

#[async_trait]
impl<St, E> ChunkSource for StreamSource<St>
where
    St: Stream<Item = Result<Bytes, E>> + Unpin + Send,
    E: Into<AppError> + Send,
{
    async fn read_chunk(&mut self, max: usize) -> Result<Bytes, AppError> {
        loop {
            if !self.pending.is_empty() {
                let n = max.min(self.pending.len());
                return Ok(self.pending.split_to(n));
            }
            if self.done || max == 0 {
                return Ok(Bytes::new());
            }
            match self.stream.next().await {
                Some(Ok(bytes)) => self.pending = bytes,
                Some(Err(e)) => return Err(e.into()),
                None => self.done = true,
            }
        }
    }
}
