//! Response sink backed by a bounded channel.
//!
//! The download runs in its own task and writes into a [`ChannelResponseSink`]. The
//! handler waits on [`ResponseStream::headers`]; headers are released only together with
//! the first chunk (or when an empty transfer finishes), so a failure before that point
//! still produces a clean JSON error instead of a truncated 200.

use axum::body::Body;
use axum::http::{header, HeaderValue, Response, StatusCode};
use bytes::Bytes;
use std::io;
use tokio::sync::{mpsc, oneshot};
use tokio_stream::wrappers::ReceiverStream;
use vellum_core::AppError;
use vellum_storage::{ChunkSink, ResponseHeaders, ResponseSink};

/// Chunks buffered between the download task and the HTTP body.
const BODY_CHANNEL_CAPACITY: usize = 1;

type BodyItem = Result<Bytes, io::Error>;

/// Create a connected sink and response stream.
pub fn response_channel() -> (ChannelResponseSink, ResponseStream) {
    let (headers_tx, headers_rx) = oneshot::channel();
    let (body_tx, body_rx) = mpsc::channel(BODY_CHANNEL_CAPACITY);
    (
        ChannelResponseSink {
            headers_tx: Some(headers_tx),
            pending: None,
            body_tx,
            committed: false,
        },
        ResponseStream {
            headers: headers_rx,
            body: body_rx,
        },
    )
}

pub struct ChannelResponseSink {
    headers_tx: Option<oneshot::Sender<ResponseHeaders>>,
    pending: Option<ResponseHeaders>,
    body_tx: mpsc::Sender<BodyItem>,
    committed: bool,
}

impl ChannelResponseSink {
    fn release_headers(&mut self) -> Result<(), AppError> {
        let Some(headers_tx) = self.headers_tx.take() else {
            return Ok(());
        };
        let headers = self
            .pending
            .take()
            .ok_or_else(|| AppError::Internal("response body written before headers".to_string()))?;
        headers_tx
            .send(headers)
            .map_err(|_| AppError::Transfer("client went away before the response started".to_string()))
    }

    /// Complete a successful transfer. Releases the headers if no chunk did.
    pub fn finish(mut self) -> Result<(), AppError> {
        self.release_headers()
    }

    /// Abort a failed transfer. Once the response has started the body is ended with an
    /// error so the client sees a broken transfer rather than a short but valid one.
    pub async fn abort(self, error: &AppError) {
        if self.committed {
            let _ = self
                .body_tx
                .send(Err(io::Error::other(error.to_string())))
                .await;
        }
    }
}

#[async_trait::async_trait]
impl ChunkSink for ChannelResponseSink {
    async fn write_chunk(&mut self, chunk: Bytes) -> Result<(), AppError> {
        if chunk.is_empty() {
            return Ok(());
        }
        self.release_headers()?;
        self.body_tx
            .send(Ok(chunk))
            .await
            .map_err(|_| AppError::Transfer("client disconnected".to_string()))?;
        self.committed = true;
        Ok(())
    }

    async fn flush(&mut self) -> Result<(), AppError> {
        // Each chunk is handed to the body as soon as the receiver polls for it.
        Ok(())
    }
}

impl ResponseSink for ChannelResponseSink {
    fn start(&mut self, headers: ResponseHeaders) {
        self.pending = Some(headers);
    }

    fn committed(&self) -> bool {
        self.committed
    }
}

/// Receiving half handed to the HTTP handler.
pub struct ResponseStream {
    pub headers: oneshot::Receiver<ResponseHeaders>,
    pub body: mpsc::Receiver<BodyItem>,
}

/// Build the `200 OK` streaming response for released headers.
pub fn build_response(
    headers: ResponseHeaders,
    body: mpsc::Receiver<BodyItem>,
) -> Result<Response<Body>, AppError> {
    let content_type = HeaderValue::from_str(&headers.content_type)
        .unwrap_or_else(|_| HeaderValue::from_static(vellum_core::constants::DEFAULT_CONTENT_TYPE));
    let content_disposition = HeaderValue::from_str(&headers.content_disposition)
        .map_err(|e| AppError::Internal(format!("Invalid Content-Disposition header: {}", e)))?;

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CONTENT_DISPOSITION, content_disposition)
        .header(header::CONTENT_LENGTH, headers.content_length)
        .body(Body::from_stream(ReceiverStream::new(body)))
        .map_err(|e| AppError::Internal(format!("Failed to build response: {}", e)))
}
