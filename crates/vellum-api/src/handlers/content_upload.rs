use crate::state::AppState;
use axum::{
    body::Body,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use futures::TryStreamExt;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio_util::io::StreamReader;
use uuid::Uuid;
use vellum_core::UploadResult;
use vellum_storage::ReaderSource;

#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<&UploadResult> for UploadResponse {
    fn from(result: &UploadResult) -> Self {
        if result.is_success() {
            Self {
                id: Some(result.content_id),
                error: None,
            }
        } else {
            Self {
                id: None,
                error: result.error.clone(),
            }
        }
    }
}

/// Store the raw request body as new content.
#[tracing::instrument(skip_all, fields(operation = "upload_content"))]
pub async fn upload_content(State(state): State<Arc<AppState>>, body: Body) -> Response {
    let stream = body.into_data_stream().map_err(std::io::Error::other);
    let mut source = ReaderSource::new(StreamReader::new(stream));

    let result = state.uploads.upload(&mut source).await;

    let status = StatusCode::from_u16(result.status.http_status_code())
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(UploadResponse::from(&result))).into_response()
}
