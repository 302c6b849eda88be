use crate::constants::FILENAME_QUERY_PARAM;
use crate::error::HttpAppError;
use crate::state::AppState;
use crate::streaming::{build_response, response_channel};
use axum::{
    body::Body,
    extract::{Path, RawQuery, State},
    http::Response,
};
use std::sync::Arc;
use uuid::Uuid;
use vellum_core::{AppError, ContentTarget};
use vellum_storage::ResponseSink;

/// Download the content of a document version.
#[tracing::instrument(skip_all, fields(document_version_id = %id, operation = "download_document"))]
pub async fn download_document(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    RawQuery(query): RawQuery,
) -> Result<Response<Body>, HttpAppError> {
    let id = Uuid::parse_str(&id).map_err(AppError::from)?;
    stream_content(state, ContentTarget::DocumentVersion(id), query.as_deref()).await
}

/// Download content by its content identifier.
#[tracing::instrument(skip_all, fields(content_id = %id, operation = "download_content"))]
pub async fn download_content(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    RawQuery(query): RawQuery,
) -> Result<Response<Body>, HttpAppError> {
    let id = Uuid::parse_str(&id).map_err(AppError::from)?;
    stream_content(state, ContentTarget::Content(id), query.as_deref()).await
}

async fn stream_content(
    state: Arc<AppState>,
    target: ContentTarget,
    query: Option<&str>,
) -> Result<Response<Body>, HttpAppError> {
    let downloads = state.downloads.clone();
    let metadata = downloads.resolve(target, filename_override(query)).await?;

    let (mut sink, stream) = response_channel();
    let task = tokio::spawn(async move {
        match downloads.download(&metadata, &mut sink).await {
            Ok(written) => sink.finish().map(|()| written),
            Err(e) => {
                if sink.committed() {
                    tracing::error!(
                        error = %e.detailed_message(),
                        content_id = %metadata.content_id,
                        "Download failed after the response started"
                    );
                }
                sink.abort(&e).await;
                Err(e)
            }
        }
    });

    match stream.headers.await {
        Ok(headers) => Ok(build_response(headers, stream.body)?),
        // The task dropped the sink without releasing headers; it failed before any byte
        Err(_) => match task.await {
            Ok(Err(e)) => Err(e.into()),
            Ok(Ok(_)) => Err(AppError::Internal(
                "download finished without a response".to_string(),
            )
            .into()),
            Err(join_err) => {
                Err(AppError::Internal(format!("download task failed: {}", join_err)).into())
            }
        },
    }
}

/// Filename override from the query string. The key is matched case-insensitively and
/// the last occurrence wins.
pub fn filename_override(query: Option<&str>) -> Option<String> {
    let query = query?;
    url::form_urlencoded::parse(query.as_bytes())
        .filter(|(key, _)| key.eq_ignore_ascii_case(FILENAME_QUERY_PARAM))
        .map(|(_, value)| value.into_owned())
        .last()
        .filter(|value| !value.is_empty())
}
