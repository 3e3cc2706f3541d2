use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, Path, Request, State};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures_util::StreamExt;
use http::StatusCode;
use tower::ServiceExt;
use tower_http::services::ServeFile;
use tracing::debug;

use crate::dto::{DeleteResponse, RecordingInfo, UploadResponse};
use crate::error::AppError;
use crate::path::{RECORDING, RECORDINGS, VIDEO_FIELD};
use crate::result::Result;
use crate::route::AppState;

pub fn route() -> Router<AppState> {
    Router::new()
        .route(RECORDINGS, post(create).get(index))
        .route(RECORDING, get(show).delete(destroy))
}

async fn create(
    State(state): State<AppState>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<(StatusCode, Json<UploadResponse>)> {
    let mut multipart = multipart.map_err(|e| AppError::Upload(e.into()))?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Upload(e.into()))?
    {
        if field.name() != Some(VIDEO_FIELD) {
            debug!("Skipping multipart field {:?}", field.name());
            continue;
        }
        if field.file_name().is_none() {
            debug!("Skipping non-file {} field", VIDEO_FIELD);
            continue;
        }
        debug!(
            "Receiving upload {:?} ({:?})",
            field.file_name(),
            field.content_type()
        );
        let upload = field.map(|chunk| chunk.map_err(anyhow::Error::from)).boxed();
        let recording = state.recordings.create(Some(upload)).await?;
        return Ok((StatusCode::CREATED, Json(recording.into())));
    }

    let recording = state.recordings.create(None).await?;
    Ok((StatusCode::CREATED, Json(recording.into())))
}

async fn index(State(state): State<AppState>) -> Result<Json<Vec<RecordingInfo>>> {
    Ok(Json(
        state
            .recordings
            .list()
            .await?
            .into_iter()
            .map(RecordingInfo::from)
            .collect(),
    ))
}

async fn show(
    State(state): State<AppState>,
    Path(id): Path<String>,
    request: Request,
) -> Result<Response> {
    let id = parse_id(&id, "Not found")?;
    let (recording, file) = state.recordings.open(id).await?;
    debug!("Streaming recording {} from {}", id, recording.filepath);
    // Content type is guessed from the extension, the body is read in chunks
    let response = ServeFile::new(file).oneshot(request).await?;
    Ok(response.into_response())
}

async fn destroy(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse>> {
    let id = parse_id(&id, "Recording not found")?;
    let id = state.recordings.delete(id).await?;
    Ok(Json(DeleteResponse {
        message: "Recording deleted".to_string(),
        id,
    }))
}

/// Ids that are not integers can never match a row
fn parse_id(id: &str, missing: &str) -> Result<i64> {
    id.parse().map_err(|_| AppError::not_found(missing))
}
