use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;

use gather_types::api::UploadResponse;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct UploadParams {
    #[serde(default)]
    filename: Option<String>,
}

/// Raw body upload. The content type comes from the request header and the
/// filename from the query string; both fall back to generic defaults. The
/// saved blob is pending until some record references it.
pub async fn upload(
    State(state): State<AppState>,
    Query(params): Query<UploadParams>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<UploadResponse>)> {
    if body.is_empty() {
        return Err(ApiError::Validation("The uploaded file is empty.".to_string()));
    }

    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("application/octet-stream");
    let filename = params.filename.as_deref().unwrap_or("upload");

    let size = body.len() as u64;
    let file_id = state
        .files
        .save(body.to_vec(), filename, content_type)
        .await?;

    Ok((StatusCode::CREATED, Json(UploadResponse { file_id, size })))
}

pub async fn download(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Response> {
    let file = state
        .files
        .get_by_id(&id)
        .await?
        .ok_or_else(|| ApiError::NotFound("The id of the file is not found in the database".to_string()))?;

    let disposition = format!("attachment; filename=\"{}\"", file.filename.replace('"', ""));
    Ok((
        [
            (header::CONTENT_TYPE, file.content_type),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        file.bytes,
    )
        .into_response())
}
