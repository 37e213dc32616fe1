use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;

use gather_types::api::{CommentCreateRequest, CommentResponse, CommentUpdateRequest};
use gather_types::models::{Comment, User};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use crate::{authz, comments, validate};

fn response_for(comment: Comment, author: &User) -> CommentResponse {
    CommentResponse {
        id: comment.id,
        event_id: comment.event_id,
        user_id: comment.user_id,
        username: author.username.clone(),
        profile_picture_id: author.profile_picture_id.clone(),
        content: comment.content,
        created_at: comment.created_at,
        updated_at: comment.updated_at,
    }
}

/// Loads the comment, requires authorship and pins it to the event in the
/// path. A comment reached through the wrong event id is treated as missing.
async fn authored_comment(
    state: &AppState,
    event_id: i64,
    comment_id: i64,
    user: &User,
) -> ApiResult<Comment> {
    let comment = authz::require_comment_author(state, comment_id, user).await?;
    if comment.event_id != event_id {
        return Err(ApiError::NotFound(
            "The id of the comment is not found in the database".to_string(),
        ));
    }
    Ok(comment)
}

pub async fn list(
    State(state): State<AppState>,
    Path(event_id): Path<i64>,
) -> ApiResult<Json<Vec<CommentResponse>>> {
    Ok(Json(comments::get_by_event(&state, event_id).await?))
}

pub async fn create(
    State(state): State<AppState>,
    Path(event_id): Path<i64>,
    headers: HeaderMap,
    Json(req): Json<CommentCreateRequest>,
) -> ApiResult<(StatusCode, Json<CommentResponse>)> {
    validate::validate_comment_content(&req.content)?;
    let user = authz::resolve_identity(&state, &headers).await?;

    let comment = comments::create(&state, event_id, user.id, req.content).await?;
    Ok((StatusCode::CREATED, Json(response_for(comment, &user))))
}

pub async fn update(
    State(state): State<AppState>,
    Path((event_id, comment_id)): Path<(i64, i64)>,
    headers: HeaderMap,
    Json(req): Json<CommentUpdateRequest>,
) -> ApiResult<Json<CommentResponse>> {
    validate::validate_comment_content(&req.content)?;
    let user = authz::resolve_identity(&state, &headers).await?;
    let comment = authored_comment(&state, event_id, comment_id, &user).await?;

    let updated = comments::update(&state, &comment, req.content).await?;
    Ok(Json(response_for(updated, &user)))
}

pub async fn delete(
    State(state): State<AppState>,
    Path((event_id, comment_id)): Path<(i64, i64)>,
    headers: HeaderMap,
) -> ApiResult<StatusCode> {
    let user = authz::resolve_identity(&state, &headers).await?;
    let comment = authored_comment(&state, event_id, comment_id, &user).await?;

    comments::delete(&state, &comment).await?;
    Ok(StatusCode::NO_CONTENT)
}
