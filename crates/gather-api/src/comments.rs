//! Comment service. The per-event comment list is cached fully hydrated
//! (author names and avatars attached) and dropped on any write to the
//! thread.

use std::collections::HashMap;

use chrono::Utc;

use gather_types::api::CommentResponse;
use gather_types::models::Comment;

use crate::error::{ApiError, ApiResult};
use crate::events;
use crate::keys::{CacheKey, OBJECT_SLIDING, OBJECT_TTL};
use crate::state::AppStateInner;

fn comment_not_found() -> ApiError {
    ApiError::NotFound("The id of the comment is not found in the database".to_string())
}

/// All comments of an event in posting order, each carrying its author's
/// username and avatar. Authors are fetched in one batch query.
pub async fn get_by_event(state: &AppStateInner, event_id: i64) -> ApiResult<Vec<CommentResponse>> {
    let key = CacheKey::EventComments(event_id).to_string();
    if let Some(cached) = state.cache.get::<Vec<CommentResponse>>(&key) {
        return Ok((*cached).clone());
    }

    if !events::event_exists(state, event_id).await? {
        return Err(ApiError::NotFound(
            "The id of the event is not found in the database".to_string(),
        ));
    }

    let (rows, authors) = state
        .query(move |db| {
            let rows = db.get_comments_by_event(event_id)?;
            let mut ids: Vec<i64> = rows.iter().map(|r| r.user_id).collect();
            ids.sort_unstable();
            ids.dedup();
            let authors = db.get_users_by_ids(&ids)?;
            Ok((rows, authors))
        })
        .await?;

    let by_id: HashMap<i64, _> = authors.into_iter().map(|u| (u.id, u)).collect();
    let responses: Vec<CommentResponse> = rows
        .into_iter()
        .map(|row| {
            let author = by_id.get(&row.user_id);
            CommentResponse {
                id: row.id,
                event_id: row.event_id,
                user_id: row.user_id,
                username: author.map(|a| a.username.clone()).unwrap_or_default(),
                profile_picture_id: author.and_then(|a| a.profile_picture_id.clone()),
                content: row.content,
                created_at: row.created_at,
                updated_at: row.updated_at,
            }
        })
        .collect();

    state.cache.set_sliding(&key, responses.clone(), OBJECT_TTL, OBJECT_SLIDING);
    Ok(responses)
}

pub async fn get_comment_by_id(state: &AppStateInner, id: i64) -> ApiResult<Option<Comment>> {
    let row = state.query(move |db| db.get_comment_by_id(id)).await?;
    Ok(row.map(|r| r.into_comment()))
}

/// Both timestamps start at the posting instant. The thread cache is dropped
/// so the next read sees the new comment.
pub async fn create(
    state: &AppStateInner,
    event_id: i64,
    user_id: i64,
    content: String,
) -> ApiResult<Comment> {
    if !events::event_exists(state, event_id).await? {
        return Err(ApiError::NotFound(
            "The id of the event is not found in the database".to_string(),
        ));
    }

    let now = Utc::now().timestamp();
    let stored = content.clone();
    let id = state
        .query(move |db| db.insert_comment(event_id, user_id, &stored, now))
        .await?;

    state.cache.remove(&CacheKey::EventComments(event_id).to_string());

    Ok(Comment {
        id,
        event_id,
        user_id,
        content,
        created_at: now,
        updated_at: now,
    })
}

/// Replaces the content and stamps `updated_at` only. The caller has already
/// checked authorship against the loaded comment.
pub async fn update(
    state: &AppStateInner,
    comment: &Comment,
    content: String,
) -> ApiResult<Comment> {
    let now = Utc::now().timestamp();
    let id = comment.id;
    let stored = content.clone();
    let changed = state
        .query(move |db| db.update_comment(id, &stored, now))
        .await?;
    if !changed {
        return Err(comment_not_found());
    }

    state
        .cache
        .remove(&CacheKey::EventComments(comment.event_id).to_string());

    Ok(Comment {
        content,
        updated_at: now,
        ..comment.clone()
    })
}

pub async fn delete(state: &AppStateInner, comment: &Comment) -> ApiResult<()> {
    let id = comment.id;
    let deleted = state.query(move |db| db.delete_comment(id)).await?;
    if !deleted {
        return Err(comment_not_found());
    }
    state
        .cache
        .remove(&CacheKey::EventComments(comment.event_id).to_string());
    Ok(())
}
