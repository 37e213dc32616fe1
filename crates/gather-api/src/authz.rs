//! Identity and ownership resolution shared by every mutating endpoint.
//!
//! Identity: bearer token → email claim → user row. The two failure points
//! surface distinguishable reasons even though both reject with 401.
//! Ownership: existence is checked before ownership, so a missing resource
//! is reported as not-found rather than leaking an authorization verdict.

use axum::http::{HeaderMap, header};

use gather_types::models::{Comment, Event, User};

use crate::error::{ApiError, ApiResult};
use crate::state::AppStateInner;
use crate::{accounts, comments, events, jwt};

pub async fn resolve_identity(state: &AppStateInner, headers: &HeaderMap) -> ApiResult<User> {
    let authorization = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    let email = jwt::email_from_header(authorization).ok_or_else(|| {
        ApiError::Unauthorized("Not able to find the email from the authentication token.".to_string())
    })?;

    accounts::get_user_by_email(state, &email).await?.ok_or_else(|| {
        ApiError::Unauthorized(
            "Not able to find the email associated in the authentication token.".to_string(),
        )
    })
}

pub async fn require_event_owner(
    state: &AppStateInner,
    event_id: i64,
    user: &User,
) -> ApiResult<Event> {
    let event = events::get_event_by_id(state, event_id)
        .await?
        .ok_or_else(|| {
            ApiError::NotFound("The id of the event is not found in the database".to_string())
        })?;

    if event.owner_id != user.id {
        return Err(ApiError::Forbidden("You are not the owner of the event.".to_string()));
    }
    Ok(event)
}

pub async fn require_comment_author(
    state: &AppStateInner,
    comment_id: i64,
    user: &User,
) -> ApiResult<Comment> {
    let comment = comments::get_comment_by_id(state, comment_id)
        .await?
        .ok_or_else(|| {
            ApiError::NotFound("The id of the comment is not found in the database".to_string())
        })?;

    if comment.user_id != user.id {
        return Err(ApiError::Forbidden("You are not the author of the comment.".to_string()));
    }
    Ok(comment)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::test_support::test_state;
    use gather_types::api::RegisterRequest;

    fn register_req(username: &str, email: &str) -> RegisterRequest {
        RegisterRequest {
            email: email.into(),
            username: username.into(),
            password: "password1".into(),
            is_event_organizer: true,
            profile_picture_id: None,
        }
    }

    #[tokio::test]
    async fn identity_resolution_failure_reasons_are_distinct() {
        let state = test_state().await;

        let headers = HeaderMap::new();
        let err = resolve_identity(&state, &headers).await.unwrap_err();
        assert!(err.to_string().contains("from the authentication token"));

        // Token is well formed but no such user exists.
        let ghost = gather_types::models::User {
            id: 999,
            username: "ghost".into(),
            email: "ghost@example.com".into(),
            role: gather_types::models::Role::User,
            credential: gather_types::models::Credential::Local { password_hash: "h".into() },
            profile_picture_id: None,
        };
        let token = jwt::create_token(&state.auth, &ghost).unwrap();
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, format!("Bearer {token}").parse().unwrap());

        let err = resolve_identity(&state, &headers).await.unwrap_err();
        assert!(err.to_string().contains("associated in the authentication token"));
    }

    #[tokio::test]
    async fn existence_is_checked_before_ownership() {
        let state = test_state().await;
        let owner = accounts::register(&state, register_req("owner1", "o@example.com"), false, "")
            .await
            .unwrap();
        let other = accounts::register(&state, register_req("other1", "x@example.com"), false, "")
            .await
            .unwrap();

        let event = events::create(
            &state,
            gather_types::api::EventCreateRequest {
                title: "Rust meetup".into(),
                description: "monthly".into(),
                location: "Athens".into(),
                start_time: chrono::Utc::now().timestamp() + 3600,
                end_time: chrono::Utc::now().timestamp() + 7200,
                event_types: None,
                banner_picture_id: None,
            },
            owner.id,
        )
        .await
        .unwrap();

        let missing = require_event_owner(&state, event.id + 100, &other).await.unwrap_err();
        assert!(matches!(missing, ApiError::NotFound(_)));

        let forbidden = require_event_owner(&state, event.id, &other).await.unwrap_err();
        assert!(matches!(forbidden, ApiError::Forbidden(_)));

        assert!(require_event_owner(&state, event.id, &owner).await.is_ok());
    }
}
