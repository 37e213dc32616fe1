//! Account service: user lifecycle, authentication and the per-user cache.
//! Id lookups are read-through cached; every mutation invalidates the entry.

use gather_types::api::{AuthResponse, AuthenticateRequest, RegisterRequest};
use gather_types::models::{Credential, Role, User};

use crate::error::{ApiError, ApiResult};
use crate::jwt;
use crate::keys::{CacheKey, OBJECT_SLIDING, OBJECT_TTL};
use crate::password;
use crate::state::AppStateInner;

/// Exact, case-sensitive match — the store does not normalize case.
pub async fn username_taken(state: &AppStateInner, username: &str) -> ApiResult<bool> {
    let username = username.to_string();
    state.query(move |db| db.username_exists(&username)).await
}

pub async fn email_taken(state: &AppStateInner, email: &str) -> ApiResult<bool> {
    let email = email.to_string();
    state.query(move |db| db.email_exists(&email)).await
}

/// Persists a new user. Local accounts get their password hashed here; OAuth
/// accounts store the client name instead and never touch the hasher. A
/// supplied profile picture is marked used once the row exists.
pub async fn register(
    state: &AppStateInner,
    req: RegisterRequest,
    is_oauth: bool,
    oauth_client: &str,
) -> ApiResult<User> {
    let role = if req.is_event_organizer {
        Role::EventOrganizer
    } else {
        Role::User
    };

    let credential = if is_oauth {
        Credential::OAuth {
            client: oauth_client.to_string(),
        }
    } else {
        Credential::Local {
            password_hash: password::hash(&req.password)?,
        }
    };

    let username = req.username.clone();
    let email = req.email.clone();
    let picture = req.profile_picture_id.clone();
    let stored = credential.clone();
    let id = state
        .query(move |db| {
            let (hash, client) = match &stored {
                Credential::Local { password_hash } => (Some(password_hash.as_str()), None),
                Credential::OAuth { client } => (None, Some(client.as_str())),
            };
            db.create_user(&username, &email, role.as_str(), hash, client, picture.as_deref())
        })
        .await?;

    if let Some(file_id) = &req.profile_picture_id {
        state.files.mark_used(file_id);
    }

    Ok(User {
        id,
        username: req.username,
        email: req.email,
        role,
        credential,
        profile_picture_id: req.profile_picture_id,
    })
}

/// `None` means the credentials did not check out; the caller decides how to
/// phrase the rejection. OAuth calls skip password verification entirely.
pub async fn authenticate(
    state: &AppStateInner,
    req: AuthenticateRequest,
    is_oauth: bool,
) -> ApiResult<Option<AuthResponse>> {
    let Some(user) = get_user_by_email(state, &req.email).await? else {
        return Ok(None);
    };

    if !is_oauth {
        let Credential::Local { password_hash } = &user.credential else {
            return Ok(None);
        };
        if !password::verify(&req.password, password_hash) {
            return Ok(None);
        }
    }

    let token = jwt::create_token(&state.auth, &user)?;
    Ok(Some(AuthResponse {
        token,
        is_authenticated: true,
        user_id: user.id,
    }))
}

/// Re-issues a token for an existing user, e.g. right after a role change so
/// the caller does not have to log in again to see the new role.
pub async fn generate_token_for_user(state: &AppStateInner, id: i64) -> ApiResult<Option<String>> {
    let Some(user) = get_user_by_id(state, id).await? else {
        return Ok(None);
    };
    Ok(Some(jwt::create_token(&state.auth, &user)?))
}

pub async fn get_user_by_email(state: &AppStateInner, email: &str) -> ApiResult<Option<User>> {
    let email = email.to_string();
    let Some(row) = state.query(move |db| db.get_user_by_email(&email)).await? else {
        return Ok(None);
    };
    Ok(Some(row.into_user().map_err(ApiError::Internal)?))
}

pub async fn get_user_by_id(state: &AppStateInner, id: i64) -> ApiResult<Option<User>> {
    let key = CacheKey::User(id).to_string();
    if let Some(user) = state.cache.get::<User>(&key) {
        return Ok(Some((*user).clone()));
    }

    let Some(row) = state.query(move |db| db.get_user_by_id(id)).await? else {
        return Ok(None);
    };
    let user = row.into_user().map_err(ApiError::Internal)?;
    state.cache.set_sliding(&key, user.clone(), OBJECT_TTL, OBJECT_SLIDING);
    Ok(Some(user))
}

pub async fn is_oauth_user(state: &AppStateInner, email: &str) -> ApiResult<bool> {
    Ok(get_user_by_email(state, email)
        .await?
        .is_some_and(|u| u.is_oauth()))
}

pub async fn user_exists(state: &AppStateInner, id: i64) -> ApiResult<bool> {
    Ok(get_user_by_id(state, id).await?.is_some())
}

pub async fn is_already_organizer(state: &AppStateInner, id: i64) -> ApiResult<bool> {
    Ok(get_user_by_id(state, id)
        .await?
        .is_some_and(|u| u.role == Role::EventOrganizer))
}

/// False when the user does not exist. Invalidates the per-user cache entry
/// on success so the next read sees the new role.
pub async fn promote_to_organizer(state: &AppStateInner, id: i64) -> ApiResult<bool> {
    let changed = state
        .query(move |db| db.set_user_role(id, Role::EventOrganizer.as_str()))
        .await?;
    if changed {
        state.cache.remove(&CacheKey::User(id).to_string());
    }
    Ok(changed)
}

/// False when the user does not exist; otherwise stores the reference, marks
/// the file used and invalidates the cache entry.
pub async fn set_profile_picture(
    state: &AppStateInner,
    user_id: i64,
    file_id: &str,
) -> ApiResult<bool> {
    let fid = file_id.to_string();
    let changed = state
        .query(move |db| db.set_profile_picture(user_id, &fid))
        .await?;
    if changed {
        state.files.mark_used(file_id);
        state.cache.remove(&CacheKey::User(user_id).to_string());
    }
    Ok(changed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::test_support::test_state;

    fn req(username: &str, email: &str) -> RegisterRequest {
        RegisterRequest {
            email: email.into(),
            username: username.into(),
            password: "password1".into(),
            is_event_organizer: false,
            profile_picture_id: None,
        }
    }

    #[tokio::test]
    async fn registration_makes_username_and_email_taken() {
        let state = test_state().await;
        assert!(!username_taken(&state, "alice1").await.unwrap());
        assert!(!email_taken(&state, "alice@example.com").await.unwrap());

        let user = register(&state, req("alice1", "alice@example.com"), false, "")
            .await
            .unwrap();
        assert!(user.id > 0);
        assert_eq!(user.role, Role::User);

        assert!(username_taken(&state, "alice1").await.unwrap());
        assert!(email_taken(&state, "alice@example.com").await.unwrap());
        // Case-sensitive, as documented.
        assert!(!username_taken(&state, "Alice1").await.unwrap());
    }

    #[tokio::test]
    async fn authenticate_checks_the_password() {
        let state = test_state().await;
        register(&state, req("bob22", "bob@example.com"), false, "")
            .await
            .unwrap();

        let ok = authenticate(
            &state,
            AuthenticateRequest {
                email: "bob@example.com".into(),
                password: "password1".into(),
            },
            false,
        )
        .await
        .unwrap()
        .unwrap();
        assert!(ok.is_authenticated);

        let claims = jwt::decode_token(&state.auth, &ok.token).unwrap();
        assert_eq!(claims.email, "bob@example.com");

        let bad = authenticate(
            &state,
            AuthenticateRequest {
                email: "bob@example.com".into(),
                password: "wrong-password".into(),
            },
            false,
        )
        .await
        .unwrap();
        assert!(bad.is_none());

        let unknown = authenticate(
            &state,
            AuthenticateRequest {
                email: "nobody@example.com".into(),
                password: "password1".into(),
            },
            false,
        )
        .await
        .unwrap();
        assert!(unknown.is_none());
    }

    #[tokio::test]
    async fn oauth_accounts_authenticate_without_a_password() {
        let state = test_state().await;
        let user = register(&state, req("carol3", "carol@example.com"), true, "google")
            .await
            .unwrap();
        assert!(user.is_oauth());
        assert!(is_oauth_user(&state, "carol@example.com").await.unwrap());

        let ok = authenticate(
            &state,
            AuthenticateRequest {
                email: "carol@example.com".into(),
                password: String::new(),
            },
            true,
        )
        .await
        .unwrap();
        assert!(ok.is_some());

        // A password attempt against an OAuth account always fails.
        let with_password = authenticate(
            &state,
            AuthenticateRequest {
                email: "carol@example.com".into(),
                password: "password1".into(),
            },
            false,
        )
        .await
        .unwrap();
        assert!(with_password.is_none());
    }

    #[tokio::test]
    async fn promotion_invalidates_the_cached_user() {
        let state = test_state().await;
        let user = register(&state, req("dave44", "dave@example.com"), false, "")
            .await
            .unwrap();

        // Warm the cache, then promote.
        assert!(!is_already_organizer(&state, user.id).await.unwrap());
        assert!(promote_to_organizer(&state, user.id).await.unwrap());
        assert!(is_already_organizer(&state, user.id).await.unwrap());

        assert!(!promote_to_organizer(&state, user.id + 50).await.unwrap());

        let token = generate_token_for_user(&state, user.id).await.unwrap().unwrap();
        let claims = jwt::decode_token(&state.auth, &token).unwrap();
        assert_eq!(claims.role, "EventOrganizer");
    }

    #[tokio::test]
    async fn profile_picture_assignment_marks_the_file_used() {
        let state = test_state().await;
        let user = register(&state, req("erin5", "erin@example.com"), false, "")
            .await
            .unwrap();

        let file_id = state
            .files
            .save(vec![0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A], "p.png", "image/png")
            .await
            .unwrap();

        assert!(set_profile_picture(&state, user.id, &file_id).await.unwrap());
        let reloaded = get_user_by_id(&state, user.id).await.unwrap().unwrap();
        assert_eq!(reloaded.profile_picture_id.as_deref(), Some(file_id.as_str()));

        assert!(!set_profile_picture(&state, user.id + 50, &file_id).await.unwrap());
        assert!(user_exists(&state, user.id).await.unwrap());
    }
}
