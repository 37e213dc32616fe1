use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header};
use axum::{Extension, Json};
use chrono::Utc;
use serde_json::{Value, json};

use gather_types::api::{
    AuthResponse, AuthenticateRequest, Claims, OAuthRequest, PromoteResponse, RegisterRequest,
    RegisterResponse, SetProfilePictureRequest,
};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use crate::{accounts, authz, validate};

/// Rejects a file id that does not name a stored image.
async fn require_stored_image(state: &AppState, file_id: &str) -> ApiResult<()> {
    if !state.files.is_image(file_id).await? {
        return Err(ApiError::Unprocessable(
            "The file is not an image stored on the server.".to_string(),
        ));
    }
    Ok(())
}

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<RegisterResponse>)> {
    validate::validate_registration(&req)?;

    if accounts::username_taken(&state, &req.username).await? {
        return Err(ApiError::Conflict("Username is already taken.".to_string()));
    }
    if accounts::email_taken(&state, &req.email).await? {
        return Err(ApiError::Conflict("Email is already taken.".to_string()));
    }
    if let Some(file_id) = &req.profile_picture_id {
        require_stored_image(&state, file_id).await?;
    }

    let user = accounts::register(&state, req, false, "").await?;
    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            id: user.id,
            email: user.email,
            username: user.username,
            profile_picture_id: user.profile_picture_id,
        }),
    ))
}

pub async fn authenticate(
    State(state): State<AppState>,
    Json(req): Json<AuthenticateRequest>,
) -> ApiResult<Json<AuthResponse>> {
    let auth = accounts::authenticate(&state, req, false)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Invalid email or password.".to_string()))?;
    Ok(Json(auth))
}

/// Sign-in via an external provider: first contact registers the account,
/// every visit authenticates without a password. An email already registered
/// with a password cannot be taken over through this path.
pub async fn oauth(
    State(state): State<AppState>,
    Json(req): Json<OAuthRequest>,
) -> ApiResult<Json<AuthResponse>> {
    validate::validate_oauth_registration(&req.email, &req.username)?;

    if !accounts::email_taken(&state, &req.email).await? {
        if accounts::username_taken(&state, &req.username).await? {
            return Err(ApiError::Conflict("Username is already taken.".to_string()));
        }
        accounts::register(
            &state,
            RegisterRequest {
                email: req.email.clone(),
                username: req.username.clone(),
                password: String::new(),
                is_event_organizer: false,
                profile_picture_id: None,
            },
            true,
            &req.client,
        )
        .await?;
    } else if !accounts::is_oauth_user(&state, &req.email).await? {
        return Err(ApiError::Conflict("Email is already taken.".to_string()));
    }

    let auth = accounts::authenticate(
        &state,
        AuthenticateRequest {
            email: req.email,
            password: String::new(),
        },
        true,
    )
    .await?
    .ok_or_else(|| ApiError::Unauthorized("Invalid email or password.".to_string()))?;
    Ok(Json(auth))
}

/// Blacklists the presented token for its remaining validity, after which the
/// record expires together with the token itself.
pub async fn logout(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    headers: HeaderMap,
) -> ApiResult<Json<Value>> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or_else(|| ApiError::Unauthorized("Missing Authorization header.".to_string()))?;

    let remaining = (claims.exp as i64 - Utc::now().timestamp()).max(0) as u64;
    state
        .blacklist
        .blacklist(token, std::time::Duration::from_secs(remaining));

    Ok(Json(json!({ "message": "Successfully logged out." })))
}

pub async fn promote(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<PromoteResponse>> {
    let user = authz::resolve_identity(&state, &headers).await?;

    if accounts::is_already_organizer(&state, user.id).await? {
        return Err(ApiError::Conflict("User is already an event organizer.".to_string()));
    }
    accounts::promote_to_organizer(&state, user.id).await?;

    let token = accounts::generate_token_for_user(&state, user.id)
        .await?
        .ok_or_else(|| ApiError::Internal(anyhow::anyhow!("promoted user {} vanished", user.id)))?;
    Ok(Json(PromoteResponse { token }))
}

pub async fn set_profile_picture(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<SetProfilePictureRequest>,
) -> ApiResult<Json<Value>> {
    let user = authz::resolve_identity(&state, &headers).await?;
    require_stored_image(&state, &req.file_id).await?;

    accounts::set_profile_picture(&state, user.id, &req.file_id).await?;
    Ok(Json(json!({ "message": "Profile picture updated." })))
}
