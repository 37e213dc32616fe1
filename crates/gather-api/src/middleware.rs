use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};

use crate::error::ApiError;
use crate::jwt;
use crate::state::AppState;

/// Request-level gate for every authenticated route: extracts the bearer
/// token, rejects blacklisted tokens before any business logic runs, fully
/// validates the remainder and stashes the claims for the handlers.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::Unauthorized("Missing Authorization header.".to_string()))?;

    let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
        ApiError::Unauthorized("Malformed Authorization header.".to_string())
    })?;

    if state.blacklist.is_blacklisted(token) {
        return Err(ApiError::Unauthorized("Token has been revoked.".to_string()));
    }

    let claims = jwt::decode_token(&state.auth, token)
        .map_err(|_| ApiError::Unauthorized("Invalid or expired token.".to_string()))?;

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}
