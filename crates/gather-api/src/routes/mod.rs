//! HTTP surface. Handlers stay thin: extract, validate, call the service,
//! shape the response. The split between the two routers is the auth
//! middleware boundary.

pub mod accounts;
pub mod comments;
pub mod events;
pub mod files;

use axum::Router;
use axum::routing::{get, post, put};

use crate::state::AppState;

/// Routes reachable without a bearer token.
pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/accounts/register", post(accounts::register))
        .route("/accounts/authenticate", post(accounts::authenticate))
        .route("/accounts/oauth", post(accounts::oauth))
        .route("/events/event-types", get(events::event_types))
        .route("/files/{id}", get(files::download))
}

/// Routes behind the auth middleware; the server layers it on top.
pub fn protected_router() -> Router<AppState> {
    Router::new()
        .route("/accounts/logout", post(accounts::logout))
        .route("/accounts/promote", post(accounts::promote))
        .route("/accounts/profile-picture", post(accounts::set_profile_picture))
        .route("/files", post(files::upload))
        .route("/events/list", post(events::list))
        .route("/events", post(events::create))
        .route(
            "/events/{id}",
            get(events::get_event).put(events::update).delete(events::delete),
        )
        .route("/events/{id}/banner", post(events::set_banner))
        .route("/events/{id}/like", post(events::like).delete(events::unlike))
        .route(
            "/events/{id}/comments",
            get(comments::list).post(comments::create),
        )
        .route(
            "/events/{id}/comments/{comment_id}",
            put(comments::update).delete(comments::delete),
        )
}
