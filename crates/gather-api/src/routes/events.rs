use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;

use gather_types::api::{
    EventCreateRequest, EventUpdateRequest, ListEventsRequest, SetBannerRequest,
};
use gather_types::models::{Event, Role};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use crate::{authz, events};

pub async fn event_types() -> Json<Vec<&'static str>> {
    Json(events::all_event_types())
}

pub async fn list(
    State(state): State<AppState>,
    Json(req): Json<ListEventsRequest>,
) -> ApiResult<Json<Vec<Event>>> {
    Ok(Json(events::list(&state, req).await?))
}

pub async fn get_event(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Event>> {
    let event = events::get_event_by_id(&state, id).await?.ok_or_else(|| {
        ApiError::NotFound("The id of the event is not found in the database".to_string())
    })?;
    Ok(Json(event))
}

pub async fn create(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<EventCreateRequest>,
) -> ApiResult<(StatusCode, Json<Event>)> {
    let user = authz::resolve_identity(&state, &headers).await?;
    if user.role != Role::EventOrganizer && user.role != Role::Admin {
        return Err(ApiError::Forbidden(
            "Only event organizers can create events.".to_string(),
        ));
    }
    if let Some(file_id) = &req.banner_picture_id {
        require_stored_image(&state, file_id).await?;
    }

    let event = events::create(&state, req, user.id).await?;
    Ok((StatusCode::CREATED, Json(event)))
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    headers: HeaderMap,
    Json(req): Json<EventUpdateRequest>,
) -> ApiResult<Json<Event>> {
    let user = authz::resolve_identity(&state, &headers).await?;
    authz::require_event_owner(&state, id, &user).await?;
    if let Some(file_id) = &req.banner_picture_id {
        require_stored_image(&state, file_id).await?;
    }

    Ok(Json(events::update(&state, id, req).await?))
}

pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> ApiResult<StatusCode> {
    let user = authz::resolve_identity(&state, &headers).await?;
    authz::require_event_owner(&state, id, &user).await?;

    events::delete(&state, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn set_banner(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    headers: HeaderMap,
    Json(req): Json<SetBannerRequest>,
) -> ApiResult<Json<Event>> {
    let user = authz::resolve_identity(&state, &headers).await?;
    authz::require_event_owner(&state, id, &user).await?;
    require_stored_image(&state, &req.file_id).await?;

    let patch = EventUpdateRequest {
        banner_picture_id: Some(req.file_id),
        ..Default::default()
    };
    Ok(Json(events::update(&state, id, patch).await?))
}

pub async fn like(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> ApiResult<StatusCode> {
    let user = authz::resolve_identity(&state, &headers).await?;
    events::like(&state, id, user.id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn unlike(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> ApiResult<StatusCode> {
    let user = authz::resolve_identity(&state, &headers).await?;
    events::unlike(&state, id, user.id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn require_stored_image(state: &AppState, file_id: &str) -> ApiResult<()> {
    if !state.files.is_image(file_id).await? {
        return Err(ApiError::Unprocessable(
            "The file is not an image stored on the server.".to_string(),
        ));
    }
    Ok(())
}
