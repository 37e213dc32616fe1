//! Event service: CRUD, date-windowed listing and the like counter.
//! Single events are read-through cached under their id; likes and every
//! mutation invalidate that entry so counts never go stale in the cache.

use chrono::{Days, NaiveDate, Utc};

use gather_db::models::{EventRow, event_types_to_json};
use gather_types::api::{EventCreateRequest, EventUpdateRequest, ListEventsRequest};
use gather_types::models::{Event, EventType, derive_event_date};

use crate::error::{ApiError, ApiResult};
use crate::keys::{CacheKey, OBJECT_SLIDING, OBJECT_TTL};
use crate::state::AppStateInner;
use crate::validate;

/// Default listing window when the caller gives no bounds.
const DEFAULT_WINDOW_DAYS: u64 = 7;

fn event_not_found() -> ApiError {
    ApiError::NotFound("The id of the event is not found in the database".to_string())
}

fn date_for(start_time: i64) -> ApiResult<NaiveDate> {
    derive_event_date(start_time)
        .ok_or_else(|| ApiError::Validation("The time cannot be represented as a date.".to_string()))
}

/// Validates, derives the calendar date from the start time and persists.
/// A supplied banner is marked used once the row exists.
pub async fn create(
    state: &AppStateInner,
    req: EventCreateRequest,
    owner_id: i64,
) -> ApiResult<Event> {
    let event_types = validate::validate_event_create(&req, Utc::now().timestamp())?;
    let date = date_for(req.start_time)?;

    let row = EventRow {
        id: 0,
        title: req.title,
        description: req.description,
        location: req.location,
        event_types: event_types_to_json(&event_types),
        owner_id,
        date: date.to_string(),
        start_time: req.start_time,
        end_time: req.end_time,
        banner_picture_id: req.banner_picture_id.clone(),
    };

    let stored = row.clone();
    let id = state.query(move |db| db.insert_event(&stored)).await?;

    if let Some(file_id) = &req.banner_picture_id {
        state.files.mark_used(file_id);
    }

    Ok(Event {
        id,
        title: row.title,
        description: row.description,
        location: row.location,
        event_types,
        owner_id,
        date,
        start_time: row.start_time,
        end_time: row.end_time,
        banner_picture_id: row.banner_picture_id,
        like_count: 0,
    })
}

pub async fn get_event_by_id(state: &AppStateInner, id: i64) -> ApiResult<Option<Event>> {
    let key = CacheKey::Event(id).to_string();
    if let Some(event) = state.cache.get::<Event>(&key) {
        return Ok(Some((*event).clone()));
    }

    let Some((row, likes)) = state
        .query(move |db| {
            let Some(row) = db.get_event_by_id(id)? else {
                return Ok(None);
            };
            let likes = db.count_likes(id)?;
            Ok(Some((row, likes)))
        })
        .await?
    else {
        return Ok(None);
    };

    let event = row.into_event(likes).map_err(ApiError::Internal)?;
    state.cache.set_sliding(&key, event.clone(), OBJECT_TTL, OBJECT_SLIDING);
    Ok(Some(event))
}

/// Date-windowed listing with optional tag filtering. The window defaults to
/// the next seven days; either bound may be overridden independently. Tag
/// filtering keeps events sharing at least one requested tag.
pub async fn list(state: &AppStateInner, req: ListEventsRequest) -> ApiResult<Vec<Event>> {
    let wanted = validate::parse_event_types(&req.event_types)?;

    let today = Utc::now().date_naive();
    let start = req.start_date.unwrap_or(today);
    let end = req
        .end_date
        .unwrap_or_else(|| today + Days::new(DEFAULT_WINDOW_DAYS));

    let (rows, counts) = state
        .query(move |db| {
            let rows = db.list_events_between(&start.to_string(), &end.to_string())?;
            let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
            let counts = db.count_likes_for_events(&ids)?;
            Ok((rows, counts))
        })
        .await?;

    let mut events = Vec::with_capacity(rows.len());
    for row in rows {
        let likes = counts.get(&row.id).copied().unwrap_or(0);
        events.push(row.into_event(likes).map_err(ApiError::Internal)?);
    }

    if !wanted.is_empty() {
        events.retain(|e| e.event_types.iter().any(|t| wanted.contains(t)));
    }
    Ok(events)
}

/// Merge-patch update over the stored row. A new start time re-derives the
/// calendar date. The caller has already checked ownership.
pub async fn update(
    state: &AppStateInner,
    id: i64,
    req: EventUpdateRequest,
) -> ApiResult<Event> {
    let new_types = validate::validate_event_update(&req, Utc::now().timestamp())?;

    let current = get_event_by_id(state, id).await?.ok_or_else(event_not_found)?;

    let start_time = req.start_time.unwrap_or(current.start_time);
    let date = if req.start_time.is_some() {
        date_for(start_time)?
    } else {
        current.date
    };
    let event_types = new_types.unwrap_or_else(|| current.event_types.clone());
    let banner = req.banner_picture_id.clone().or(current.banner_picture_id);

    let row = EventRow {
        id,
        title: req.title.unwrap_or(current.title),
        description: req.description.unwrap_or(current.description),
        location: req.location.unwrap_or(current.location),
        event_types: event_types_to_json(&event_types),
        owner_id: current.owner_id,
        date: date.to_string(),
        start_time,
        end_time: req.end_time.unwrap_or(current.end_time),
        banner_picture_id: banner,
    };

    let stored = row.clone();
    let changed = state.query(move |db| db.update_event(&stored)).await?;
    if !changed {
        return Err(event_not_found());
    }

    if let Some(file_id) = &req.banner_picture_id {
        state.files.mark_used(file_id);
    }
    state.cache.remove(&CacheKey::Event(id).to_string());

    let event = row
        .into_event(current.like_count)
        .map_err(ApiError::Internal)?;
    Ok(event)
}

/// Removes the event with its likes and comments, then drops both cache
/// entries so neither the event nor its comment list survives.
pub async fn delete(state: &AppStateInner, id: i64) -> ApiResult<()> {
    let deleted = state.query(move |db| db.delete_event(id)).await?;
    if !deleted {
        return Err(event_not_found());
    }
    state.cache.remove(&CacheKey::Event(id).to_string());
    state.cache.remove(&CacheKey::EventComments(id).to_string());
    Ok(())
}

pub async fn event_exists(state: &AppStateInner, id: i64) -> ApiResult<bool> {
    state.query(move |db| db.event_exists(id)).await
}

/// Duplicate likes are conflicts, not no-ops; the primary key decides races.
pub async fn like(state: &AppStateInner, event_id: i64, user_id: i64) -> ApiResult<()> {
    if !event_exists(state, event_id).await? {
        return Err(event_not_found());
    }
    let inserted = state
        .query(move |db| db.insert_like(event_id, user_id))
        .await?;
    if !inserted {
        return Err(ApiError::Conflict("You have already liked this event.".to_string()));
    }
    state.cache.remove(&CacheKey::Event(event_id).to_string());
    Ok(())
}

pub async fn unlike(state: &AppStateInner, event_id: i64, user_id: i64) -> ApiResult<()> {
    if !event_exists(state, event_id).await? {
        return Err(event_not_found());
    }
    let removed = state
        .query(move |db| db.delete_like(event_id, user_id))
        .await?;
    if !removed {
        return Err(ApiError::Conflict("You have not liked this event yet.".to_string()));
    }
    state.cache.remove(&CacheKey::Event(event_id).to_string());
    Ok(())
}

/// The whole tag vocabulary, for clients building filter pickers.
pub fn all_event_types() -> Vec<&'static str> {
    EventType::ALL.iter().map(|t| t.as_str()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounts;
    use crate::state::test_support::test_state;
    use crate::state::AppState;
    use gather_types::api::RegisterRequest;

    async fn organizer(state: &AppState, name: &str, email: &str) -> i64 {
        accounts::register(
            state,
            RegisterRequest {
                email: email.into(),
                username: name.into(),
                password: "password1".into(),
                is_event_organizer: true,
                profile_picture_id: None,
            },
            false,
            "",
        )
        .await
        .unwrap()
        .id
    }

    fn create_req(title: &str, offset_hours: i64) -> EventCreateRequest {
        let now = Utc::now().timestamp();
        EventCreateRequest {
            title: title.into(),
            description: "An event worth attending".into(),
            location: "Athens".into(),
            start_time: now + offset_hours * 3600,
            end_time: now + offset_hours * 3600 + 7200,
            event_types: Some(vec!["Technology".into()]),
            banner_picture_id: None,
        }
    }

    #[tokio::test]
    async fn create_derives_the_date_from_the_start_time() {
        let state = test_state().await;
        let owner = organizer(&state, "owner1", "o1@example.com").await;

        let req = create_req("Rust meetup", 24);
        let expected = derive_event_date(req.start_time).unwrap();
        let event = create(&state, req, owner).await.unwrap();

        assert_eq!(event.date, expected);
        assert_eq!(event.like_count, 0);
        assert_eq!(event.event_types, vec![EventType::Technology]);

        let reloaded = get_event_by_id(&state, event.id).await.unwrap().unwrap();
        assert_eq!(reloaded, event);
    }

    #[tokio::test]
    async fn create_rejects_out_of_range_times() {
        let state = test_state().await;
        let owner = organizer(&state, "owner2", "o2@example.com").await;

        let mut req = create_req("Rust meetup", 24);
        req.start_time = Utc::now().timestamp() - 3600;
        let err = create(&state, req, owner).await.unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));

        let mut req = create_req("Rust meetup", 24);
        req.event_types = Some(vec!["Knitting".into()]);
        let err = create(&state, req, owner).await.unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[tokio::test]
    async fn like_and_unlike_keep_the_count_honest() {
        let state = test_state().await;
        let owner = organizer(&state, "owner3", "o3@example.com").await;
        let fan = organizer(&state, "fan3", "f3@example.com").await;
        let event = create(&state, create_req("Rust meetup", 24), owner).await.unwrap();

        like(&state, event.id, fan).await.unwrap();
        let err = like(&state, event.id, fan).await.unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));

        let loaded = get_event_by_id(&state, event.id).await.unwrap().unwrap();
        assert_eq!(loaded.like_count, 1);

        unlike(&state, event.id, fan).await.unwrap();
        let err = unlike(&state, event.id, fan).await.unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));

        let loaded = get_event_by_id(&state, event.id).await.unwrap().unwrap();
        assert_eq!(loaded.like_count, 0);

        let err = like(&state, event.id + 100, fan).await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[tokio::test]
    async fn partial_update_leaves_absent_fields_alone() {
        let state = test_state().await;
        let owner = organizer(&state, "owner4", "o4@example.com").await;
        let event = create(&state, create_req("Rust meetup", 24), owner).await.unwrap();

        let updated = update(
            &state,
            event.id,
            EventUpdateRequest {
                title: Some("Renamed meetup".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        assert_eq!(updated.title, "Renamed meetup");
        assert_eq!(updated.description, event.description);
        assert_eq!(updated.start_time, event.start_time);
        assert_eq!(updated.date, event.date);

        // A new start time moves the derived date along with it.
        let new_start = Utc::now().timestamp() + 40 * 24 * 3600;
        let moved = update(
            &state,
            event.id,
            EventUpdateRequest {
                start_time: Some(new_start),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(moved.date, derive_event_date(new_start).unwrap());

        let err = update(&state, event.id + 100, EventUpdateRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[tokio::test]
    async fn listing_windows_and_tag_filtering() {
        let state = test_state().await;
        let owner = organizer(&state, "owner5", "o5@example.com").await;

        let near = create(&state, create_req("Nearby event", 24), owner).await.unwrap();
        let mut far_req = create_req("Faraway event", 30 * 24);
        far_req.event_types = Some(vec!["Art".into()]);
        let far = create(&state, far_req, owner).await.unwrap();

        // Default window covers only the next seven days.
        let page = list(&state, ListEventsRequest::default()).await.unwrap();
        let ids: Vec<i64> = page.iter().map(|e| e.id).collect();
        assert!(ids.contains(&near.id));
        assert!(!ids.contains(&far.id));

        // A widened window picks up both; the tag filter narrows again.
        let wide = ListEventsRequest {
            end_date: Some(Utc::now().date_naive() + Days::new(60)),
            ..Default::default()
        };
        let page = list(&state, wide.clone()).await.unwrap();
        assert_eq!(page.len(), 2);

        let art_only = ListEventsRequest {
            event_types: Some(vec!["Art".into()]),
            ..wide
        };
        let page = list(&state, art_only).await.unwrap();
        let ids: Vec<i64> = page.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![far.id]);
    }

    #[tokio::test]
    async fn delete_removes_the_event_and_its_cache_entries() {
        let state = test_state().await;
        let owner = organizer(&state, "owner6", "o6@example.com").await;
        let event = create(&state, create_req("Rust meetup", 24), owner).await.unwrap();

        // Warm the cache first.
        assert!(get_event_by_id(&state, event.id).await.unwrap().is_some());

        delete(&state, event.id).await.unwrap();
        assert!(get_event_by_id(&state, event.id).await.unwrap().is_none());

        let err = delete(&state, event.id).await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }
}
