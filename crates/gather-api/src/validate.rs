//! Input validation rules for the public surface. Everything here rejects
//! before the store is touched.

use gather_types::api::{EventCreateRequest, EventUpdateRequest, RegisterRequest};
use gather_types::models::EventType;

use crate::error::{ApiError, ApiResult};

const MAX_EMAIL_LEN: usize = 50;
const USERNAME_LEN: std::ops::RangeInclusive<usize> = 3..=10;
const PASSWORD_LEN: std::ops::RangeInclusive<usize> = 8..=32;
const TITLE_LEN: std::ops::RangeInclusive<usize> = 5..=100;
const DESCRIPTION_LEN: std::ops::RangeInclusive<usize> = 5..=1000;
const LOCATION_LEN: std::ops::RangeInclusive<usize> = 5..=50;
const COMMENT_LEN: std::ops::RangeInclusive<usize> = 2..=200;

const ONE_YEAR_SECS: i64 = 365 * 24 * 60 * 60;

fn fail(message: &str) -> ApiError {
    ApiError::Validation(message.to_string())
}

pub fn validate_email(email: &str) -> ApiResult<()> {
    if email.is_empty() || email.len() > MAX_EMAIL_LEN {
        return Err(fail("Email must be at most 50 characters."));
    }
    // Shape check only; deliverability is not our problem.
    let Some((local, domain)) = email.split_once('@') else {
        return Err(fail("Email is not valid."));
    };
    if local.is_empty() || domain.is_empty() || !domain.contains('.') {
        return Err(fail("Email is not valid."));
    }
    Ok(())
}

pub fn validate_username(username: &str) -> ApiResult<()> {
    if !USERNAME_LEN.contains(&username.len()) {
        return Err(fail("Username must be between 3 and 10 characters."));
    }
    if !username.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(fail("Username must contain only letters and numbers."));
    }
    Ok(())
}

pub fn validate_password(password: &str) -> ApiResult<()> {
    if !PASSWORD_LEN.contains(&password.len()) {
        return Err(fail("Password must be between 8 and 32 characters."));
    }
    Ok(())
}

pub fn validate_registration(req: &RegisterRequest) -> ApiResult<()> {
    validate_email(&req.email)?;
    validate_username(&req.username)?;
    validate_password(&req.password)
}

/// Registration details for accounts vouched for by an OAuth provider:
/// no password is involved.
pub fn validate_oauth_registration(email: &str, username: &str) -> ApiResult<()> {
    validate_email(email)?;
    validate_username(username)
}

/// Event times must be Unix seconds within [now, now + 1 year]. Whether the
/// end may precede the start is deliberately not checked here.
pub fn validate_event_time(time: i64, now: i64) -> ApiResult<()> {
    if time < now {
        return Err(fail("The time cannot be in the past."));
    }
    if time > now + ONE_YEAR_SECS {
        return Err(fail("The time cannot be more than a year in the future."));
    }
    Ok(())
}

/// Parses a tag list against the closed vocabulary. Absent means no tags.
pub fn parse_event_types(names: &Option<Vec<String>>) -> ApiResult<Vec<EventType>> {
    let Some(names) = names else {
        return Ok(vec![]);
    };
    names
        .iter()
        .map(|n| n.parse::<EventType>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| fail("There is an invalid event type in the list"))
}

fn validate_text(value: &str, range: std::ops::RangeInclusive<usize>, what: &str) -> ApiResult<()> {
    if !range.contains(&value.chars().count()) {
        return Err(fail(&format!(
            "{what} must be between {} and {} characters.",
            range.start(),
            range.end()
        )));
    }
    Ok(())
}

pub fn validate_event_create(req: &EventCreateRequest, now: i64) -> ApiResult<Vec<EventType>> {
    validate_text(&req.title, TITLE_LEN, "Title")?;
    validate_text(&req.description, DESCRIPTION_LEN, "Description")?;
    validate_text(&req.location, LOCATION_LEN, "Location")?;
    validate_event_time(req.start_time, now)?;
    validate_event_time(req.end_time, now)?;
    parse_event_types(&req.event_types)
}

/// Patch validation: only the supplied fields are checked.
pub fn validate_event_update(req: &EventUpdateRequest, now: i64) -> ApiResult<Option<Vec<EventType>>> {
    if let Some(title) = &req.title {
        validate_text(title, TITLE_LEN, "Title")?;
    }
    if let Some(description) = &req.description {
        validate_text(description, DESCRIPTION_LEN, "Description")?;
    }
    if let Some(location) = &req.location {
        validate_text(location, LOCATION_LEN, "Location")?;
    }
    if let Some(start) = req.start_time {
        validate_event_time(start, now)?;
    }
    if let Some(end) = req.end_time {
        validate_event_time(end, now)?;
    }
    match &req.event_types {
        Some(_) => Ok(Some(parse_event_types(&req.event_types)?)),
        None => Ok(None),
    }
}

pub fn validate_comment_content(content: &str) -> ApiResult<()> {
    validate_text(content, COMMENT_LEN, "Comment")
}
