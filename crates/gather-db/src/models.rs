//! Database row types — these map directly to SQLite rows.
//! Distinct from the gather-types domain models to keep the DB layer
//! independent; conversions live here.

use anyhow::{Context, Result, bail};
use gather_types::models::{Comment, Credential, Event, EventType, User};

pub struct UserRow {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub role: String,
    pub password_hash: Option<String>,
    pub oauth_client: Option<String>,
    pub profile_picture_id: Option<String>,
}

impl UserRow {
    /// Rows must carry exactly one of {password hash, OAuth client}.
    /// Anything else is corrupt data, not a business failure.
    pub fn into_user(self) -> Result<User> {
        let credential = match (self.password_hash, self.oauth_client) {
            (Some(password_hash), None) => Credential::Local { password_hash },
            (None, Some(client)) => Credential::OAuth { client },
            _ => bail!("user {} has an inconsistent credential", self.id),
        };

        Ok(User {
            id: self.id,
            username: self.username,
            email: self.email,
            role: self
                .role
                .parse()
                .map_err(|e| anyhow::anyhow!("user {}: {e}", self.id))?,
            credential,
            profile_picture_id: self.profile_picture_id,
        })
    }
}

#[derive(Clone)]
pub struct EventRow {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub location: String,
    /// JSON array of tag names.
    pub event_types: String,
    pub owner_id: i64,
    /// ISO date, `YYYY-MM-DD`.
    pub date: String,
    pub start_time: i64,
    pub end_time: i64,
    pub banner_picture_id: Option<String>,
}

impl EventRow {
    pub fn into_event(self, like_count: i64) -> Result<Event> {
        let names: Vec<String> = serde_json::from_str(&self.event_types)
            .with_context(|| format!("event {}: bad event_types payload", self.id))?;
        let event_types = names
            .iter()
            .map(|n| n.parse::<EventType>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| anyhow::anyhow!("event {}: {e}", self.id))?;

        Ok(Event {
            id: self.id,
            title: self.title,
            description: self.description,
            location: self.location,
            event_types,
            owner_id: self.owner_id,
            date: self
                .date
                .parse()
                .with_context(|| format!("event {}: bad date", self.id))?,
            start_time: self.start_time,
            end_time: self.end_time,
            banner_picture_id: self.banner_picture_id,
            like_count,
        })
    }
}

pub struct CommentRow {
    pub id: i64,
    pub event_id: i64,
    pub user_id: i64,
    pub content: String,
    pub created_at: i64,
    pub updated_at: i64,
}

impl CommentRow {
    pub fn into_comment(self) -> Comment {
        Comment {
            id: self.id,
            event_id: self.event_id,
            user_id: self.user_id,
            content: self.content,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

pub struct FileRow {
    pub id: String,
    pub filename: String,
    pub content_type: String,
    pub size: i64,
    pub sha256: String,
}

/// Serialize a tag list for the `events.event_types` column.
pub fn event_types_to_json(types: &[EventType]) -> String {
    let names: Vec<&str> = types.iter().map(|t| t.as_str()).collect();
    // Serializing a Vec<&str> cannot fail.
    serde_json::to_string(&names).unwrap_or_else(|_| "[]".to_string())
}
