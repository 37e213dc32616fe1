use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Role of a user in the system. Stored as a string at the DB boundary,
/// closed enum everywhere else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    User,
    EventOrganizer,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "User",
            Role::EventOrganizer => "EventOrganizer",
            Role::Admin => "Admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "User" => Ok(Role::User),
            "EventOrganizer" => Ok(Role::EventOrganizer),
            "Admin" => Ok(Role::Admin),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

/// The closed vocabulary of event tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventType {
    General,
    Sport,
    Art,
    Science,
    Technology,
    Gaming,
    Adventure,
}

impl EventType {
    pub const ALL: [EventType; 7] = [
        EventType::General,
        EventType::Sport,
        EventType::Art,
        EventType::Science,
        EventType::Technology,
        EventType::Gaming,
        EventType::Adventure,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::General => "General",
            EventType::Sport => "Sport",
            EventType::Art => "Art",
            EventType::Science => "Science",
            EventType::Technology => "Technology",
            EventType::Gaming => "Gaming",
            EventType::Adventure => "Adventure",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventType::ALL
            .iter()
            .find(|t| t.as_str() == s)
            .copied()
            .ok_or_else(|| format!("unknown event type: {s}"))
    }
}

/// How an account proves its identity. Exactly one variant exists per user,
/// which rules out the both-set / neither-set states two nullable columns
/// would allow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credential {
    Local { password_hash: String },
    OAuth { client: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub credential: Credential,
    pub profile_picture_id: Option<String>,
}

impl User {
    pub fn is_oauth(&self) -> bool {
        matches!(self.credential, Credential::OAuth { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Event {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub location: String,
    pub event_types: Vec<EventType>,
    pub owner_id: i64,
    /// Calendar date derived from `start_time` (UTC date component).
    pub date: NaiveDate,
    pub start_time: i64,
    pub end_time: i64,
    pub banner_picture_id: Option<String>,
    /// Computed from like rows at read time, never persisted.
    pub like_count: i64,
}

/// UTC calendar date of a Unix-second timestamp. `None` only for timestamps
/// outside chrono's representable range, which validation rejects upstream.
pub fn derive_event_date(start_time: i64) -> Option<NaiveDate> {
    chrono::DateTime::from_timestamp(start_time, 0).map(|dt| dt.date_naive())
}

#[derive(Debug, Clone, PartialEq)]
pub struct Comment {
    pub id: i64,
    pub event_id: i64,
    pub user_id: i64,
    pub content: String,
    pub created_at: i64,
    pub updated_at: i64,
}
