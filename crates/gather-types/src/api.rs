use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// -- JWT Claims --

/// JWT claims shared between the token issuer and the auth middleware.
/// Canonical definition lives here in gather-types to eliminate duplication.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id.
    pub sub: i64,
    pub email: String,
    pub role: String,
    pub iss: String,
    pub aud: String,
    pub exp: usize,
}

// -- Accounts --

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub is_event_organizer: bool,
    #[serde(default)]
    pub profile_picture_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub id: i64,
    pub email: String,
    pub username: String,
    pub profile_picture_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthenticateRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub is_authenticated: bool,
    pub user_id: i64,
}

/// Sign-in via an external identity provider. The provider has already
/// vouched for the email; no password is involved.
#[derive(Debug, Clone, Deserialize)]
pub struct OAuthRequest {
    pub email: String,
    pub username: String,
    pub client: String,
}

#[derive(Debug, Serialize)]
pub struct PromoteResponse {
    /// Fresh token carrying the EventOrganizer role, so the caller does not
    /// have to log in again.
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct SetProfilePictureRequest {
    pub file_id: String,
}

// -- Events --

#[derive(Debug, Clone, Deserialize)]
pub struct EventCreateRequest {
    pub title: String,
    pub description: String,
    pub location: String,
    pub start_time: i64,
    pub end_time: i64,
    #[serde(default)]
    pub event_types: Option<Vec<String>>,
    #[serde(default)]
    pub banner_picture_id: Option<String>,
}

/// Partial update: absent fields leave the stored values untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventUpdateRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub start_time: Option<i64>,
    #[serde(default)]
    pub end_time: Option<i64>,
    #[serde(default)]
    pub event_types: Option<Vec<String>>,
    #[serde(default)]
    pub banner_picture_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListEventsRequest {
    #[serde(default)]
    pub event_types: Option<Vec<String>>,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct SetBannerRequest {
    pub file_id: String,
}

// -- Comments --

#[derive(Debug, Clone, Deserialize)]
pub struct CommentCreateRequest {
    pub content: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommentUpdateRequest {
    pub content: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CommentResponse {
    pub id: i64,
    pub event_id: i64,
    pub user_id: i64,
    pub username: String,
    pub profile_picture_id: Option<String>,
    pub content: String,
    pub created_at: i64,
    pub updated_at: i64,
}

// -- Files --

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub file_id: String,
    pub size: u64,
}
