use chrono::{DateTime, Utc};
use uuid::Uuid;

/// A stored account record, as the credential store sees it.
///
/// Deliberately not `Serialize`: the password hash and the stored refresh
/// token must never reach a wire response. Handlers convert to
/// [`crate::api::AccountProfile`] before serializing.
#[derive(Debug, Clone)]
pub struct Account {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub password_hash: String,
    /// The single currently-valid refresh token, if a session is active.
    pub refresh_token: Option<String>,
    pub avatar_url: String,
    pub cover_image_url: Option<String>,
    pub created_at: DateTime<Utc>,
}
