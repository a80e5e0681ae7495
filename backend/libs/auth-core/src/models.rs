use chrono::{DateTime, Utc};
use uuid::Uuid;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub is_active: bool,
    pub is_admin: bool,
    pub banned_at: Option<DateTime<Utc>>,
    pub ban_reason: Option<String>,
    pub admin_totp_secret: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Session row. Only token hashes are ever persisted; `last_refresh_token_hash`
/// keeps the previously rotated-away value so reuse can be detected.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Session {
    pub id: Uuid,
    pub user_id: Uuid,
    pub device_id: Uuid,
    pub access_token_hash: Vec<u8>,
    pub refresh_token_hash: Vec<u8>,
    pub last_refresh_token_hash: Option<Vec<u8>>,
    pub expires_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
    pub revoked_reason: Option<String>,
}

/// Lightweight view handed to HTTP layers after access-token validation.
#[derive(Debug, Clone, Copy)]
pub struct SessionInfo {
    pub user_id: Uuid,
    pub device_id: Uuid,
    pub is_admin: bool,
}
