use chrono::{DateTime, Utc};
use thiserror::Error;

pub type AuthResult<T> = Result<T, AuthError>;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("user already exists")]
    UserExists,

    #[error("user not found")]
    UserNotFound,

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("account not verified")]
    Inactive,

    #[error("invalid verification code")]
    InvalidCode,

    #[error("banned")]
    Banned {
        reason: Option<String>,
        at: DateTime<Utc>,
    },

    #[error("session not found")]
    SessionNotFound,

    #[error("session revoked")]
    SessionRevoked,

    #[error("session expired")]
    SessionExpired,

    #[error("refresh token reused and session revoked")]
    RefreshReuse,

    #[error("not an admin account")]
    NotAdmin,

    #[error("step not allowed in current state")]
    InvalidStep,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("internal error: {0}")]
    Internal(String),
}
