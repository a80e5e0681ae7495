use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::AuthResult;
use crate::models::{Session, User};

/// Result of a refresh-token lookup: the session plus whether the hash
/// matched the previously rotated-away value (reuse evidence).
#[derive(Debug, Clone)]
pub struct RefreshLookup {
    pub session: Session,
    pub matched_previous: bool,
}

/// Credential store: users, verification codes, devices and sessions.
#[async_trait]
pub trait AuthStore: Send + Sync {
    async fn create_user(&self, email: &str, password_hash: &str) -> AuthResult<User>;

    async fn activate_user(&self, user_id: Uuid) -> AuthResult<()>;

    async fn user_by_email(&self, email: &str) -> AuthResult<User>;

    async fn user_by_id(&self, id: Uuid) -> AuthResult<User>;

    async fn save_verification_code(
        &self,
        user_id: Uuid,
        code_hash: &[u8],
        expires_at: DateTime<Utc>,
    ) -> AuthResult<()>;

    /// Find an unconsumed, unexpired code for `(email, code_hash)` and mark
    /// it consumed. At most one consumption succeeds per code row.
    async fn consume_verification_code(&self, email: &str, code_hash: &[u8]) -> AuthResult<User>;

    async fn create_device(&self, user_id: Uuid, name: &str, platform: &str) -> AuthResult<Uuid>;

    #[allow(clippy::too_many_arguments)]
    async fn create_session(
        &self,
        user_id: Uuid,
        device_id: Uuid,
        access_hash: &[u8],
        refresh_hash: &[u8],
        expires_at: DateTime<Utc>,
        user_agent: &str,
        ip: &str,
    ) -> AuthResult<Uuid>;

    async fn session_by_refresh(&self, refresh_hash: &[u8]) -> AuthResult<RefreshLookup>;

    /// Rotate session tokens. The update is conditional on the current
    /// refresh hash so that at most one rotation commits per prior value;
    /// losing the race surfaces as `RefreshReuse`.
    async fn rotate_session(
        &self,
        session_id: Uuid,
        old_refresh_hash: &[u8],
        new_access_hash: &[u8],
        new_refresh_hash: &[u8],
        expires_at: DateTime<Utc>,
    ) -> AuthResult<()>;

    async fn revoke_session(&self, session_id: Uuid, reason: &str) -> AuthResult<()>;

    async fn revoke_user_sessions(&self, user_id: Uuid, reason: &str) -> AuthResult<()>;

    /// Look up a non-revoked session by access-token hash. Expiry is checked
    /// by the caller.
    async fn session_by_access(&self, access_hash: &[u8]) -> AuthResult<Session>;

    async fn set_totp_secret(&self, user_id: Uuid, secret: &str) -> AuthResult<()>;
}
