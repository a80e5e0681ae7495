use async_trait::async_trait;
use auth_core::{AuthError, AuthResult};
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

/// Admin MFA session row. The state tag and `totp_verified` only ever move
/// forward; the row is deleted once a real session has been minted.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AdminSession {
    pub id: Uuid,
    pub user_id: Uuid,
    pub state: String,
    pub totp_verified: bool,
    pub email_code_hash: Option<Vec<u8>>,
    pub email_expires_at: Option<DateTime<Utc>>,
    pub expires_at: DateTime<Utc>,
}

pub const STATE_PASSWORD_OK: &str = "password_ok";
pub const STATE_TOTP_OK: &str = "totp_ok";

#[async_trait]
pub trait AdminAuthStore: Send + Sync {
    async fn create_session(
        &self,
        user_id: Uuid,
        token_hash: &[u8],
        expires_at: DateTime<Utc>,
    ) -> AuthResult<AdminSession>;

    async fn session_by_token(&self, token_hash: &[u8]) -> AuthResult<AdminSession>;

    async fn mark_totp_verified(&self, token_hash: &[u8]) -> AuthResult<()>;

    async fn set_email_code(
        &self,
        token_hash: &[u8],
        code_hash: &[u8],
        expires_at: DateTime<Utc>,
    ) -> AuthResult<()>;

    async fn delete_session(&self, token_hash: &[u8]) -> AuthResult<()>;
}

pub struct PgAdminAuthStore {
    pool: PgPool,
}

impl PgAdminAuthStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const COLUMNS: &str = "id, user_id, state, totp_verified, email_code_hash, email_expires_at, expires_at";

#[async_trait]
impl AdminAuthStore for PgAdminAuthStore {
    async fn create_session(
        &self,
        user_id: Uuid,
        token_hash: &[u8],
        expires_at: DateTime<Utc>,
    ) -> AuthResult<AdminSession> {
        let query = format!(
            "INSERT INTO admin_auth_sessions (user_id, session_token_hash, state, expires_at) \
             VALUES ($1, $2, '{STATE_PASSWORD_OK}', $3) RETURNING {COLUMNS}"
        );
        let session = sqlx::query_as::<_, AdminSession>(&query)
            .bind(user_id)
            .bind(token_hash)
            .bind(expires_at)
            .fetch_one(&self.pool)
            .await?;
        Ok(session)
    }

    async fn session_by_token(&self, token_hash: &[u8]) -> AuthResult<AdminSession> {
        let query = format!(
            "SELECT {COLUMNS} FROM admin_auth_sessions WHERE session_token_hash = $1 LIMIT 1"
        );
        sqlx::query_as::<_, AdminSession>(&query)
            .bind(token_hash)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(AuthError::SessionNotFound)
    }

    async fn mark_totp_verified(&self, token_hash: &[u8]) -> AuthResult<()> {
        let query = format!(
            "UPDATE admin_auth_sessions SET totp_verified = TRUE, state = '{STATE_TOTP_OK}' \
             WHERE session_token_hash = $1"
        );
        sqlx::query(&query)
            .bind(token_hash)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn set_email_code(
        &self,
        token_hash: &[u8],
        code_hash: &[u8],
        expires_at: DateTime<Utc>,
    ) -> AuthResult<()> {
        sqlx::query(
            "UPDATE admin_auth_sessions SET email_code_hash = $2, email_expires_at = $3 \
             WHERE session_token_hash = $1",
        )
        .bind(token_hash)
        .bind(code_hash)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete_session(&self, token_hash: &[u8]) -> AuthResult<()> {
        sqlx::query("DELETE FROM admin_auth_sessions WHERE session_token_hash = $1")
            .bind(token_hash)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
