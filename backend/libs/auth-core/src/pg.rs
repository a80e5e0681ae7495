use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::error::{AuthError, AuthResult};
use crate::models::{Session, User};
use crate::store::{AuthStore, RefreshLookup};

const USER_COLUMNS: &str = "id, email, password_hash, is_active, is_admin, banned_at, ban_reason, \
                            admin_totp_secret, created_at";

const SESSION_COLUMNS: &str = "id, user_id, device_id, access_token_hash, refresh_token_hash, \
                               last_refresh_token_hash, expires_at, revoked_at, revoked_reason";

pub struct PgAuthStore {
    pool: PgPool,
}

impl PgAuthStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuthStore for PgAuthStore {
    async fn create_user(&self, email: &str, password_hash: &str) -> AuthResult<User> {
        let query = format!(
            "INSERT INTO users (email, password_hash, is_active) VALUES ($1, $2, FALSE) \
             RETURNING {USER_COLUMNS}"
        );
        match sqlx::query_as::<_, User>(&query)
            .bind(email)
            .bind(password_hash)
            .fetch_one(&self.pool)
            .await
        {
            Ok(user) => Ok(user),
            Err(sqlx::Error::Database(e)) if e.code().as_deref() == Some("23505") => {
                Err(AuthError::UserExists)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn activate_user(&self, user_id: Uuid) -> AuthResult<()> {
        sqlx::query("UPDATE users SET is_active = TRUE, updated_at = NOW() WHERE id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn user_by_email(&self, email: &str) -> AuthResult<User> {
        let query = format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1 AND is_deleted = FALSE LIMIT 1"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(AuthError::UserNotFound)
    }

    async fn user_by_id(&self, id: Uuid) -> AuthResult<User> {
        let query =
            format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1 AND is_deleted = FALSE LIMIT 1");
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(AuthError::UserNotFound)
    }

    async fn save_verification_code(
        &self,
        user_id: Uuid,
        code_hash: &[u8],
        expires_at: DateTime<Utc>,
    ) -> AuthResult<()> {
        sqlx::query(
            "INSERT INTO verification_codes (user_id, code_hash, expires_at) VALUES ($1, $2, $3)",
        )
        .bind(user_id)
        .bind(code_hash)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn consume_verification_code(&self, email: &str, code_hash: &[u8]) -> AuthResult<User> {
        let row = sqlx::query(
            r#"
            SELECT vc.id AS code_id, u.id AS user_id
            FROM verification_codes vc
            JOIN users u ON u.id = vc.user_id
            WHERE u.email = $1
              AND vc.code_hash = $2
              AND vc.consumed_at IS NULL
              AND vc.expires_at > NOW()
            ORDER BY vc.created_at DESC
            LIMIT 1
            "#,
        )
        .bind(email)
        .bind(code_hash)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(AuthError::InvalidCode)?;

        let code_id: Uuid = row.get("code_id");
        let user_id: Uuid = row.get("user_id");
        sqlx::query("UPDATE verification_codes SET consumed_at = NOW() WHERE id = $1")
            .bind(code_id)
            .execute(&self.pool)
            .await?;
        self.user_by_id(user_id).await
    }

    async fn create_device(&self, user_id: Uuid, name: &str, platform: &str) -> AuthResult<Uuid> {
        let row = sqlx::query(
            "INSERT INTO devices (user_id, name, platform, last_seen) VALUES ($1, $2, $3, NOW()) \
             RETURNING id",
        )
        .bind(user_id)
        .bind(name)
        .bind(platform)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.get("id"))
    }

    async fn create_session(
        &self,
        user_id: Uuid,
        device_id: Uuid,
        access_hash: &[u8],
        refresh_hash: &[u8],
        expires_at: DateTime<Utc>,
        user_agent: &str,
        ip: &str,
    ) -> AuthResult<Uuid> {
        let row = sqlx::query(
            r#"
            INSERT INTO sessions
                (user_id, device_id, access_token_hash, refresh_token_hash, user_agent, ip, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id
            "#,
        )
        .bind(user_id)
        .bind(device_id)
        .bind(access_hash)
        .bind(refresh_hash)
        .bind(user_agent)
        .bind(ip)
        .bind(expires_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.get("id"))
    }

    async fn session_by_refresh(&self, refresh_hash: &[u8]) -> AuthResult<RefreshLookup> {
        let query =
            format!("SELECT {SESSION_COLUMNS} FROM sessions WHERE refresh_token_hash = $1 LIMIT 1");
        if let Some(session) = sqlx::query_as::<_, Session>(&query)
            .bind(refresh_hash)
            .fetch_optional(&self.pool)
            .await?
        {
            return Ok(RefreshLookup {
                session,
                matched_previous: false,
            });
        }

        let query = format!(
            "SELECT {SESSION_COLUMNS} FROM sessions WHERE last_refresh_token_hash = $1 LIMIT 1"
        );
        match sqlx::query_as::<_, Session>(&query)
            .bind(refresh_hash)
            .fetch_optional(&self.pool)
            .await?
        {
            Some(session) => Ok(RefreshLookup {
                session,
                matched_previous: true,
            }),
            None => Err(AuthError::SessionNotFound),
        }
    }

    async fn rotate_session(
        &self,
        session_id: Uuid,
        old_refresh_hash: &[u8],
        new_access_hash: &[u8],
        new_refresh_hash: &[u8],
        expires_at: DateTime<Utc>,
    ) -> AuthResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE sessions
            SET last_refresh_token_hash = refresh_token_hash,
                refresh_token_hash = $3,
                access_token_hash = $2,
                expires_at = $4,
                rotated_at = NOW()
            WHERE id = $1 AND refresh_token_hash = $5
            "#,
        )
        .bind(session_id)
        .bind(new_access_hash)
        .bind(new_refresh_hash)
        .bind(expires_at)
        .bind(old_refresh_hash)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            // Another rotation won the race on the same prior hash.
            return Err(AuthError::RefreshReuse);
        }
        Ok(())
    }

    async fn revoke_session(&self, session_id: Uuid, reason: &str) -> AuthResult<()> {
        sqlx::query("UPDATE sessions SET revoked_at = NOW(), revoked_reason = $2 WHERE id = $1")
            .bind(session_id)
            .bind(reason)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn revoke_user_sessions(&self, user_id: Uuid, reason: &str) -> AuthResult<()> {
        sqlx::query(
            "UPDATE sessions SET revoked_at = NOW(), revoked_reason = $2 \
             WHERE user_id = $1 AND revoked_at IS NULL",
        )
        .bind(user_id)
        .bind(reason)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn session_by_access(&self, access_hash: &[u8]) -> AuthResult<Session> {
        let query = format!(
            "SELECT {SESSION_COLUMNS} FROM sessions \
             WHERE access_token_hash = $1 AND revoked_at IS NULL LIMIT 1"
        );
        sqlx::query_as::<_, Session>(&query)
            .bind(access_hash)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(AuthError::SessionNotFound)
    }

    async fn set_totp_secret(&self, user_id: Uuid, secret: &str) -> AuthResult<()> {
        sqlx::query("UPDATE users SET admin_totp_secret = $2 WHERE id = $1")
            .bind(user_id)
            .bind(secret)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
