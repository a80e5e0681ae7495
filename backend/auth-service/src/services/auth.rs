use std::sync::Arc;

use chrono::{Duration, Utc};
use uuid::Uuid;

use auth_core::models::User;
use auth_core::store::AuthStore;
use auth_core::{code, password, token, AuthError};

use crate::error::AppResult;
use crate::mailer::CodeSender;

#[derive(Debug, Clone, Copy)]
pub struct AuthConfig {
    pub refresh_token_ttl: Duration,
    pub verification_code_ttl: Duration,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            refresh_token_ttl: Duration::days(30),
            verification_code_ttl: Duration::minutes(15),
        }
    }
}

#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub user_id: Uuid,
    pub device_id: Uuid,
    pub access_token: String,
    pub refresh_token: String,
}

/// Registration, activation, login and refresh-rotation flows.
pub struct AuthService {
    store: Arc<dyn AuthStore>,
    mailer: Arc<dyn CodeSender>,
    config: AuthConfig,
}

impl AuthService {
    pub fn new(store: Arc<dyn AuthStore>, mailer: Arc<dyn CodeSender>, config: AuthConfig) -> Self {
        Self {
            store,
            mailer,
            config,
        }
    }

    /// Create an inactive user and mail a verification code. A failed mail
    /// send fails the call; the user row stays behind, inactive.
    pub async fn register(&self, email: &str, password_plain: &str) -> AppResult<Uuid> {
        let password_hash = password::hash(password_plain)?;
        let user = self.store.create_user(email, &password_hash).await?;

        let (code_plain, code_hash) = code::generate();
        let expires_at = Utc::now() + self.config.verification_code_ttl;
        self.store
            .save_verification_code(user.id, &code_hash, expires_at)
            .await?;
        self.mailer.send_verification(email, &code_plain).await?;
        tracing::info!(user_id = %user.id, "user registered, verification sent");
        Ok(user.id)
    }

    /// Consume a verification code, activate the account and issue a session.
    pub async fn verify(
        &self,
        email: &str,
        code_plain: &str,
        device_name: &str,
        platform: &str,
        user_agent: &str,
        ip: &str,
    ) -> AppResult<IssuedSession> {
        let code_hash = code::hash_of(code_plain);
        let user = self
            .store
            .consume_verification_code(email, &code_hash)
            .await?;
        if let Some(at) = user.banned_at {
            return Err(AuthError::Banned {
                reason: user.ban_reason,
                at,
            }
            .into());
        }
        self.store.activate_user(user.id).await?;
        self.issue_session(&user, device_name, platform, user_agent, ip)
            .await
    }

    pub async fn login(
        &self,
        email: &str,
        password_plain: &str,
        device_name: &str,
        platform: &str,
        user_agent: &str,
        ip: &str,
    ) -> AppResult<IssuedSession> {
        let user = self.store.user_by_email(email).await?;
        if !user.is_active {
            return Err(AuthError::Inactive.into());
        }
        if let Some(at) = user.banned_at {
            return Err(AuthError::Banned {
                reason: user.ban_reason,
                at,
            }
            .into());
        }
        if !password::verify(password_plain, &user.password_hash) {
            return Err(AuthError::InvalidCredentials.into());
        }
        self.issue_session(&user, device_name, platform, user_agent, ip)
            .await
    }

    /// Rotate the token pair. Presenting the previous refresh token is
    /// treated as compromise evidence: the session is revoked.
    pub async fn refresh(&self, refresh_token: &str) -> AppResult<(String, String)> {
        let lookup = self
            .store
            .session_by_refresh(&token::hash_of(refresh_token))
            .await?;
        if lookup.session.revoked_at.is_some() {
            return Err(AuthError::SessionRevoked.into());
        }
        if lookup.matched_previous {
            self.store
                .revoke_session(lookup.session.id, "refresh_reuse")
                .await?;
            tracing::warn!(session_id = %lookup.session.id, "refresh reuse detected, session revoked");
            return Err(AuthError::RefreshReuse.into());
        }
        if lookup.session.expires_at < Utc::now() {
            return Err(AuthError::SessionExpired.into());
        }

        let access = token::mint();
        let refresh = token::mint();
        let expires_at = Utc::now() + self.config.refresh_token_ttl;
        self.store
            .rotate_session(
                lookup.session.id,
                &lookup.session.refresh_token_hash,
                &access.hash,
                &refresh.hash,
                expires_at,
            )
            .await?;
        Ok((access.token, refresh.token))
    }

    pub async fn logout(&self, refresh_token: &str) -> AppResult<()> {
        let lookup = self
            .store
            .session_by_refresh(&token::hash_of(refresh_token))
            .await?;
        if lookup.matched_previous {
            return Err(AuthError::RefreshReuse.into());
        }
        self.store.revoke_session(lookup.session.id, "logout").await?;
        Ok(())
    }

    pub async fn logout_all(&self, refresh_token: &str) -> AppResult<()> {
        let lookup = self
            .store
            .session_by_refresh(&token::hash_of(refresh_token))
            .await?;
        self.store
            .revoke_user_sessions(lookup.session.user_id, "logout_all")
            .await?;
        Ok(())
    }

    /// Issue tokens for an already-authenticated user (admin MFA completion).
    pub async fn issue_session_for_user(
        &self,
        user: &User,
        device_name: &str,
        platform: &str,
        user_agent: &str,
        ip: &str,
    ) -> AppResult<IssuedSession> {
        if let Some(at) = user.banned_at {
            return Err(AuthError::Banned {
                reason: user.ban_reason.clone(),
                at,
            }
            .into());
        }
        self.issue_session(user, device_name, platform, user_agent, ip)
            .await
    }

    async fn issue_session(
        &self,
        user: &User,
        device_name: &str,
        platform: &str,
        user_agent: &str,
        ip: &str,
    ) -> AppResult<IssuedSession> {
        let name = if device_name.is_empty() {
            "unknown-device"
        } else {
            device_name
        };
        let device_id = self.store.create_device(user.id, name, platform).await?;

        let access = token::mint();
        let refresh = token::mint();
        let expires_at = Utc::now() + self.config.refresh_token_ttl;
        self.store
            .create_session(
                user.id,
                device_id,
                &access.hash,
                &refresh.hash,
                expires_at,
                user_agent,
                ip,
            )
            .await?;
        Ok(IssuedSession {
            user_id: user.id,
            device_id,
            access_token: access.token,
            refresh_token: refresh.token,
        })
    }
}
