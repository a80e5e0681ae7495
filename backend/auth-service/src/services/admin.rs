use std::sync::Arc;

use chrono::{Duration, Utc};

use auth_core::store::AuthStore;
use auth_core::{code, password, token, AuthError};

use crate::db::admin_sessions::{AdminAuthStore, AdminSession};
use crate::error::AppResult;
use crate::mailer::CodeSender;
use crate::security::totp;
use crate::services::auth::{AuthService, IssuedSession};

/// Three-step admin sign-in: password, then TOTP, then an e-mailed code.
/// Only the terminal step mints a normal session; the intermediate token is
/// useless anywhere else.
pub struct AdminAuthService {
    auth_store: Arc<dyn AuthStore>,
    admin_store: Arc<dyn AdminAuthStore>,
    auth: Arc<AuthService>,
    mailer: Arc<dyn CodeSender>,
}

impl AdminAuthService {
    pub fn new(
        auth_store: Arc<dyn AuthStore>,
        admin_store: Arc<dyn AdminAuthStore>,
        auth: Arc<AuthService>,
        mailer: Arc<dyn CodeSender>,
    ) -> Self {
        Self {
            auth_store,
            admin_store,
            auth,
            mailer,
        }
    }

    /// Password step. Returns the admin-auth session token.
    pub async fn login(&self, email: &str, password_plain: &str) -> AppResult<String> {
        let user = self.auth_store.user_by_email(email).await?;
        if !user.is_admin {
            return Err(AuthError::NotAdmin.into());
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

        let minted = token::mint();
        let expires_at = Utc::now() + Duration::minutes(15);
        self.admin_store
            .create_session(user.id, &minted.hash, expires_at)
            .await?;
        Ok(minted.token)
    }

    /// Returns the admin's TOTP secret, generating and persisting one on
    /// first use. Idempotent for admins that already enrolled.
    pub async fn init_totp(&self, session_token: &str) -> AppResult<String> {
        let session = self.session(session_token).await?;
        let user = self.auth_store.user_by_id(session.user_id).await?;
        if let Some(secret) = user.admin_totp_secret.filter(|s| !s.is_empty()) {
            return Ok(secret);
        }
        let secret = totp::generate_secret();
        self.auth_store.set_totp_secret(user.id, &secret).await?;
        Ok(secret)
    }

    /// TOTP step. On success stores a hashed e-mail code and mails it.
    pub async fn verify_totp(&self, session_token: &str, code_plain: &str) -> AppResult<()> {
        let session = self.session(session_token).await?;
        let user = self.auth_store.user_by_id(session.user_id).await?;
        let secret = user
            .admin_totp_secret
            .filter(|s| !s.is_empty())
            .ok_or(AuthError::InvalidStep)?;
        if !totp::validate(&secret, code_plain) {
            return Err(AuthError::InvalidCode.into());
        }

        let token_hash = token::hash_of(session_token);
        self.admin_store.mark_totp_verified(&token_hash).await?;

        let (email_code, email_code_hash) = code::generate();
        let expires_at = Utc::now() + Duration::minutes(10);
        self.admin_store
            .set_email_code(&token_hash, &email_code_hash, expires_at)
            .await?;
        if let Err(e) = self.mailer.send_admin_code(&user.email, &email_code).await {
            tracing::warn!(error = %e, "sending admin code failed");
        }
        Ok(())
    }

    /// E-mail step. Mints a normal session and deletes the admin-auth row.
    pub async fn verify_email(
        &self,
        session_token: &str,
        code_plain: &str,
        device_name: &str,
        platform: &str,
        user_agent: &str,
        ip: &str,
    ) -> AppResult<IssuedSession> {
        let session = self.session(session_token).await?;
        if !session.totp_verified {
            return Err(AuthError::InvalidStep.into());
        }
        let (Some(stored_hash), Some(email_expires)) =
            (&session.email_code_hash, session.email_expires_at)
        else {
            return Err(AuthError::InvalidCode.into());
        };
        if email_expires < Utc::now() || code::hash_of(code_plain) != *stored_hash {
            return Err(AuthError::InvalidCode.into());
        }

        let user = self.auth_store.user_by_id(session.user_id).await?;
        let issued = self
            .auth
            .issue_session_for_user(&user, device_name, platform, user_agent, ip)
            .await?;
        if let Err(e) = self
            .admin_store
            .delete_session(&token::hash_of(session_token))
            .await
        {
            tracing::warn!(error = %e, "deleting admin auth session failed");
        }
        tracing::info!(user_id = %user.id, "admin MFA completed");
        Ok(issued)
    }

    pub async fn logout(&self, refresh_token: &str) -> AppResult<()> {
        self.auth.logout(refresh_token).await
    }

    async fn session(&self, session_token: &str) -> AppResult<AdminSession> {
        let session = self
            .admin_store
            .session_by_token(&token::hash_of(session_token))
            .await?;
        if session.expires_at < Utc::now() {
            return Err(AuthError::SessionExpired.into());
        }
        Ok(session)
    }
}
