use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;

use crate::error::{AuthError, AuthResult};
use crate::models::SessionInfo;
use crate::store::AuthStore;
use crate::token;

/// Minimal seam for HTTP layers and hubs that only need to turn a bearer
/// token into a session view.
#[async_trait]
pub trait TokenValidator: Send + Sync {
    async fn validate_token(&self, token: &str) -> AuthResult<SessionInfo>;
}

/// Resolves a bearer token hash to a live session and its user flags.
#[derive(Clone)]
pub struct AccessValidator {
    store: Arc<dyn AuthStore>,
}

impl AccessValidator {
    pub fn new(store: Arc<dyn AuthStore>) -> Self {
        Self { store }
    }

    pub async fn validate(&self, access_hash: &[u8]) -> AuthResult<SessionInfo> {
        let session = self.store.session_by_access(access_hash).await?;
        if session.expires_at < Utc::now() {
            return Err(AuthError::SessionExpired);
        }
        let user = self.store.user_by_id(session.user_id).await?;
        if let Some(at) = user.banned_at {
            return Err(AuthError::Banned {
                reason: user.ban_reason,
                at,
            });
        }
        Ok(SessionInfo {
            user_id: session.user_id,
            device_id: session.device_id,
            is_admin: user.is_admin,
        })
    }
}

#[async_trait]
impl TokenValidator for AccessValidator {
    async fn validate_token(&self, token: &str) -> AuthResult<SessionInfo> {
        self.validate(&token::hash_of(token)).await
    }
}
