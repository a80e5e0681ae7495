#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use auth_core::models::{Session, User};
use auth_core::store::{AuthStore, RefreshLookup};
use auth_core::{AuthError, AuthResult};
use auth_service::db::admin_sessions::{AdminAuthStore, AdminSession, STATE_PASSWORD_OK, STATE_TOTP_OK};
use auth_service::error::AppResult;
use auth_service::mailer::CodeSender;

struct CodeRow {
    user_id: Uuid,
    code_hash: Vec<u8>,
    expires_at: DateTime<Utc>,
    consumed: bool,
}

#[derive(Default)]
struct AuthState {
    users: Vec<User>,
    codes: Vec<CodeRow>,
    sessions: Vec<Session>,
}

/// In-memory credential store driving service-level tests.
#[derive(Default)]
pub struct MemoryAuthStore {
    state: Mutex<AuthState>,
}

impl MemoryAuthStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ban_user(&self, email: &str, reason: &str) {
        let mut state = self.state.lock().unwrap();
        if let Some(user) = state.users.iter_mut().find(|u| u.email == email) {
            user.banned_at = Some(Utc::now());
            user.ban_reason = Some(reason.to_string());
        }
    }

    pub fn make_admin(&self, email: &str) {
        let mut state = self.state.lock().unwrap();
        if let Some(user) = state.users.iter_mut().find(|u| u.email == email) {
            user.is_admin = true;
            user.is_active = true;
        }
    }

    /// Push every session past its expiry.
    pub fn expire_sessions(&self) {
        let mut state = self.state.lock().unwrap();
        let past = Utc::now() - Duration::hours(1);
        for session in &mut state.sessions {
            session.expires_at = past;
        }
    }

    pub fn session_count(&self) -> usize {
        self.state.lock().unwrap().sessions.len()
    }
}

#[async_trait]
impl AuthStore for MemoryAuthStore {
    async fn create_user(&self, email: &str, password_hash: &str) -> AuthResult<User> {
        let mut state = self.state.lock().unwrap();
        if state.users.iter().any(|u| u.email == email) {
            return Err(AuthError::UserExists);
        }
        let user = User {
            id: Uuid::new_v4(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            is_active: false,
            is_admin: false,
            banned_at: None,
            ban_reason: None,
            admin_totp_secret: None,
            created_at: Utc::now(),
        };
        state.users.push(user.clone());
        Ok(user)
    }

    async fn activate_user(&self, user_id: Uuid) -> AuthResult<()> {
        let mut state = self.state.lock().unwrap();
        let user = state
            .users
            .iter_mut()
            .find(|u| u.id == user_id)
            .ok_or(AuthError::UserNotFound)?;
        user.is_active = true;
        Ok(())
    }

    async fn user_by_email(&self, email: &str) -> AuthResult<User> {
        let state = self.state.lock().unwrap();
        state
            .users
            .iter()
            .find(|u| u.email == email)
            .cloned()
            .ok_or(AuthError::UserNotFound)
    }

    async fn user_by_id(&self, id: Uuid) -> AuthResult<User> {
        let state = self.state.lock().unwrap();
        state
            .users
            .iter()
            .find(|u| u.id == id)
            .cloned()
            .ok_or(AuthError::UserNotFound)
    }

    async fn save_verification_code(
        &self,
        user_id: Uuid,
        code_hash: &[u8],
        expires_at: DateTime<Utc>,
    ) -> AuthResult<()> {
        let mut state = self.state.lock().unwrap();
        state.codes.push(CodeRow {
            user_id,
            code_hash: code_hash.to_vec(),
            expires_at,
            consumed: false,
        });
        Ok(())
    }

    async fn consume_verification_code(&self, email: &str, code_hash: &[u8]) -> AuthResult<User> {
        let mut state = self.state.lock().unwrap();
        let user = state
            .users
            .iter()
            .find(|u| u.email == email)
            .cloned()
            .ok_or(AuthError::InvalidCode)?;
        let now = Utc::now();
        let row = state
            .codes
            .iter_mut()
            .rev()
            .find(|c| {
                c.user_id == user.id && !c.consumed && c.expires_at > now && c.code_hash == code_hash
            })
            .ok_or(AuthError::InvalidCode)?;
        row.consumed = true;
        Ok(user)
    }

    async fn create_device(&self, _user_id: Uuid, _name: &str, _platform: &str) -> AuthResult<Uuid> {
        Ok(Uuid::new_v4())
    }

    async fn create_session(
        &self,
        user_id: Uuid,
        device_id: Uuid,
        access_hash: &[u8],
        refresh_hash: &[u8],
        expires_at: DateTime<Utc>,
        _user_agent: &str,
        _ip: &str,
    ) -> AuthResult<Uuid> {
        let mut state = self.state.lock().unwrap();
        let id = Uuid::new_v4();
        state.sessions.push(Session {
            id,
            user_id,
            device_id,
            access_token_hash: access_hash.to_vec(),
            refresh_token_hash: refresh_hash.to_vec(),
            last_refresh_token_hash: None,
            expires_at,
            revoked_at: None,
            revoked_reason: None,
        });
        Ok(id)
    }

    async fn session_by_refresh(&self, refresh_hash: &[u8]) -> AuthResult<RefreshLookup> {
        let state = self.state.lock().unwrap();
        if let Some(session) = state
            .sessions
            .iter()
            .find(|s| s.refresh_token_hash == refresh_hash)
        {
            return Ok(RefreshLookup {
                session: session.clone(),
                matched_previous: false,
            });
        }
        state
            .sessions
            .iter()
            .find(|s| s.last_refresh_token_hash.as_deref() == Some(refresh_hash))
            .map(|s| RefreshLookup {
                session: s.clone(),
                matched_previous: true,
            })
            .ok_or(AuthError::SessionNotFound)
    }

    async fn rotate_session(
        &self,
        session_id: Uuid,
        old_refresh_hash: &[u8],
        new_access_hash: &[u8],
        new_refresh_hash: &[u8],
        expires_at: DateTime<Utc>,
    ) -> AuthResult<()> {
        let mut state = self.state.lock().unwrap();
        let session = state
            .sessions
            .iter_mut()
            .find(|s| s.id == session_id && s.refresh_token_hash == old_refresh_hash)
            .ok_or(AuthError::RefreshReuse)?;
        session.last_refresh_token_hash = Some(session.refresh_token_hash.clone());
        session.refresh_token_hash = new_refresh_hash.to_vec();
        session.access_token_hash = new_access_hash.to_vec();
        session.expires_at = expires_at;
        Ok(())
    }

    async fn revoke_session(&self, session_id: Uuid, reason: &str) -> AuthResult<()> {
        let mut state = self.state.lock().unwrap();
        let session = state
            .sessions
            .iter_mut()
            .find(|s| s.id == session_id)
            .ok_or(AuthError::SessionNotFound)?;
        session.revoked_at = Some(Utc::now());
        session.revoked_reason = Some(reason.to_string());
        Ok(())
    }

    async fn revoke_user_sessions(&self, user_id: Uuid, reason: &str) -> AuthResult<()> {
        let mut state = self.state.lock().unwrap();
        for session in state
            .sessions
            .iter_mut()
            .filter(|s| s.user_id == user_id && s.revoked_at.is_none())
        {
            session.revoked_at = Some(Utc::now());
            session.revoked_reason = Some(reason.to_string());
        }
        Ok(())
    }

    async fn session_by_access(&self, access_hash: &[u8]) -> AuthResult<Session> {
        let state = self.state.lock().unwrap();
        state
            .sessions
            .iter()
            .find(|s| s.access_token_hash == access_hash && s.revoked_at.is_none())
            .cloned()
            .ok_or(AuthError::SessionNotFound)
    }

    async fn set_totp_secret(&self, user_id: Uuid, secret: &str) -> AuthResult<()> {
        let mut state = self.state.lock().unwrap();
        let user = state
            .users
            .iter_mut()
            .find(|u| u.id == user_id)
            .ok_or(AuthError::UserNotFound)?;
        user.admin_totp_secret = Some(secret.to_string());
        Ok(())
    }
}

/// In-memory admin-auth session store.
#[derive(Default)]
pub struct MemoryAdminStore {
    sessions: Mutex<Vec<(Vec<u8>, AdminSession)>>,
}

impl MemoryAdminStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn expire_all(&self) {
        let mut sessions = self.sessions.lock().unwrap();
        let past = Utc::now() - Duration::hours(1);
        for (_, session) in sessions.iter_mut() {
            session.expires_at = past;
        }
    }

    pub fn expire_email_codes(&self) {
        let mut sessions = self.sessions.lock().unwrap();
        let past = Utc::now() - Duration::hours(1);
        for (_, session) in sessions.iter_mut() {
            session.email_expires_at = Some(past);
        }
    }

    pub fn session_count(&self) -> usize {
        self.sessions.lock().unwrap().len()
    }
}

#[async_trait]
impl AdminAuthStore for MemoryAdminStore {
    async fn create_session(
        &self,
        user_id: Uuid,
        token_hash: &[u8],
        expires_at: DateTime<Utc>,
    ) -> AuthResult<AdminSession> {
        let session = AdminSession {
            id: Uuid::new_v4(),
            user_id,
            state: STATE_PASSWORD_OK.to_string(),
            totp_verified: false,
            email_code_hash: None,
            email_expires_at: None,
            expires_at,
        };
        self.sessions
            .lock()
            .unwrap()
            .push((token_hash.to_vec(), session.clone()));
        Ok(session)
    }

    async fn session_by_token(&self, token_hash: &[u8]) -> AuthResult<AdminSession> {
        let sessions = self.sessions.lock().unwrap();
        sessions
            .iter()
            .find(|(hash, _)| hash == token_hash)
            .map(|(_, s)| s.clone())
            .ok_or(AuthError::SessionNotFound)
    }

    async fn mark_totp_verified(&self, token_hash: &[u8]) -> AuthResult<()> {
        let mut sessions = self.sessions.lock().unwrap();
        let (_, session) = sessions
            .iter_mut()
            .find(|(hash, _)| hash == token_hash)
            .ok_or(AuthError::SessionNotFound)?;
        session.totp_verified = true;
        session.state = STATE_TOTP_OK.to_string();
        Ok(())
    }

    async fn set_email_code(
        &self,
        token_hash: &[u8],
        code_hash: &[u8],
        expires_at: DateTime<Utc>,
    ) -> AuthResult<()> {
        let mut sessions = self.sessions.lock().unwrap();
        let (_, session) = sessions
            .iter_mut()
            .find(|(hash, _)| hash == token_hash)
            .ok_or(AuthError::SessionNotFound)?;
        session.email_code_hash = Some(code_hash.to_vec());
        session.email_expires_at = Some(expires_at);
        Ok(())
    }

    async fn delete_session(&self, token_hash: &[u8]) -> AuthResult<()> {
        let mut sessions = self.sessions.lock().unwrap();
        sessions.retain(|(hash, _)| hash != token_hash);
        Ok(())
    }
}

/// Mailer stub capturing the last codes instead of sending them.
#[derive(Default)]
pub struct CapturingMailer {
    pub fail: AtomicBool,
    last_verification: Mutex<Option<String>>,
    last_admin_code: Mutex<Option<String>>,
}

impl CapturingMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_verification(&self) -> Option<String> {
        self.last_verification.lock().unwrap().clone()
    }

    pub fn last_admin_code(&self) -> Option<String> {
        self.last_admin_code.lock().unwrap().clone()
    }
}

#[async_trait]
impl CodeSender for CapturingMailer {
    async fn send_verification(&self, _to: &str, code: &str) -> AppResult<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(auth_service::error::AppError::Internal(
                "mail backend down".into(),
            ));
        }
        *self.last_verification.lock().unwrap() = Some(code.to_string());
        Ok(())
    }

    async fn send_admin_code(&self, _to: &str, code: &str) -> AppResult<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(auth_service::error::AppError::Internal(
                "mail backend down".into(),
            ));
        }
        *self.last_admin_code.lock().unwrap() = Some(code.to_string());
        Ok(())
    }
}
