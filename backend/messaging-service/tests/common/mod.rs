#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use auth_core::models::{Session, SessionInfo, User};
use auth_core::store::{AuthStore, RefreshLookup};
use auth_core::{AuthError, AuthResult, TokenValidator};
use messaging_service::db::DialogStore;
use messaging_service::error::AppResult;
use messaging_service::models::{DialogSummary, Message};

struct StoredMessage {
    id: i64,
    dialog_id: Uuid,
    sender_id: Uuid,
    text: String,
    created_at: DateTime<Utc>,
}

#[derive(Default)]
struct DialogState {
    dialogs: Vec<(Uuid, DateTime<Utc>)>,
    members: HashMap<Uuid, Vec<Uuid>>,
    messages: Vec<StoredMessage>,
    deliveries: HashSet<(i64, Uuid)>,
    reads: HashSet<(i64, Uuid)>,
    next_id: i64,
}

/// In-memory dialog store mirroring the Postgres semantics.
#[derive(Default)]
pub struct MemoryDialogStore {
    state: Mutex<DialogState>,
}

impl MemoryDialogStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn delivery_count(&self) -> usize {
        self.state.lock().unwrap().deliveries.len()
    }

    pub fn read_count(&self) -> usize {
        self.state.lock().unwrap().reads.len()
    }

    pub fn message_count(&self) -> usize {
        self.state.lock().unwrap().messages.len()
    }
}

#[async_trait]
impl DialogStore for MemoryDialogStore {
    async fn get_or_create_direct(&self, initiator: Uuid, peer: Uuid) -> AppResult<Uuid> {
        let mut state = self.state.lock().unwrap();
        for (dialog_id, members) in &state.members {
            if members.len() == 2 && members.contains(&initiator) && members.contains(&peer) {
                return Ok(*dialog_id);
            }
        }
        let dialog_id = Uuid::new_v4();
        state.dialogs.push((dialog_id, Utc::now()));
        state.members.insert(dialog_id, vec![initiator, peer]);
        Ok(dialog_id)
    }

    async fn list_dialogs(&self, user_id: Uuid, limit: i64) -> AppResult<Vec<DialogSummary>> {
        let limit = if limit <= 0 || limit > 50 { 50 } else { limit } as usize;
        let state = self.state.lock().unwrap();
        let mut dialogs: Vec<DialogSummary> = state
            .dialogs
            .iter()
            .filter(|(id, _)| {
                state
                    .members
                    .get(id)
                    .is_some_and(|members| members.contains(&user_id))
            })
            .map(|(id, _)| {
                let last = state
                    .messages
                    .iter()
                    .filter(|m| m.dialog_id == *id)
                    .max_by_key(|m| m.id)
                    .map(|m| Message {
                        id: m.id,
                        sender_id: m.sender_id,
                        dialog_id: m.dialog_id,
                        text: m.text.clone(),
                        created_at: m.created_at,
                        delivered_to_me: false,
                        read_by_me: false,
                        delivered_by_peer: false,
                        read_by_peer: false,
                    });
                let unread = state
                    .messages
                    .iter()
                    .filter(|m| {
                        m.dialog_id == *id
                            && m.sender_id != user_id
                            && !state.reads.contains(&(m.id, user_id))
                    })
                    .count() as i64;
                DialogSummary {
                    id: *id,
                    kind: "direct".into(),
                    last_message: last,
                    unread_count: unread,
                }
            })
            .collect();
        dialogs.sort_by(|a, b| {
            let at = a.last_message.as_ref().map(|m| m.created_at);
            let bt = b.last_message.as_ref().map(|m| m.created_at);
            bt.cmp(&at)
        });
        dialogs.truncate(limit);
        Ok(dialogs)
    }

    async fn is_member(&self, dialog_id: Uuid, user_id: Uuid) -> AppResult<bool> {
        let state = self.state.lock().unwrap();
        Ok(state
            .members
            .get(&dialog_id)
            .is_some_and(|members| members.contains(&user_id)))
    }

    async fn members(&self, dialog_id: Uuid) -> AppResult<Vec<Uuid>> {
        let state = self.state.lock().unwrap();
        Ok(state.members.get(&dialog_id).cloned().unwrap_or_default())
    }

    async fn save_message(
        &self,
        dialog_id: Uuid,
        sender_id: Uuid,
        text: &str,
    ) -> AppResult<(i64, DateTime<Utc>)> {
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let id = state.next_id;
        let created_at = Utc::now();
        state.messages.push(StoredMessage {
            id,
            dialog_id,
            sender_id,
            text: text.to_string(),
            created_at,
        });
        Ok((id, created_at))
    }

    async fn list_messages(
        &self,
        dialog_id: Uuid,
        user_id: Uuid,
        limit: i64,
        before: i64,
    ) -> AppResult<Vec<Message>> {
        let limit = if limit <= 0 { 50 } else { limit.min(100) } as usize;
        let state = self.state.lock().unwrap();
        let peer = state
            .members
            .get(&dialog_id)
            .and_then(|members| members.iter().find(|m| **m != user_id))
            .copied()
            .unwrap_or(user_id);
        let mut messages: Vec<Message> = state
            .messages
            .iter()
            .filter(|m| m.dialog_id == dialog_id && (before == 0 || m.id < before))
            .map(|m| Message {
                id: m.id,
                sender_id: m.sender_id,
                dialog_id: m.dialog_id,
                text: m.text.clone(),
                created_at: m.created_at,
                delivered_to_me: state.deliveries.contains(&(m.id, user_id)),
                read_by_me: state.reads.contains(&(m.id, user_id)),
                delivered_by_peer: state.deliveries.contains(&(m.id, peer)),
                read_by_peer: state.reads.contains(&(m.id, peer)),
            })
            .collect();
        messages.sort_by(|a, b| b.id.cmp(&a.id));
        messages.truncate(limit);
        Ok(messages)
    }

    async fn mark_delivered(&self, message_id: i64, user_id: Uuid) -> AppResult<()> {
        let mut state = self.state.lock().unwrap();
        state.deliveries.insert((message_id, user_id));
        Ok(())
    }

    async fn mark_read(&self, message_id: i64, user_id: Uuid) -> AppResult<()> {
        let mut state = self.state.lock().unwrap();
        state.reads.insert((message_id, user_id));
        Ok(())
    }
}

/// Minimal user directory backing e-mail peer resolution.
#[derive(Default)]
pub struct MemoryUserDirectory {
    users: Mutex<Vec<User>>,
}

impl MemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_user(&self, email: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.users.lock().unwrap().push(User {
            id,
            email: email.to_string(),
            password_hash: String::new(),
            is_active: true,
            is_admin: false,
            banned_at: None,
            ban_reason: None,
            admin_totp_secret: None,
            created_at: Utc::now(),
        });
        id
    }
}

fn unsupported<T>() -> AuthResult<T> {
    Err(AuthError::Internal("not supported by user directory".into()))
}

#[async_trait]
impl AuthStore for MemoryUserDirectory {
    async fn create_user(&self, _email: &str, _password_hash: &str) -> AuthResult<User> {
        unsupported()
    }

    async fn activate_user(&self, _user_id: Uuid) -> AuthResult<()> {
        unsupported()
    }

    async fn user_by_email(&self, email: &str) -> AuthResult<User> {
        self.users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.email == email)
            .cloned()
            .ok_or(AuthError::UserNotFound)
    }

    async fn user_by_id(&self, id: Uuid) -> AuthResult<User> {
        self.users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.id == id)
            .cloned()
            .ok_or(AuthError::UserNotFound)
    }

    async fn save_verification_code(
        &self,
        _user_id: Uuid,
        _code_hash: &[u8],
        _expires_at: DateTime<Utc>,
    ) -> AuthResult<()> {
        unsupported()
    }

    async fn consume_verification_code(&self, _email: &str, _code_hash: &[u8]) -> AuthResult<User> {
        unsupported()
    }

    async fn create_device(&self, _user_id: Uuid, _name: &str, _platform: &str) -> AuthResult<Uuid> {
        unsupported()
    }

    async fn create_session(
        &self,
        _user_id: Uuid,
        _device_id: Uuid,
        _access_hash: &[u8],
        _refresh_hash: &[u8],
        _expires_at: DateTime<Utc>,
        _user_agent: &str,
        _ip: &str,
    ) -> AuthResult<Uuid> {
        unsupported()
    }

    async fn session_by_refresh(&self, _refresh_hash: &[u8]) -> AuthResult<RefreshLookup> {
        unsupported()
    }

    async fn rotate_session(
        &self,
        _session_id: Uuid,
        _old_refresh_hash: &[u8],
        _new_access_hash: &[u8],
        _new_refresh_hash: &[u8],
        _expires_at: DateTime<Utc>,
    ) -> AuthResult<()> {
        unsupported()
    }

    async fn revoke_session(&self, _session_id: Uuid, _reason: &str) -> AuthResult<()> {
        unsupported()
    }

    async fn revoke_user_sessions(&self, _user_id: Uuid, _reason: &str) -> AuthResult<()> {
        unsupported()
    }

    async fn session_by_access(&self, _access_hash: &[u8]) -> AuthResult<Session> {
        unsupported()
    }

    async fn set_totp_secret(&self, _user_id: Uuid, _secret: &str) -> AuthResult<()> {
        unsupported()
    }
}

enum Grant {
    Valid(SessionInfo),
    Banned { reason: String, at: DateTime<Utc> },
}

/// Token validator stub for HTTP tests.
#[derive(Default)]
pub struct StubValidator {
    grants: Mutex<HashMap<String, Grant>>,
}

impl StubValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn grant(&self, token: &str, user_id: Uuid) {
        self.grants.lock().unwrap().insert(
            token.to_string(),
            Grant::Valid(SessionInfo {
                user_id,
                device_id: Uuid::new_v4(),
                is_admin: false,
            }),
        );
    }

    pub fn grant_banned(&self, token: &str, reason: &str) {
        self.grants.lock().unwrap().insert(
            token.to_string(),
            Grant::Banned {
                reason: reason.to_string(),
                at: Utc::now(),
            },
        );
    }
}

#[async_trait]
impl TokenValidator for StubValidator {
    async fn validate_token(&self, token: &str) -> AuthResult<SessionInfo> {
        match self.grants.lock().unwrap().get(token) {
            Some(Grant::Valid(info)) => Ok(*info),
            Some(Grant::Banned { reason, at }) => Err(AuthError::Banned {
                reason: Some(reason.clone()),
                at: *at,
            }),
            None => Err(AuthError::SessionNotFound),
        }
    }
}
