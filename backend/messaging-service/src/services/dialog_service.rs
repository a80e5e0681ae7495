use std::sync::Arc;

use uuid::Uuid;

use auth_core::store::AuthStore;

use crate::db::DialogStore;
use crate::error::{AppError, AppResult};
use crate::models::{DialogSummary, Message};
use crate::services::EventPublisher;

enum PendingEvent {
    New(Message),
    Delivered { dialog_id: Uuid, user_id: Uuid, message_id: i64 },
    Read { dialog_id: Uuid, user_id: Uuid, message_id: i64 },
}

impl PendingEvent {
    fn dialog_id(&self) -> Uuid {
        match self {
            PendingEvent::New(message) => message.dialog_id,
            PendingEvent::Delivered { dialog_id, .. } | PendingEvent::Read { dialog_id, .. } => {
                *dialog_id
            }
        }
    }
}

/// Direct-dialog operations. Every mutating call is membership-gated; the
/// realtime fan-out is detached and best-effort, so a bus outage never
/// fails a write.
pub struct DialogService {
    store: Arc<dyn DialogStore>,
    users: Arc<dyn AuthStore>,
    publisher: Option<EventPublisher>,
}

impl DialogService {
    pub fn new(store: Arc<dyn DialogStore>, users: Arc<dyn AuthStore>) -> Self {
        Self {
            store,
            users,
            publisher: None,
        }
    }

    pub fn with_publisher(mut self, publisher: EventPublisher) -> Self {
        self.publisher = Some(publisher);
        self
    }

    /// `target` is an opaque user id or an e-mail address. Returns the
    /// existing direct dialog for the pair when one exists.
    pub async fn create_direct(&self, current: Uuid, target: &str) -> AppResult<Uuid> {
        let peer = match Uuid::parse_str(target) {
            Ok(id) => id,
            Err(_) => {
                self.users
                    .user_by_email(target)
                    .await
                    .map_err(|_| AppError::BadRequest("unknown peer".into()))?
                    .id
            }
        };
        if peer.is_nil() || peer == current {
            return Err(AppError::BadRequest("invalid peer".into()));
        }
        self.store.get_or_create_direct(current, peer).await
    }

    pub async fn list_dialogs(&self, current: Uuid, limit: i64) -> AppResult<Vec<DialogSummary>> {
        self.store.list_dialogs(current, limit).await
    }

    pub async fn send_message(
        &self,
        current: Uuid,
        dialog_id: Uuid,
        text: &str,
    ) -> AppResult<Message> {
        self.require_member(dialog_id, current).await?;
        let (id, created_at) = self.store.save_message(dialog_id, current, text).await?;
        let message = Message {
            id,
            sender_id: current,
            dialog_id,
            text: text.to_string(),
            created_at,
            delivered_to_me: false,
            read_by_me: false,
            delivered_by_peer: false,
            read_by_peer: false,
        };
        self.spawn_publish(PendingEvent::New(message.clone()));
        Ok(message)
    }

    pub async fn list_messages(
        &self,
        current: Uuid,
        dialog_id: Uuid,
        limit: i64,
        before: i64,
    ) -> AppResult<Vec<Message>> {
        self.require_member(dialog_id, current).await?;
        self.store
            .list_messages(dialog_id, current, limit, before)
            .await
    }

    pub async fn mark_delivered(
        &self,
        current: Uuid,
        dialog_id: Uuid,
        message_id: i64,
    ) -> AppResult<()> {
        self.require_member(dialog_id, current).await?;
        self.store.mark_delivered(message_id, current).await?;
        self.spawn_publish(PendingEvent::Delivered {
            dialog_id,
            user_id: current,
            message_id,
        });
        Ok(())
    }

    pub async fn mark_read(
        &self,
        current: Uuid,
        dialog_id: Uuid,
        message_id: i64,
    ) -> AppResult<()> {
        self.require_member(dialog_id, current).await?;
        self.store.mark_read(message_id, current).await?;
        self.spawn_publish(PendingEvent::Read {
            dialog_id,
            user_id: current,
            message_id,
        });
        Ok(())
    }

    async fn require_member(&self, dialog_id: Uuid, user_id: Uuid) -> AppResult<()> {
        if !self.store.is_member(dialog_id, user_id).await? {
            return Err(AppError::Forbidden);
        }
        Ok(())
    }

    /// Fan the event out from a detached task: returning the HTTP response
    /// must not wait on (or be failed by) the bus.
    fn spawn_publish(&self, event: PendingEvent) {
        let Some(publisher) = self.publisher.clone() else {
            return;
        };
        let store = self.store.clone();
        tokio::spawn(async move {
            let dialog_id = event.dialog_id();
            let members = match store.members(dialog_id).await {
                Ok(members) => members,
                Err(e) => {
                    tracing::warn!(error = %e, %dialog_id, "fetching members for fan-out failed");
                    return;
                }
            };
            let result = match event {
                PendingEvent::New(message) => publisher.publish_message(&message, &members).await,
                PendingEvent::Delivered {
                    dialog_id,
                    user_id,
                    message_id,
                } => {
                    publisher
                        .publish_delivery(dialog_id, user_id, message_id, &members)
                        .await
                }
                PendingEvent::Read {
                    dialog_id,
                    user_id,
                    message_id,
                } => {
                    publisher
                        .publish_read(dialog_id, user_id, message_id, &members)
                        .await
                }
            };
            if let Err(e) = result {
                tracing::warn!(error = %e, %dialog_id, "realtime publish failed");
            }
        });
    }
}
