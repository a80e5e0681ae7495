use std::sync::Arc;

use uuid::Uuid;

use event_schema::{user_channel, BusError, DialogEvent, EventBus};

use crate::models::Message;

/// Serialises dialog events and publishes them on per-user channels.
#[derive(Clone)]
pub struct EventPublisher {
    bus: Arc<dyn EventBus>,
}

impl EventPublisher {
    pub fn new(bus: Arc<dyn EventBus>) -> Self {
        Self { bus }
    }

    /// `message.new` goes to every member except the sender.
    pub async fn publish_message(&self, message: &Message, members: &[Uuid]) -> Result<(), BusError> {
        let event = DialogEvent::MessageNew {
            dialog_id: message.dialog_id,
            message_id: message.id,
            sender_id: message.sender_id,
            text: message.text.clone(),
            created_at: message.created_at,
        };
        let payload = serde_json::to_string(&event)?;
        for member in members {
            if *member == message.sender_id {
                continue;
            }
            self.bus.publish(&user_channel(*member), &payload).await?;
        }
        Ok(())
    }

    /// Receipts go to every member, the actor included — their other
    /// devices keep state from it.
    pub async fn publish_delivery(
        &self,
        dialog_id: Uuid,
        user_id: Uuid,
        message_id: i64,
        members: &[Uuid],
    ) -> Result<(), BusError> {
        let event = DialogEvent::MessageDelivered {
            dialog_id,
            message_id,
            user_id,
        };
        self.publish_to_all(&event, members).await
    }

    pub async fn publish_read(
        &self,
        dialog_id: Uuid,
        user_id: Uuid,
        message_id: i64,
        members: &[Uuid],
    ) -> Result<(), BusError> {
        let event = DialogEvent::MessageRead {
            dialog_id,
            message_id,
            user_id,
        };
        self.publish_to_all(&event, members).await
    }

    async fn publish_to_all(&self, event: &DialogEvent, members: &[Uuid]) -> Result<(), BusError> {
        let payload = serde_json::to_string(event)?;
        for member in members {
            self.bus.publish(&user_channel(*member), &payload).await?;
        }
        Ok(())
    }
}
