use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Realtime event envelope, one JSON object per WebSocket frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DialogEvent {
    #[serde(rename = "message.new")]
    MessageNew {
        dialog_id: Uuid,
        message_id: i64,
        sender_id: Uuid,
        text: String,
        created_at: DateTime<Utc>,
    },

    #[serde(rename = "message.delivered")]
    MessageDelivered {
        dialog_id: Uuid,
        message_id: i64,
        /// The member who confirmed delivery.
        user_id: Uuid,
    },

    #[serde(rename = "message.read")]
    MessageRead {
        dialog_id: Uuid,
        message_id: i64,
        user_id: Uuid,
    },
}

/// One pub/sub channel per recipient.
pub fn user_channel(user_id: Uuid) -> String {
    format!("user:{user_id}")
}
