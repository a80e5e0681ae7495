use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::Message;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DialogSummary {
    pub id: Uuid,
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_message: Option<Message>,
    pub unread_count: i64,
}
