use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A dialog message annotated with receipt flags for the requesting user.
/// `delivered_by_peer` / `read_by_peer` refer to the single other direct
/// member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Message {
    pub id: i64,
    pub sender_id: Uuid,
    pub dialog_id: Uuid,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub delivered_to_me: bool,
    pub read_by_me: bool,
    pub delivered_by_peer: bool,
    pub read_by_peer: bool,
}
