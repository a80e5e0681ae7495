use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::{DialogSummary, Message};

const MAX_DIALOG_PAGE: i64 = 50;
const MAX_MESSAGE_PAGE: i64 = 100;

/// Dialog, membership, message and receipt persistence.
#[async_trait]
pub trait DialogStore: Send + Sync {
    /// Find the direct dialog containing exactly `{a, b}` regardless of
    /// argument order, creating it atomically when absent.
    async fn get_or_create_direct(&self, initiator: Uuid, peer: Uuid) -> AppResult<Uuid>;

    async fn list_dialogs(&self, user_id: Uuid, limit: i64) -> AppResult<Vec<DialogSummary>>;

    async fn is_member(&self, dialog_id: Uuid, user_id: Uuid) -> AppResult<bool>;

    async fn members(&self, dialog_id: Uuid) -> AppResult<Vec<Uuid>>;

    async fn save_message(
        &self,
        dialog_id: Uuid,
        sender_id: Uuid,
        text: &str,
    ) -> AppResult<(i64, DateTime<Utc>)>;

    async fn list_messages(
        &self,
        dialog_id: Uuid,
        user_id: Uuid,
        limit: i64,
        before: i64,
    ) -> AppResult<Vec<Message>>;

    async fn mark_delivered(&self, message_id: i64, user_id: Uuid) -> AppResult<()>;

    async fn mark_read(&self, message_id: i64, user_id: Uuid) -> AppResult<()>;
}

pub struct PgDialogStore {
    pool: PgPool,
}

impl PgDialogStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn create_direct(&self, initiator: Uuid, peer: Uuid) -> AppResult<Uuid> {
        let dialog_id = Uuid::new_v4();
        let mut tx = self.pool.begin().await?;
        sqlx::query(
            "INSERT INTO dialogs (id, kind, created_at, updated_at) VALUES ($1, 'direct', NOW(), NOW())",
        )
        .bind(dialog_id)
        .execute(&mut *tx)
        .await?;
        sqlx::query(
            "INSERT INTO dialog_members (dialog_id, user_id, role) \
             VALUES ($1, $2, 'member'), ($1, $3, 'member')",
        )
        .bind(dialog_id)
        .bind(initiator)
        .bind(peer)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(dialog_id)
    }
}

#[async_trait]
impl DialogStore for PgDialogStore {
    async fn get_or_create_direct(&self, initiator: Uuid, peer: Uuid) -> AppResult<Uuid> {
        let existing = sqlx::query(
            r#"
            SELECT d.id FROM dialogs d
            JOIN dialog_members m1 ON m1.dialog_id = d.id AND m1.user_id = $1
            JOIN dialog_members m2 ON m2.dialog_id = d.id AND m2.user_id = $2
            WHERE d.kind = 'direct'
            LIMIT 1
            "#,
        )
        .bind(initiator)
        .bind(peer)
        .fetch_optional(&self.pool)
        .await?;
        if let Some(row) = existing {
            return Ok(row.get("id"));
        }
        self.create_direct(initiator, peer).await
    }

    async fn list_dialogs(&self, user_id: Uuid, limit: i64) -> AppResult<Vec<DialogSummary>> {
        let limit = if limit <= 0 || limit > MAX_DIALOG_PAGE {
            MAX_DIALOG_PAGE
        } else {
            limit
        };
        let rows = sqlx::query(
            r#"
            WITH last_msg AS (
              SELECT DISTINCT ON (dialog_id)
                     dialog_id, id, sender_id, created_at,
                     convert_from(cipher_text, 'UTF8') AS text
              FROM messages
              ORDER BY dialog_id, id DESC
            ),
            unreads AS (
              SELECT dialog_id, COUNT(*) AS unread
              FROM messages m
              WHERE NOT EXISTS (
                SELECT 1 FROM message_reads r WHERE r.message_id = m.id AND r.user_id = $1
              ) AND m.sender_id <> $1
              GROUP BY dialog_id
            )
            SELECT d.id, d.kind, lm.id AS message_id, lm.sender_id, lm.created_at AS message_at,
                   lm.text, COALESCE(u.unread, 0) AS unread
            FROM dialogs d
            JOIN dialog_members dm ON dm.dialog_id = d.id AND dm.user_id = $1
            LEFT JOIN last_msg lm ON lm.dialog_id = d.id
            LEFT JOIN unreads u ON u.dialog_id = d.id
            ORDER BY lm.created_at DESC NULLS LAST, d.created_at DESC
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        let dialogs = rows
            .into_iter()
            .map(|row| {
                let id: Uuid = row.get("id");
                let kind: String = row.get("kind");
                let message_id: Option<i64> = row.get("message_id");
                let sender_id: Option<Uuid> = row.get("sender_id");
                let message_at: Option<DateTime<Utc>> = row.get("message_at");
                let text: Option<String> = row.get("text");
                let unread: i64 = row.get("unread");

                let last_message = match (message_id, sender_id, message_at, text) {
                    (Some(mid), Some(sid), Some(at), Some(text)) => Some(Message {
                        id: mid,
                        sender_id: sid,
                        dialog_id: id,
                        text,
                        created_at: at,
                        delivered_to_me: false,
                        read_by_me: false,
                        delivered_by_peer: false,
                        read_by_peer: false,
                    }),
                    _ => None,
                };
                DialogSummary {
                    id,
                    kind,
                    last_message,
                    unread_count: unread,
                }
            })
            .collect();
        Ok(dialogs)
    }

    async fn is_member(&self, dialog_id: Uuid, user_id: Uuid) -> AppResult<bool> {
        let row = sqlx::query(
            "SELECT EXISTS(SELECT 1 FROM dialog_members WHERE dialog_id = $1 AND user_id = $2) AS is_member",
        )
        .bind(dialog_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.get("is_member"))
    }

    async fn members(&self, dialog_id: Uuid) -> AppResult<Vec<Uuid>> {
        let rows = sqlx::query("SELECT user_id FROM dialog_members WHERE dialog_id = $1")
            .bind(dialog_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(|r| r.get("user_id")).collect())
    }

    async fn save_message(
        &self,
        dialog_id: Uuid,
        sender_id: Uuid,
        text: &str,
    ) -> AppResult<(i64, DateTime<Utc>)> {
        let row = sqlx::query(
            "INSERT INTO messages (dialog_id, sender_id, cipher_text, created_at) \
             VALUES ($1, $2, $3, NOW()) RETURNING id, created_at",
        )
        .bind(dialog_id)
        .bind(sender_id)
        .bind(text.as_bytes())
        .fetch_one(&self.pool)
        .await?;
        Ok((row.get("id"), row.get("created_at")))
    }

    async fn list_messages(
        &self,
        dialog_id: Uuid,
        user_id: Uuid,
        limit: i64,
        before: i64,
    ) -> AppResult<Vec<Message>> {
        let limit = if limit <= 0 {
            50
        } else {
            limit.min(MAX_MESSAGE_PAGE)
        };
        let messages = sqlx::query_as::<_, Message>(
            r#"
            WITH other_member AS (
              SELECT user_id FROM dialog_members
              WHERE dialog_id = $1 AND user_id <> $2
              LIMIT 1
            ),
            page AS (
              SELECT * FROM messages
              WHERE dialog_id = $1 AND ($3 = 0 OR id < $3)
              ORDER BY id DESC
              LIMIT $4
            )
            SELECT m.id, m.sender_id, m.dialog_id,
                   convert_from(m.cipher_text, 'UTF8') AS text,
                   m.created_at,
                   EXISTS(SELECT 1 FROM message_deliveries d
                          WHERE d.message_id = m.id AND d.user_id = $2) AS delivered_to_me,
                   EXISTS(SELECT 1 FROM message_reads r
                          WHERE r.message_id = m.id AND r.user_id = $2) AS read_by_me,
                   EXISTS(SELECT 1 FROM message_deliveries d
                          WHERE d.message_id = m.id
                            AND d.user_id = COALESCE(om.user_id, $2)) AS delivered_by_peer,
                   EXISTS(SELECT 1 FROM message_reads r
                          WHERE r.message_id = m.id
                            AND r.user_id = COALESCE(om.user_id, $2)) AS read_by_peer
            FROM page m
            LEFT JOIN other_member om ON TRUE
            ORDER BY m.id DESC
            "#,
        )
        .bind(dialog_id)
        .bind(user_id)
        .bind(before)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(messages)
    }

    async fn mark_delivered(&self, message_id: i64, user_id: Uuid) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO message_deliveries (message_id, user_id, delivered_at) \
             VALUES ($1, $2, NOW()) ON CONFLICT DO NOTHING",
        )
        .bind(message_id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn mark_read(&self, message_id: i64, user_id: Uuid) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO message_reads (message_id, user_id, read_at) \
             VALUES ($1, $2, NOW()) ON CONFLICT DO NOTHING",
        )
        .bind(message_id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
