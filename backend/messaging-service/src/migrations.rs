use sqlx::{Pool, Postgres};

// Embed SQL migrations at compile time for deterministic startup.
const MIG_0001: &str = include_str!("../migrations/0001_create_dialogs.sql");
const MIG_0002: &str = include_str!("../migrations/0002_create_dialog_members.sql");
const MIG_0003: &str = include_str!("../migrations/0003_create_messages.sql");
const MIG_0004: &str = include_str!("../migrations/0004_create_receipts.sql");

pub async fn run_all(db: &Pool<Postgres>) -> Result<(), sqlx::Error> {
    // Advisory lock so concurrent service replicas do not race migrations.
    let _ = sqlx::query("SELECT pg_advisory_lock(490218)").execute(db).await;
    let migrations = [MIG_0001, MIG_0002, MIG_0003, MIG_0004];
    for (i, sql) in migrations.into_iter().enumerate() {
        let label = i + 1;
        match sqlx::query(sql).execute(db).await {
            Ok(_) => tracing::info!(migration = %label, "messaging-service migration applied"),
            Err(e) => {
                tracing::warn!(migration = %label, error = %e, "migration may have been applied already")
            }
        }
    }
    let _ = sqlx::query("SELECT pg_advisory_unlock(490218)")
        .execute(db)
        .await;
    Ok(())
}
