use anyhow::Result;

use crate::config::Config;
use crate::db;

/// Creates the conversations table and its indexes. Idempotent.
pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;

    // One row per conversation; messages and metadata are stored as JSON
    // so records round-trip unchanged.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS conversations (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            platform TEXT NOT NULL,
            start_date TEXT NOT NULL,
            end_date TEXT NOT NULL,
            messages_json TEXT NOT NULL DEFAULT '[]',
            metadata_json TEXT NOT NULL DEFAULT '{}',
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(&pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_conversations_platform ON conversations(platform)")
        .execute(&pool)
        .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_conversations_start_date ON conversations(start_date DESC)",
    )
    .execute(&pool)
    .await?;

    pool.close().await;
    tracing::debug!(db = %config.db.path.display(), "migrations applied");
    Ok(())
}
