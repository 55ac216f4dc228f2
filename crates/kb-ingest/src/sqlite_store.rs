//! SQLite-backed [`ConversationStore`] implementation.
//!
//! Each conversation is one row of the `conversations` table (see
//! [`crate::migrate`]); messages and metadata live in JSON columns.
//! Platform and metadata filters run in SQL; the free-text query is
//! applied in Rust so it matches the in-memory store exactly.

use std::collections::HashSet;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};

use kb_ingest_core::models::{Conversation, Message};
use kb_ingest_core::store::{active, matches_query, ConversationFilter, ConversationStore};

/// SQLite implementation of the [`ConversationStore`] trait.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn format_ts(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

fn parse_ts(raw: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(raw)
        .with_context(|| format!("invalid stored timestamp: {}", raw))?
        .with_timezone(&Utc))
}

fn row_to_conversation(row: &SqliteRow) -> Result<Conversation> {
    let id: String = row.get("id");
    let start: String = row.get("start_date");
    let end: String = row.get("end_date");
    let messages_json: String = row.get("messages_json");
    let metadata_json: String = row.get("metadata_json");
    let platform: String = row.get("platform");

    let messages: Vec<Message> = serde_json::from_str(&messages_json)
        .with_context(|| format!("corrupt messages for conversation {}", id))?;
    let metadata = serde_json::from_str(&metadata_json)
        .with_context(|| format!("corrupt metadata for conversation {}", id))?;

    Ok(Conversation {
        title: row.get("title"),
        platform: platform.into(),
        start_date: parse_ts(&start)?,
        end_date: parse_ts(&end)?,
        messages,
        metadata,
        id,
    })
}

#[async_trait]
impl ConversationStore for SqliteStore {
    async fn fetch_all(&self, filter: &ConversationFilter) -> Result<Vec<Conversation>> {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
            "SELECT id, title, platform, start_date, end_date, messages_json, metadata_json \
             FROM conversations WHERE 1 = 1",
        );
        if let Some(platform) = active(&filter.platform) {
            qb.push(" AND lower(platform) = lower(")
                .push_bind(platform.to_string())
                .push(")");
        }
        let meta_filters = [
            ("$.category", &filter.category),
            ("$.source", &filter.source),
            ("$.type", &filter.kind),
        ];
        for (path, value) in meta_filters {
            if let Some(v) = active(value) {
                qb.push(" AND json_extract(metadata_json, '")
                    .push(path)
                    .push("') = ")
                    .push_bind(v.to_string());
            }
        }
        qb.push(" ORDER BY rowid ASC");

        let rows = qb.build().fetch_all(&self.pool).await?;
        let mut out = Vec::with_capacity(rows.len());
        for row in &rows {
            let conv = row_to_conversation(row)?;
            if let Some(q) = active(&filter.query) {
                if !matches_query(&conv, q) {
                    continue;
                }
            }
            out.push(conv);
        }
        Ok(out)
    }

    async fn existing_ids(&self) -> Result<HashSet<String>> {
        let ids: Vec<String> = sqlx::query_scalar("SELECT id FROM conversations")
            .fetch_all(&self.pool)
            .await?;
        Ok(ids.into_iter().collect())
    }

    async fn get(&self, id: &str) -> Result<Option<Conversation>> {
        let row = sqlx::query(
            "SELECT id, title, platform, start_date, end_date, messages_json, metadata_json \
             FROM conversations WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_conversation).transpose()
    }

    async fn insert_many(&self, records: &[Conversation]) -> Result<u64> {
        let created_at = format_ts(&Utc::now());
        let mut tx = self.pool.begin().await?;

        for conv in records {
            let messages_json = serde_json::to_string(&conv.messages)?;
            let metadata_json = serde_json::to_string(&conv.metadata)?;
            sqlx::query(
                r#"
                INSERT INTO conversations (id, title, platform, start_date, end_date,
                                           messages_json, metadata_json, created_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&conv.id)
            .bind(&conv.title)
            .bind(conv.platform.as_str())
            .bind(format_ts(&conv.start_date))
            .bind(format_ts(&conv.end_date))
            .bind(&messages_json)
            .bind(&metadata_json)
            .bind(&created_at)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("failed to insert conversation {}", conv.id))?;
        }

        tx.commit().await?;
        Ok(records.len() as u64)
    }

    async fn delete_all(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM conversations")
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

/// Opens the configured database, applies migrations, and wraps it in a
/// [`SqliteStore`].
pub async fn open(config: &crate::config::Config) -> Result<SqliteStore> {
    crate::migrate::run_migrations(config).await?;
    let pool = crate::db::connect(config).await?;
    Ok(SqliteStore::new(pool))
}
