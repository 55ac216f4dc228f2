//! Conversation listing and filtering.
//!
//! Shared by `kb list` and `GET /api/conversations`. Filters follow
//! [`ConversationFilter`]: platform (case-insensitive), metadata
//! category/source/type, and a free-text query over titles and messages.

use anyhow::Result;

use kb_ingest_core::store::{ConversationFilter, ConversationStore};
use kb_ingest_core::Conversation;

use crate::config::Config;
use crate::sqlite_store;

/// Core listing function returning matching conversations in insertion order.
pub async fn list_conversations(
    config: &Config,
    filter: &ConversationFilter,
) -> Result<Vec<Conversation>> {
    let store = sqlite_store::open(config).await?;
    let result = store.fetch_all(filter).await;
    store.pool().close().await;
    result
}

/// CLI entry point for `kb list`.
pub async fn run_list(config: &Config, filter: ConversationFilter, json: bool) -> Result<()> {
    let convs = list_conversations(config, &filter).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&convs)?);
        return Ok(());
    }

    if convs.is_empty() {
        println!("No conversations found.");
        return Ok(());
    }

    for c in &convs {
        println!(
            "{}  [{}]  {}  ({} messages, {})",
            c.id,
            c.platform,
            c.title,
            c.messages.len(),
            c.start_date.format("%Y-%m-%d")
        );
    }
    println!();
    println!("{} conversations", convs.len());
    Ok(())
}
