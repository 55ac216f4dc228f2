//! Conversation retrieval by ID.
//!
//! # Usage
//!
//! ```bash
//! kb get bibtex_smith2020
//! kb get imported_3f1c9a0b2d4e6f71 --json
//! ```

use anyhow::{bail, Result};

use kb_ingest_core::store::ConversationStore;
use kb_ingest_core::Conversation;

use crate::config::Config;
use crate::sqlite_store;

pub async fn get_conversation(config: &Config, id: &str) -> Result<Conversation> {
    let store = sqlite_store::open(config).await?;
    let result = store.get(id).await;
    store.pool().close().await;

    match result? {
        Some(conv) => Ok(conv),
        None => bail!("conversation not found: {}", id),
    }
}

/// CLI entry point for `kb get <id>`.
pub async fn run_get(config: &Config, id: &str, json: bool) -> Result<()> {
    let conv = get_conversation(config, id).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&conv)?);
        return Ok(());
    }

    println!("--- Conversation ---");
    println!("id:         {}", conv.id);
    println!("title:      {}", conv.title);
    println!("platform:   {}", conv.platform);
    println!("start_date: {}", conv.start_date.to_rfc3339());
    println!("end_date:   {}", conv.end_date.to_rfc3339());
    println!(
        "metadata:   {}",
        serde_json::Value::Object(conv.metadata.clone())
    );
    println!();

    println!("--- Messages ({}) ---", conv.messages.len());
    for msg in &conv.messages {
        println!("[{} {}]", msg.role.as_str(), msg.timestamp.to_rfc3339());
        println!("{}", msg.content);
        println!();
    }

    Ok(())
}
