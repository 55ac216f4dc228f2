//! `kb clear`: delete every stored conversation.

use anyhow::Result;

use kb_ingest_core::store::ConversationStore;

use crate::config::Config;
use crate::sqlite_store;

pub async fn run_clear(config: &Config) -> Result<()> {
    let store = sqlite_store::open(config).await?;
    let deleted = store.delete_all().await?;
    store.pool().close().await;

    tracing::info!(deleted, "cleared knowledge base");
    println!("deleted {} conversations", deleted);
    Ok(())
}
