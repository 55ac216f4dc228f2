//! Knowledge base statistics.
//!
//! Prints conversation and message totals, a per-platform breakdown, the
//! average conversation length, and the recurring themes. The numbers come
//! from [`kb_ingest_core::analytics`], so the CLI and any other host report
//! the same figures.

use anyhow::Result;

use kb_ingest_core::analytics::{detect_themes, summarize};
use kb_ingest_core::store::{ConversationFilter, ConversationStore};

use crate::config::Config;
use crate::sqlite_store;

/// Run the stats command: read the collection and print a summary.
pub async fn run_stats(config: &Config, json: bool) -> Result<()> {
    let store = sqlite_store::open(config).await?;
    let convs = store.fetch_all(&ConversationFilter::default()).await?;
    store.pool().close().await;

    let analytics = summarize(&convs);
    let themes = detect_themes(&convs);
    if json {
        let mut out = serde_json::to_value(&analytics)?;
        out["themes"] = serde_json::to_value(&themes)?;
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    let db_size = std::fs::metadata(&config.db.path)
        .map(|m| m.len())
        .unwrap_or(0);

    println!("Knowledge Base Stats");
    println!("====================");
    println!();
    println!("  Database:       {}", config.db.path.display());
    println!("  Size:           {}", format_bytes(db_size));
    println!();
    println!("  Conversations:  {}", analytics.total_conversations);
    println!("  Messages:       {}", analytics.total_messages);
    println!(
        "  Avg messages:   {}",
        analytics.average_messages_per_conversation
    );

    if !analytics.platforms.is_empty() {
        println!();
        println!(
            "  {:<20} {:>13} {:>9}",
            "PLATFORM", "CONVERSATIONS", "MESSAGES"
        );
        for p in &analytics.platforms {
            println!(
                "  {:<20} {:>13} {:>9}",
                p.platform, p.conversations, p.messages
            );
        }
    }

    if !themes.is_empty() {
        println!();
        println!("  {:<20} {:>9}", "THEME", "MESSAGES");
        for t in &themes {
            println!("  {:<20} {:>9}", t.theme, t.frequency);
        }
    }
    println!();
    Ok(())
}

fn format_bytes(bytes: u64) -> String {
    if bytes >= 1_073_741_824 {
        format!("{:.1} GB", bytes as f64 / 1_073_741_824.0)
    } else if bytes >= 1_048_576 {
        format!("{:.1} MB", bytes as f64 / 1_048_576.0)
    } else if bytes >= 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{} B", bytes)
    }
}
