//! Export the knowledge base as a JSON array of conversations.
//!
//! The output uses the same record shape the store persists and
//! `POST /api/conversations` accepts, so an export can be loaded into
//! another instance unchanged.

use anyhow::{Context, Result};
use std::path::Path;

use kb_ingest_core::store::ConversationFilter;

use crate::config::Config;
use crate::list::list_conversations;

/// Export every conversation as JSON.
///
/// If `output` is `Some`, writes to that file path. Otherwise writes
/// to stdout for piping.
pub async fn run_export(config: &Config, output: Option<&Path>) -> Result<()> {
    let convs = list_conversations(config, &ConversationFilter::default()).await?;
    let json = serde_json::to_string_pretty(&convs)?;

    match output {
        Some(path) => {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)?;
                }
            }
            std::fs::write(path, &json)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            eprintln!(
                "Exported {} conversations to {}",
                convs.len(),
                path.display()
            );
        }
        None => println!("{}", json),
    }
    Ok(())
}
