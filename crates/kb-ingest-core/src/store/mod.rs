//! Storage abstraction for the conversation knowledge base.
//!
//! The [`ConversationStore`] trait is the only persistence boundary the
//! pipeline sees: an opaque document collection with find/insert calls.
//! Backends (SQLite, in-memory) are injected where they are needed; there
//! is no process-wide store.
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;

use std::collections::HashSet;

use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;

use crate::models::Conversation;

/// Filters accepted by [`ConversationStore::fetch_all`].
///
/// `None`, an empty string, or `"all"` disables a filter. `kind` matches
/// `metadata.type` (named `type` on the wire).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConversationFilter {
    pub platform: Option<String>,
    pub category: Option<String>,
    pub source: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    #[serde(alias = "q")]
    pub query: Option<String>,
}

/// Returns the filter value when it is active.
pub fn active(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty() && !v.eq_ignore_ascii_case("all"))
}

impl ConversationFilter {
    pub fn is_empty(&self) -> bool {
        [
            &self.platform,
            &self.category,
            &self.source,
            &self.kind,
            &self.query,
        ]
        .iter()
        .all(|v| active(v).is_none())
    }

    /// Platform matches case-insensitively, metadata fields exactly, and the
    /// query is a case-insensitive substring of the title or any message.
    pub fn matches(&self, conv: &Conversation) -> bool {
        if let Some(p) = active(&self.platform) {
            if !conv.platform.as_str().eq_ignore_ascii_case(p) {
                return false;
            }
        }
        let meta_checks = [
            ("category", &self.category),
            ("source", &self.source),
            ("type", &self.kind),
        ];
        for (key, wanted) in meta_checks {
            if let Some(w) = active(wanted) {
                if conv.metadata_str(key) != Some(w) {
                    return false;
                }
            }
        }
        if let Some(q) = active(&self.query) {
            return matches_query(conv, q);
        }
        true
    }
}

/// Case-insensitive substring search over title and message content.
pub fn matches_query(conv: &Conversation, query: &str) -> bool {
    let q = query.to_lowercase();
    conv.title.to_lowercase().contains(&q)
        || conv
            .messages
            .iter()
            .any(|m| m.content.to_lowercase().contains(&q))
}

/// Abstract storage backend.
///
/// # Operations
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`fetch_all`](ConversationStore::fetch_all) | All records matching a filter, in insertion order |
/// | [`existing_ids`](ConversationStore::existing_ids) | Every stored id (deduplication input) |
/// | [`get`](ConversationStore::get) | One record by id |
/// | [`insert_many`](ConversationStore::insert_many) | Append a batch; all or nothing |
/// | [`delete_all`](ConversationStore::delete_all) | Empty the collection |
#[async_trait]
pub trait ConversationStore: Send + Sync {
    async fn fetch_all(&self, filter: &ConversationFilter) -> Result<Vec<Conversation>>;

    /// Ids of every stored record. The default reads the full collection;
    /// backends with an index should override it.
    async fn existing_ids(&self) -> Result<HashSet<String>> {
        let all = self.fetch_all(&ConversationFilter::default()).await?;
        Ok(all.into_iter().map(|c| c.id).collect())
    }

    async fn get(&self, id: &str) -> Result<Option<Conversation>> {
        let all = self.fetch_all(&ConversationFilter::default()).await?;
        Ok(all.into_iter().find(|c| c.id == id))
    }

    /// Appends `records`, returning the inserted count. A failure must
    /// leave the collection unchanged.
    async fn insert_many(&self, records: &[Conversation]) -> Result<u64>;

    /// Removes every record, returning how many were deleted.
    async fn delete_all(&self) -> Result<u64>;
}
