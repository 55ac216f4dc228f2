//! In-memory [`ConversationStore`] for tests and embedding in other hosts.
//!
//! Records live in a `Vec` behind `std::sync::RwLock`, in insertion order.
//! Inserting an id that is already stored fails the whole batch, mirroring
//! the unique id column of the SQLite store.

use std::collections::HashSet;
use std::sync::RwLock;

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;

use crate::models::Conversation;

use super::{ConversationFilter, ConversationStore};

pub struct InMemoryStore {
    records: RwLock<Vec<Conversation>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(Vec::new()),
        }
    }

    /// Builds a store pre-populated with `records`.
    pub fn with_records(records: Vec<Conversation>) -> Self {
        Self {
            records: RwLock::new(records),
        }
    }

    pub fn len(&self) -> usize {
        self.records.read().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn poisoned<T>(_: T) -> anyhow::Error {
    anyhow!("in-memory store lock poisoned")
}

#[async_trait]
impl ConversationStore for InMemoryStore {
    async fn fetch_all(&self, filter: &ConversationFilter) -> Result<Vec<Conversation>> {
        let records = self.records.read().map_err(poisoned)?;
        Ok(records
            .iter()
            .filter(|c| filter.matches(c))
            .cloned()
            .collect())
    }

    async fn existing_ids(&self) -> Result<HashSet<String>> {
        let records = self.records.read().map_err(poisoned)?;
        Ok(records.iter().map(|c| c.id.clone()).collect())
    }

    async fn insert_many(&self, batch: &[Conversation]) -> Result<u64> {
        let mut records = self.records.write().map_err(poisoned)?;
        let mut ids: HashSet<&str> = records.iter().map(|c| c.id.as_str()).collect();
        for conv in batch {
            if !ids.insert(conv.id.as_str()) {
                bail!("duplicate conversation id: {}", conv.id);
            }
        }
        records.extend_from_slice(batch);
        Ok(batch.len() as u64)
    }

    async fn delete_all(&self) -> Result<u64> {
        let mut records = self.records.write().map_err(poisoned)?;
        let n = records.len() as u64;
        records.clear();
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Platform;
    use chrono::Utc;
    use serde_json::Map;

    fn conv(id: &str) -> Conversation {
        Conversation::from_messages(
            id.to_string(),
            format!("title {}", id),
            Platform::Gemini,
            Vec::new(),
            Map::new(),
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn insert_then_fetch_in_order() {
        let store = InMemoryStore::new();
        assert_eq!(store.insert_many(&[conv("a"), conv("b")]).await.unwrap(), 2);
        let all = store.fetch_all(&ConversationFilter::default()).await.unwrap();
        let ids: Vec<_> = all.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert!(store.get("b").await.unwrap().is_some());
        assert!(store.get("zzz").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_insert_is_all_or_nothing() {
        let store = InMemoryStore::with_records(vec![conv("a")]);
        let err = store.insert_many(&[conv("b"), conv("a")]).await;
        assert!(err.is_err());
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn delete_all_reports_count() {
        let store = InMemoryStore::with_records(vec![conv("a"), conv("b")]);
        assert_eq!(store.delete_all().await.unwrap(), 2);
        assert!(store.is_empty());
        assert!(store.existing_ids().await.unwrap().is_empty());
    }
}
