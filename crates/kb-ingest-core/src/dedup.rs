//! Identity-based deduplication.
//!
//! A record is new when its `id` is neither in the store nor earlier in
//! the same batch. This is set membership on ids, not a content hash: two
//! records with different ids and identical content are both kept.

use std::collections::HashSet;

use crate::models::Conversation;

/// Result of filtering a batch against stored ids.
#[derive(Debug, Clone, Default)]
pub struct DedupOutcome {
    /// Records to insert, in batch order.
    pub fresh: Vec<Conversation>,
    /// Ids dropped because they were already stored or repeated in the batch.
    pub duplicate_ids: Vec<String>,
}

/// Filters `batch` against `existing` ids. Within the batch the first
/// occurrence of an id wins.
pub fn dedup_against(batch: &[Conversation], existing: &HashSet<String>) -> DedupOutcome {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut outcome = DedupOutcome::default();
    for conv in batch {
        if existing.contains(&conv.id) || !seen.insert(conv.id.as_str()) {
            outcome.duplicate_ids.push(conv.id.clone());
        } else {
            outcome.fresh.push(conv.clone());
        }
    }
    outcome
}
