//! Claude export normalizer.

use chrono::{DateTime, Utc};
use serde_json::{json, Map, Value};
use uuid::Uuid;

use super::{flatten_content, parse_timestamp, str_field};
use crate::models::{Conversation, Message, Platform, Role};

pub const SOURCE_TAG: &str = "claude_import";

/// Keys that may hold the message list, in priority order. The first one
/// holding an array wins.
const MESSAGE_KEYS: [&str; 3] = ["conversation", "messages", "chat_messages"];

/// Normalizes one Claude-shaped object into a conversation.
pub fn normalize_claude(data: &Value, now: DateTime<Utc>) -> Conversation {
    let source = MESSAGE_KEYS
        .iter()
        .find_map(|k| data.get(*k).and_then(Value::as_array));

    let mut messages = Vec::new();
    for (i, item) in source.into_iter().flatten().enumerate() {
        let content = ["text", "content"]
            .iter()
            .filter_map(|k| item.get(*k))
            .map(flatten_content)
            .find(|c| !c.trim().is_empty());
        let Some(content) = content else {
            continue;
        };

        let role = item
            .get("role")
            .or_else(|| item.get("sender"))
            .and_then(Value::as_str);
        let timestamp = parse_timestamp(item.get("timestamp"))
            .or_else(|| parse_timestamp(item.get("created_at")))
            .unwrap_or(now);

        messages.push(Message {
            id: str_field(item, &["id", "uuid"]).unwrap_or_else(|| format!("claude_{}", i)),
            timestamp,
            role: Role::from_source(role),
            content,
            platform: Platform::Claude,
            metadata: Map::new(),
        });
    }

    let id = str_field(data, &["id", "uuid"]).unwrap_or_else(|| format!("claude_{}", Uuid::new_v4()));
    let title = str_field(data, &["title", "name"]).unwrap_or_else(|| "Claude Conversation".to_string());

    let mut metadata = Map::new();
    metadata.insert("source".into(), json!(SOURCE_TAG));

    Conversation::from_messages(id, title, Platform::Claude, messages, metadata, now)
}
