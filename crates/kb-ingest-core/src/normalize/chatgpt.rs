//! ChatGPT export normalizer.
//!
//! A ChatGPT conversation may carry its turns in a `mapping` tree
//! (node id → node with an optional `message`), in a flat `messages`
//! array, or both. Both passes run and their messages are merged, then
//! sorted by timestamp.

use chrono::{DateTime, Utc};
use serde_json::{json, Map, Value};
use uuid::Uuid;

use super::{epoch_seconds, flatten_content, str_field};
use crate::detect::ChatGptCandidate;
use crate::models::{Conversation, Message, Platform, Role};

pub const SOURCE_TAG: &str = "chatgpt_import";

/// Normalizes one ChatGPT-shaped object into a conversation.
///
/// The conversation keeps the source `id` (or `conversation_id`) so that
/// re-importing the same export is deduplicated. Objects without an id
/// get a generated one.
pub fn normalize_chatgpt(candidate: &ChatGptCandidate, now: DateTime<Utc>) -> Conversation {
    let data = &candidate.value;
    let mut messages = Vec::new();
    let mut last_model: Option<String> = None;

    if let Some(mapping) = data.get("mapping").and_then(Value::as_object) {
        for (node_key, node) in mapping {
            let Some(message) = node.get("message").filter(|m| !m.is_null()) else {
                continue;
            };
            let parts = message.get("content").and_then(|c| c.get("parts"));
            let first_part_present = parts
                .and_then(|p| p.get(0))
                .is_some_and(|first| match first {
                    Value::String(s) => !s.is_empty(),
                    Value::Null => false,
                    _ => true,
                });
            if !first_part_present {
                continue;
            }
            let content = parts.map(flatten_content).unwrap_or_default();
            if content.trim().is_empty() {
                continue;
            }

            let model = message
                .get("metadata")
                .and_then(|m| m.get("model_slug"))
                .and_then(Value::as_str)
                .map(str::to_string);
            if model.is_some() {
                last_model.clone_from(&model);
            }

            let id = str_field(node, &["id"])
                .or_else(|| str_field(message, &["id"]))
                .unwrap_or_else(|| node_key.clone());
            let role = message
                .get("author")
                .and_then(|a| a.get("role"))
                .and_then(Value::as_str);

            messages.push(Message {
                id,
                timestamp: epoch_seconds(message.get("create_time")).unwrap_or(now),
                role: Role::from_source(role),
                content,
                platform: Platform::ChatGpt,
                metadata: model_metadata(model),
            });
        }
    }

    if let Some(items) = data.get("messages").and_then(Value::as_array) {
        for (i, item) in items.iter().enumerate() {
            let content = item.get("content").map(flatten_content).unwrap_or_default();
            if content.trim().is_empty() {
                continue;
            }
            let model = str_field(item, &["model"]);
            if model.is_some() {
                last_model.clone_from(&model);
            }
            let role = item
                .get("author")
                .and_then(|a| a.get("role"))
                .or_else(|| item.get("role"))
                .and_then(Value::as_str);

            messages.push(Message {
                id: str_field(item, &["id"]).unwrap_or_else(|| format!("chatgpt_msg_{}", i)),
                timestamp: epoch_seconds(item.get("create_time")).unwrap_or(now),
                role: Role::from_source(role),
                content,
                platform: Platform::ChatGpt,
                metadata: model_metadata(model),
            });
        }
    }

    let id = str_field(data, &["id", "conversation_id"])
        .unwrap_or_else(|| format!("chatgpt_{}_{}", candidate.index, Uuid::new_v4()));
    let title = str_field(data, &["title"])
        .unwrap_or_else(|| format!("ChatGPT Conversation {}", candidate.index + 1));

    let mut metadata = Map::new();
    metadata.insert("source".into(), json!(SOURCE_TAG));
    if let Some(model) = last_model {
        metadata.insert("model".into(), json!(model));
    }

    Conversation::from_messages(id, title, Platform::ChatGpt, messages, metadata, now)
}

fn model_metadata(model: Option<String>) -> Map<String, Value> {
    let mut map = Map::new();
    if let Some(m) = model {
        map.insert("model".into(), Value::String(m));
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    fn candidate(value: Value) -> ChatGptCandidate {
        ChatGptCandidate { index: 0, value }
    }

    #[test]
    fn mapping_nodes_become_sorted_messages() {
        let data = json!({
            "id": "conv-1",
            "title": "Rust lifetimes",
            "mapping": {
                "root": { "id": "root", "message": null },
                "n2": {
                    "id": "n2",
                    "message": {
                        "author": { "role": "assistant" },
                        "create_time": 1700000010.0,
                        "content": { "parts": ["Borrowing rules", "explained"] },
                        "metadata": { "model_slug": "gpt-4o" }
                    }
                },
                "n1": {
                    "id": "n1",
                    "message": {
                        "author": { "role": "user" },
                        "create_time": 1700000000.0,
                        "content": { "parts": ["What is a lifetime?"] }
                    }
                },
                "sys": {
                    "id": "sys",
                    "message": {
                        "author": { "role": "system" },
                        "create_time": 1699999999.0,
                        "content": { "parts": [""] }
                    }
                }
            }
        });

        let conv = normalize_chatgpt(&candidate(data), now());
        assert_eq!(conv.id, "conv-1");
        assert_eq!(conv.title, "Rust lifetimes");
        assert_eq!(conv.messages.len(), 2);
        assert_eq!(conv.messages[0].id, "n1");
        assert_eq!(conv.messages[0].role, Role::Human);
        assert_eq!(conv.messages[1].content, "Borrowing rules\nexplained");
        assert_eq!(conv.messages[1].metadata["model"], "gpt-4o");
        assert_eq!(conv.metadata_str("model"), Some("gpt-4o"));
        assert_eq!(conv.start_date.timestamp(), 1_700_000_000);
        assert_eq!(conv.end_date.timestamp(), 1_700_000_010);
        assert!(conv.date_bounds_hold());
    }

    #[test]
    fn mapping_and_messages_are_merged() {
        // two content-bearing mapping nodes plus three content-bearing messages
        let data = json!({
            "mapping": {
                "a": { "message": { "author": {"role": "user"}, "create_time": 30.0, "content": {"parts": ["m-a"]} } },
                "b": { "message": { "author": {"role": "assistant"}, "create_time": 10.0, "content": {"parts": ["m-b"]} } }
            },
            "messages": [
                { "content": "x", "create_time": 20.0, "author": {"role": "user"} },
                { "content": "" },
                { "content": "y", "create_time": 5.0 },
                { "content": "z", "create_time": 40.0, "model": "gpt-4" }
            ]
        });
        let conv = normalize_chatgpt(&candidate(data), now());
        assert_eq!(conv.messages.len(), 5);
        let contents: Vec<&str> = conv.messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["y", "m-b", "x", "m-a", "z"]);
        assert!(conv.date_bounds_hold());
    }

    #[test]
    fn placeholders_when_source_lacks_id_and_title() {
        let data = json!({ "messages": [ { "content": "hello" } ] });
        let conv = normalize_chatgpt(&ChatGptCandidate { index: 4, value: data }, now());
        assert!(conv.id.starts_with("chatgpt_4_"));
        assert_eq!(conv.title, "ChatGPT Conversation 5");
        assert_eq!(conv.messages[0].timestamp, now());
        assert_eq!(conv.metadata_str("source"), Some(SOURCE_TAG));
    }

    #[test]
    fn no_messages_falls_back_to_now() {
        let conv = normalize_chatgpt(&candidate(json!({ "id": "e", "mapping": {} })), now());
        assert!(conv.messages.is_empty());
        assert_eq!(conv.start_date, now());
        assert_eq!(conv.end_date, now());
    }
}
