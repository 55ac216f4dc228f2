//! Core data models for the conversation knowledge base.
//!
//! Every normalizer produces [`Conversation`]s; the store persists them
//! as-is and hands them back to search and analytics callers. Records
//! are never mutated after a normalizer builds them.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Provenance tag for a conversation or message.
///
/// Serialized as its display string so stored records keep the
/// `"ChatGPT"` / `"BibTeX Import"` shape that downstream readers expect.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Platform {
    ChatGpt,
    Claude,
    BibtexImport,
    Imported,
    Gemini,
    Other(String),
}

impl Platform {
    pub fn as_str(&self) -> &str {
        match self {
            Platform::ChatGpt => "ChatGPT",
            Platform::Claude => "Claude",
            Platform::BibtexImport => "BibTeX Import",
            Platform::Imported => "Imported",
            Platform::Gemini => "Gemini",
            Platform::Other(s) => s,
        }
    }
}

impl From<String> for Platform {
    fn from(s: String) -> Self {
        match s.as_str() {
            "ChatGPT" => Platform::ChatGpt,
            "Claude" => Platform::Claude,
            "BibTeX Import" => Platform::BibtexImport,
            "Imported" => Platform::Imported,
            "Gemini" => Platform::Gemini,
            _ => Platform::Other(s),
        }
    }
}

impl From<Platform> for String {
    fn from(p: Platform) -> Self {
        p.as_str().to_string()
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Human,
    Assistant,
}

impl Role {
    /// Maps a source role string: `user`/`human` become [`Role::Human`],
    /// everything else (assistant, system, tool, model names) is
    /// attributed to the assistant.
    pub fn from_source(role: Option<&str>) -> Self {
        match role.map(str::to_ascii_lowercase).as_deref() {
            Some("user") | Some("human") => Role::Human,
            _ => Role::Assistant,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Human => "human",
            Role::Assistant => "assistant",
        }
    }
}

/// One turn within a [`Conversation`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Unique within the parent conversation.
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub role: Role,
    /// Never empty; normalizers drop empty source nodes.
    pub content: String,
    pub platform: Platform,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,
}

/// Canonical unit of ingested knowledge: one imported thread or document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    /// Idempotency key. The deduplicator filters on this value.
    pub id: String,
    pub title: String,
    pub platform: Platform,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    /// Chronological; see [`Conversation::date_bounds_hold`].
    pub messages: Vec<Message>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl Conversation {
    /// Builds a conversation from already-extracted messages.
    ///
    /// Messages are sorted ascending by timestamp (stable, so source order
    /// breaks ties) and the date range is taken from the first and last
    /// message. With no messages both bounds fall back to `fallback`.
    pub fn from_messages(
        id: String,
        title: String,
        platform: Platform,
        mut messages: Vec<Message>,
        metadata: Map<String, Value>,
        fallback: DateTime<Utc>,
    ) -> Self {
        messages.sort_by_key(|m| m.timestamp);
        let start_date = messages.first().map(|m| m.timestamp).unwrap_or(fallback);
        let end_date = messages.last().map(|m| m.timestamp).unwrap_or(fallback);
        Self {
            id,
            title,
            platform,
            start_date,
            end_date,
            messages,
            metadata,
        }
    }

    /// Reads a string-valued metadata field.
    pub fn metadata_str(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).and_then(Value::as_str)
    }

    /// Checks the date invariants: `start_date <= end_date`, messages are
    /// non-decreasing in time, and when messages exist the bounds equal
    /// their first and last timestamps.
    pub fn date_bounds_hold(&self) -> bool {
        if self.start_date > self.end_date {
            return false;
        }
        if self
            .messages
            .windows(2)
            .any(|w| w[0].timestamp > w[1].timestamp)
        {
            return false;
        }
        match (self.messages.first(), self.messages.last()) {
            (Some(first), Some(last)) => {
                first.timestamp == self.start_date && last.timestamp == self.end_date
            }
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn msg(id: &str, secs: i64, role: Role) -> Message {
        Message {
            id: id.to_string(),
            timestamp: Utc.timestamp_opt(secs, 0).unwrap(),
            role,
            content: format!("content {}", id),
            platform: Platform::ChatGpt,
            metadata: Map::new(),
        }
    }

    #[test]
    fn platform_serializes_as_display_string() {
        let json = serde_json::to_string(&Platform::BibtexImport).unwrap();
        assert_eq!(json, "\"BibTeX Import\"");
        let back: Platform = serde_json::from_str("\"Perplexity\"").unwrap();
        assert_eq!(back, Platform::Other("Perplexity".to_string()));
        let gemini: Platform = serde_json::from_str("\"Gemini\"").unwrap();
        assert_eq!(gemini, Platform::Gemini);
    }

    #[test]
    fn role_mapping() {
        assert_eq!(Role::from_source(Some("user")), Role::Human);
        assert_eq!(Role::from_source(Some("Human")), Role::Human);
        assert_eq!(Role::from_source(Some("assistant")), Role::Assistant);
        assert_eq!(Role::from_source(Some("system")), Role::Assistant);
        assert_eq!(Role::from_source(None), Role::Assistant);
    }

    #[test]
    fn from_messages_sorts_and_bounds() {
        let fallback = Utc.timestamp_opt(0, 0).unwrap();
        let conv = Conversation::from_messages(
            "c1".into(),
            "t".into(),
            Platform::ChatGpt,
            vec![msg("b", 20, Role::Assistant), msg("a", 10, Role::Human)],
            Map::new(),
            fallback,
        );
        assert_eq!(conv.messages[0].id, "a");
        assert_eq!(conv.start_date.timestamp(), 10);
        assert_eq!(conv.end_date.timestamp(), 20);
        assert!(conv.date_bounds_hold());
    }

    #[test]
    fn empty_conversation_uses_fallback() {
        let fallback = Utc.timestamp_opt(42, 0).unwrap();
        let conv = Conversation::from_messages(
            "c".into(),
            "t".into(),
            Platform::Claude,
            Vec::new(),
            Map::new(),
            fallback,
        );
        assert_eq!(conv.start_date, fallback);
        assert_eq!(conv.end_date, fallback);
        assert!(conv.date_bounds_hold());
    }

    #[test]
    fn conversation_json_shape_is_camel_case() {
        let fallback = Utc.timestamp_opt(0, 0).unwrap();
        let conv = Conversation::from_messages(
            "c".into(),
            "t".into(),
            Platform::Imported,
            vec![msg("a", 1, Role::Human)],
            Map::new(),
            fallback,
        );
        let value = serde_json::to_value(&conv).unwrap();
        assert!(value.get("startDate").is_some());
        assert!(value.get("endDate").is_some());
        assert_eq!(value["messages"][0]["role"], "human");
        assert!(value["messages"][0].get("metadata").is_none());
    }
}
