//! Plain-text transcript normalizer.
//!
//! Transcripts alternate speakers with line prefixes:
//!
//! ```text
//! human: how do I reverse a list?
//! assistant: call .reverse() on it
//! or use slicing.
//! ```
//!
//! `human:`/`user:` and `assistant:`/`ai:` (any case) start a new turn;
//! other lines continue the current one. Text before the first prefix is
//! attributed to the human.

use chrono::{DateTime, Utc};
use serde_json::{json, Map};
use sha2::{Digest, Sha256};

use crate::models::{Conversation, Message, Platform, Role};

pub const SOURCE_TAG: &str = "file_import";

const HUMAN_PREFIXES: [&str; 2] = ["human:", "user:"];
const ASSISTANT_PREFIXES: [&str; 2] = ["assistant:", "ai:"];

fn strip_prefix_ci<'a>(line: &'a str, prefix: &str) -> Option<&'a str> {
    line.get(..prefix.len())
        .filter(|head| head.eq_ignore_ascii_case(prefix))
        .map(|_| &line[prefix.len()..])
}

/// Returns the role and remainder when `line` opens a new turn.
fn split_prefix(line: &str) -> Option<(Role, &str)> {
    HUMAN_PREFIXES
        .iter()
        .find_map(|p| strip_prefix_ci(line, p).map(|rest| (Role::Human, rest)))
        .or_else(|| {
            ASSISTANT_PREFIXES
                .iter()
                .find_map(|p| strip_prefix_ci(line, p).map(|rest| (Role::Assistant, rest)))
        })
}

struct TurnCollector {
    role: Role,
    buffer: String,
    messages: Vec<Message>,
    now: DateTime<Utc>,
}

impl TurnCollector {
    fn flush(&mut self) {
        let content = self.buffer.trim();
        if !content.is_empty() {
            self.messages.push(Message {
                id: format!("text_msg_{}", self.messages.len()),
                timestamp: self.now,
                role: self.role,
                content: content.to_string(),
                platform: Platform::Imported,
                metadata: Map::new(),
            });
        }
        self.buffer.clear();
    }

    fn start(&mut self, role: Role, rest: &str) {
        self.flush();
        self.role = role;
        self.buffer.push_str(rest.trim());
    }

    fn append(&mut self, line: &str) {
        if !self.buffer.is_empty() {
            self.buffer.push('\n');
        }
        self.buffer.push_str(line);
    }
}

/// Stable id for a transcript: the same file name and text always map to
/// the same id, so re-imports are filtered by the deduplicator.
pub fn transcript_id(file_name: &str, text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(file_name.as_bytes());
    hasher.update([0u8]);
    hasher.update(text.as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    format!("imported_{}", &digest[..16])
}

/// Normalizes a transcript into exactly one conversation titled
/// `"Imported: <file_name>"`.
///
/// The format has no per-line times, so every message is stamped with
/// `now`. `extracted_from` records the MIME type when the text came from
/// an external extractor.
pub fn normalize_transcript(
    text: &str,
    file_name: &str,
    extracted_from: Option<&str>,
    now: DateTime<Utc>,
) -> Conversation {
    let mut turns = TurnCollector {
        role: Role::Human,
        buffer: String::new(),
        messages: Vec::new(),
        now,
    };

    for raw in text.split('\n') {
        let line = raw.strip_suffix('\r').unwrap_or(raw);
        match split_prefix(line) {
            Some((role, rest)) => turns.start(role, rest),
            None => turns.append(line),
        }
    }
    turns.flush();

    let mut metadata = Map::new();
    metadata.insert("source".into(), json!(SOURCE_TAG));
    metadata.insert("filename".into(), json!(file_name));
    if let Some(mime) = extracted_from {
        metadata.insert("extractedFrom".into(), json!(mime));
    }

    Conversation::from_messages(
        transcript_id(file_name, text),
        format!("Imported: {}", file_name),
        Platform::Imported,
        turns.messages,
        metadata,
        now,
    )
}
