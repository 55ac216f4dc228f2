//! Format detection for uploaded files.
//!
//! Classification is by extension first, then (for `.json`) by the shape
//! of the parsed value. The result is a tagged [`Detection`] carrying the
//! decoded payload, so normalizer dispatch is an exhaustive `match`.
//!
//! | Extension | Detection |
//! |-----------|-----------|
//! | `.bib` | [`Detection::Bibtex`] |
//! | `.json` | [`Detection::ConversationJson`] (ChatGPT, Claude, or both) |
//! | `.txt`, `.md` | [`Detection::PlainText`] |
//! | `.pdf`, `.docx` | [`Detection::NeedsExtraction`] |
//! | anything else | [`IngestError::UnsupportedFormat`] |

use std::path::Path;

use serde_json::Value;

use crate::error::{IngestError, Result};

pub const MIME_PDF: &str = "application/pdf";
pub const MIME_DOCX: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

/// Binary formats that need an external text extractor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryKind {
    Pdf,
    Docx,
}

impl BinaryKind {
    pub fn mime_type(&self) -> &'static str {
        match self {
            BinaryKind::Pdf => MIME_PDF,
            BinaryKind::Docx => MIME_DOCX,
        }
    }
}

/// A ChatGPT-shaped object plus its position in the export array
/// (used for the placeholder title).
#[derive(Debug, Clone, PartialEq)]
pub struct ChatGptCandidate {
    pub index: usize,
    pub value: Value,
}

/// Which conversation shapes a JSON file matched.
///
/// A single object exposing `messages` matches both shapes; both
/// normalizers then run over it.
#[derive(Debug, Clone, PartialEq)]
pub enum JsonShape {
    ChatGpt(Vec<ChatGptCandidate>),
    Claude(Vec<Value>),
    Both {
        chatgpt: Vec<ChatGptCandidate>,
        claude: Vec<Value>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Detection {
    Bibtex(String),
    ConversationJson(JsonShape),
    PlainText(String),
    NeedsExtraction(BinaryKind),
}

impl Detection {
    /// Short label for logs and progress output.
    pub fn label(&self) -> &'static str {
        match self {
            Detection::Bibtex(_) => "bibtex",
            Detection::ConversationJson(JsonShape::ChatGpt(_)) => "chatgpt-json",
            Detection::ConversationJson(JsonShape::Claude(_)) => "claude-json",
            Detection::ConversationJson(JsonShape::Both { .. }) => "chatgpt+claude-json",
            Detection::PlainText(_) => "text",
            Detection::NeedsExtraction(BinaryKind::Pdf) => "pdf",
            Detection::NeedsExtraction(BinaryKind::Docx) => "docx",
        }
    }
}

/// Lower-cased extension of `file_name`, without the dot.
pub fn extension_of(file_name: &str) -> Option<String> {
    Path::new(file_name)
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
}

/// Classifies a file by name and content.
pub fn detect(file_name: &str, content: &[u8]) -> Result<Detection> {
    let ext = extension_of(file_name);
    match ext.as_deref() {
        Some("bib") => Ok(Detection::Bibtex(decode_text(file_name, content)?)),
        Some("json") => {
            let text = decode_text(file_name, content)?;
            let value: Value = serde_json::from_str(&text)?;
            Ok(Detection::ConversationJson(classify_json(value)?))
        }
        Some("txt") | Some("md") => Ok(Detection::PlainText(decode_text(file_name, content)?)),
        Some("pdf") => Ok(Detection::NeedsExtraction(BinaryKind::Pdf)),
        Some("docx") => Ok(Detection::NeedsExtraction(BinaryKind::Docx)),
        Some(other) => Err(IngestError::UnsupportedFormat(format!(".{}", other))),
        None => Err(IngestError::UnsupportedFormat(format!(
            "{} has no file extension",
            file_name
        ))),
    }
}

/// Decodes UTF-8 text, dropping a leading byte-order mark.
pub fn decode_text(file_name: &str, content: &[u8]) -> Result<String> {
    let text = std::str::from_utf8(content).map_err(|e| {
        IngestError::MalformedContent(format!("{} is not valid UTF-8: {}", file_name, e))
    })?;
    Ok(text.strip_prefix('\u{feff}').unwrap_or(text).to_string())
}

fn has_field(value: &Value, key: &str) -> bool {
    value.get(key).is_some_and(|v| !v.is_null())
}

fn is_chatgpt_shaped(value: &Value) -> bool {
    has_field(value, "mapping") || has_field(value, "messages")
}

fn is_claude_shaped(value: &Value) -> bool {
    has_field(value, "conversation")
        || has_field(value, "messages")
        || has_field(value, "chat_messages")
}

/// Decides which normalizers a parsed JSON document feeds.
///
/// Arrays are exports of many conversations: elements with `mapping` or
/// `messages` go to the ChatGPT normalizer, elements carrying Claude's
/// `chat_messages` go to the Claude normalizer. A single object may match
/// both shapes.
pub fn classify_json(value: Value) -> Result<JsonShape> {
    let mut chatgpt = Vec::new();
    let mut claude = Vec::new();

    match value {
        Value::Array(items) => {
            for (index, item) in items.into_iter().enumerate() {
                if is_chatgpt_shaped(&item) {
                    chatgpt.push(ChatGptCandidate { index, value: item });
                } else if has_field(&item, "chat_messages") {
                    claude.push(item);
                }
            }
        }
        Value::Object(_) => {
            let claude_match = is_claude_shaped(&value);
            if is_chatgpt_shaped(&value) {
                chatgpt.push(ChatGptCandidate {
                    index: 0,
                    value: value.clone(),
                });
            }
            if claude_match {
                claude.push(value);
            }
        }
        _ => {}
    }

    match (chatgpt.is_empty(), claude.is_empty()) {
        (false, false) => Ok(JsonShape::Both { chatgpt, claude }),
        (false, true) => Ok(JsonShape::ChatGpt(chatgpt)),
        (true, false) => Ok(JsonShape::Claude(claude)),
        (true, true) => Err(IngestError::MalformedContent(
            "JSON has no ChatGPT or Claude conversation shape".to_string(),
        )),
    }
}
