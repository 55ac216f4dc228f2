//! BibTeX normalizer.
//!
//! Each `@type{key, field = value, ...}` entry becomes one conversation
//! holding a single synthetic message (the abstract, or a one-line
//! description). Entry bodies are located by brace matching, so both
//! multi-line and single-line entries are found. Field values may be
//! brace-delimited (one level of nested braces), quote-delimited, or bare
//! (`year = 2020`); literal braces are stripped from the result.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use chrono::{DateTime, Datelike, TimeZone, Utc};
use regex::Regex;
use serde_json::{json, Map};

use crate::error::{IngestError, Result};
use crate::models::{Conversation, Message, Platform, Role};

pub const SOURCE_TAG: &str = "bibtex_import";
pub const CATEGORY: &str = "Academic Publications";

/// Blocks that look like entries but carry no publication.
const NON_ENTRY_TYPES: [&str; 3] = ["comment", "preamble", "string"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BibEntry {
    /// Lower-cased entry type (`article`, `inproceedings`, ...).
    pub entry_type: String,
    pub citation_key: String,
    /// Lower-cased field names to cleaned values.
    pub fields: BTreeMap<String, String>,
}

impl BibEntry {
    fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }
}

fn header_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"@\s*([A-Za-z]+)\s*\{").expect("valid header regex"))
}

fn field_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r#"([A-Za-z][\w-]*)\s*=\s*(?:\{((?:[^{}]|\{[^{}]*\})*)\}|"([^"]*)"|([\w.:/+-]+))"#,
        )
        .expect("valid field regex")
    })
}

/// Byte offset of the brace closing the one opened just before `from`.
fn matching_brace(text: &str, from: usize) -> Option<usize> {
    let mut depth = 1usize;
    for (offset, byte) in text.as_bytes()[from..].iter().enumerate() {
        match byte {
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(from + offset);
                }
            }
            _ => {}
        }
    }
    None
}

fn clean_value(raw: &str) -> String {
    raw.replace(['{', '}'], "")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Scans `text` for entries. Malformed entries (no closing brace, no
/// citation key) are skipped.
pub fn parse_bibtex(text: &str) -> Vec<BibEntry> {
    let mut entries = Vec::new();
    let mut resume_at = 0usize;

    for caps in header_re().captures_iter(text) {
        let (Some(whole), Some(kind)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        if whole.start() < resume_at {
            continue;
        }
        let body_start = whole.end();
        let Some(body_end) = matching_brace(text, body_start) else {
            tracing::debug!(offset = whole.start(), "unterminated BibTeX entry skipped");
            continue;
        };
        resume_at = body_end + 1;

        let entry_type = kind.as_str().to_ascii_lowercase();
        if NON_ENTRY_TYPES.contains(&entry_type.as_str()) {
            continue;
        }

        let body = &text[body_start..body_end];
        let Some((key, fields_text)) = body.split_once(',') else {
            continue;
        };
        let citation_key = key.trim();
        if citation_key.is_empty() || citation_key.contains(char::is_whitespace) {
            continue;
        }

        let mut fields = BTreeMap::new();
        for f in field_re().captures_iter(fields_text) {
            let value = f.get(2).or_else(|| f.get(3)).or_else(|| f.get(4));
            if let (Some(name), Some(value)) = (f.get(1), value) {
                fields.insert(name.as_str().to_ascii_lowercase(), clean_value(value.as_str()));
            }
        }

        entries.push(BibEntry {
            entry_type,
            citation_key: citation_key.to_string(),
            fields,
        });
    }

    entries
}

/// January 1 of the entry's year, or of the current year when the entry
/// has no usable `year`.
fn publication_date(entry: &BibEntry, now: DateTime<Utc>) -> DateTime<Utc> {
    let year = entry
        .field("year")
        .and_then(|y| {
            let digits: String = y.chars().take_while(char::is_ascii_digit).collect();
            digits.parse::<i32>().ok()
        })
        .unwrap_or_else(|| now.year());
    Utc.with_ymd_and_hms(year, 1, 1, 0, 0, 0)
        .single()
        .unwrap_or(now)
}

/// Converts one entry into a conversation.
///
/// The id is `bibtex_<citationKey>`: importing the same bibliography again
/// produces the same ids, which the deduplicator then filters.
pub fn entry_to_conversation(entry: &BibEntry, file_name: &str, now: DateTime<Utc>) -> Conversation {
    let date = publication_date(entry, now);
    let author = entry.field("author");
    let content = match entry.field("abstract") {
        Some(abs) => abs.to_string(),
        None => format!(
            "A {} by {}.",
            entry.entry_type,
            author.unwrap_or("Unknown Author")
        ),
    };

    let mut metadata = Map::new();
    metadata.insert("source".into(), json!(SOURCE_TAG));
    metadata.insert("category".into(), json!(CATEGORY));
    metadata.insert("type".into(), json!(entry.entry_type));
    metadata.insert("citationKey".into(), json!(entry.citation_key));
    // The defaulted date is not a source year.
    if let Some(year) = entry.field("year") {
        let value = year.parse::<i32>().map_or_else(|_| json!(year), |y| json!(y));
        metadata.insert("year".into(), value);
    }
    metadata.insert("filename".into(), json!(file_name));
    if let Some(a) = author {
        metadata.insert("authors".into(), json!(a));
    }
    if let Some(venue) = entry.field("journal").or_else(|| entry.field("booktitle")) {
        metadata.insert("journal".into(), json!(venue));
    }
    if let Some(doi) = entry.field("doi") {
        metadata.insert("doi".into(), json!(doi));
    }

    let message = Message {
        id: format!("bibtex_{}_msg", entry.citation_key),
        timestamp: date,
        role: Role::Assistant,
        content,
        platform: Platform::BibtexImport,
        metadata: Map::new(),
    };

    Conversation::from_messages(
        format!("bibtex_{}", entry.citation_key),
        entry
            .field("title")
            .unwrap_or("Untitled Publication")
            .to_string(),
        Platform::BibtexImport,
        vec![message],
        metadata,
        date,
    )
}

/// Normalizes a whole `.bib` file. Finding no entries is an error, not an
/// empty success.
pub fn normalize_bibtex(text: &str, file_name: &str, now: DateTime<Utc>) -> Result<Vec<Conversation>> {
    let entries = parse_bibtex(text);
    if entries.is_empty() {
        return Err(IngestError::MalformedContent(
            "no valid BibTeX entries found".to_string(),
        ));
    }
    Ok(entries
        .iter()
        .map(|e| entry_to_conversation(e, file_name, now))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    const SAMPLE: &str = r#"
@Article{Smith2020,
  author  = {Smith, Jane and Doe, John},
  title   = {The {RNA} World Revisited},
  journal = "Journal of Molecular Biology",
  year    = 2020,
  doi     = {10.1000/xyz123},
  abstract = {We revisit
      the hypothesis.}
}

@comment{ this is not an entry, really }

@inproceedings{lee-2019, title={Graph Things}, booktitle={Proc. GT}, author={Lee, Kim}}

@misc{broken, title = {never closed
"#;

    #[test]
    fn parses_well_formed_entries() {
        let entries = parse_bibtex(SAMPLE);
        assert_eq!(entries.len(), 2);

        let smith = &entries[0];
        assert_eq!(smith.entry_type, "article");
        assert_eq!(smith.citation_key, "Smith2020");
        assert_eq!(smith.fields["title"], "The RNA World Revisited");
        assert_eq!(smith.fields["journal"], "Journal of Molecular Biology");
        assert_eq!(smith.fields["year"], "2020");
        assert_eq!(smith.fields["abstract"], "We revisit the hypothesis.");

        let lee = &entries[1];
        assert_eq!(lee.entry_type, "inproceedings");
        assert_eq!(lee.citation_key, "lee-2019");
        assert_eq!(lee.fields["booktitle"], "Proc. GT");
    }

    #[test]
    fn one_conversation_with_one_message_per_entry() {
        let convs = normalize_bibtex(SAMPLE, "refs.bib", now()).unwrap();
        assert_eq!(convs.len(), 2);
        assert!(convs.iter().all(|c| c.messages.len() == 1));

        let smith = &convs[0];
        assert_eq!(smith.id, "bibtex_Smith2020");
        assert_eq!(smith.title, "The RNA World Revisited");
        assert_eq!(smith.platform, Platform::BibtexImport);
        assert_eq!(smith.start_date, Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap());
        assert_eq!(smith.start_date, smith.end_date);
        assert_eq!(smith.messages[0].content, "We revisit the hypothesis.");
        assert_eq!(smith.metadata_str("category"), Some(CATEGORY));
        assert_eq!(smith.metadata_str("doi"), Some("10.1000/xyz123"));
        assert_eq!(smith.metadata["year"], 2020);

        let lee = &convs[1];
        assert_eq!(lee.messages[0].content, "A inproceedings by Lee, Kim.");
        assert_eq!(lee.metadata_str("journal"), Some("Proc. GT"));
        assert_eq!(lee.start_date.year(), 2025);
        assert!(!lee.metadata.contains_key("year"));
    }

    #[test]
    fn defaults_for_missing_title_and_author() {
        let convs = normalize_bibtex("@book{anon, publisher={X}}", "b.bib", now()).unwrap();
        assert_eq!(convs[0].title, "Untitled Publication");
        assert_eq!(convs[0].messages[0].content, "A book by Unknown Author.");
    }

    #[test]
    fn zero_entries_is_malformed() {
        let err = normalize_bibtex("just some prose", "x.bib", now()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedContent);
    }

    #[test]
    fn ids_are_stable_across_imports() {
        let later = now() + chrono::Duration::hours(3);
        let a = normalize_bibtex(SAMPLE, "refs.bib", now()).unwrap();
        let b = normalize_bibtex(SAMPLE, "refs.bib", later).unwrap();
        let ids_a: Vec<_> = a.iter().map(|c| c.id.clone()).collect();
        let ids_b: Vec<_> = b.iter().map(|c| c.id.clone()).collect();
        assert_eq!(ids_a, ids_b);
    }
}
