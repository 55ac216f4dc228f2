//! Ingestion pipeline orchestration.
//!
//! Coordinates a batch import: detect → normalize (extracting text first
//! for binary formats) → collect → deduplicate against the store → insert.
//!
//! Files are processed one at a time, in input order, so every failure is
//! attributed to exactly one file. A bad file is recorded in
//! [`IngestReport::per_file_errors`] and the batch continues. Only the
//! store round-trips (existing-id fetch, insert) can fail the whole call.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::dedup::dedup_against;
use crate::detect::{detect, BinaryKind, Detection, JsonShape};
use crate::error::{IngestError, Result};
use crate::extract::TextExtractor;
use crate::models::{Conversation, Platform};
use crate::normalize::{normalize_bibtex, normalize_chatgpt, normalize_claude, normalize_transcript};
use crate::progress::{IngestProgressEvent, IngestProgressReporter, NoProgress};
use crate::store::ConversationStore;

/// One uploaded file.
#[derive(Debug, Clone)]
pub struct InputFile {
    /// File name used for detection and transcript titles.
    pub name: String,
    /// Where the file came from, when that differs from `name`
    /// (e.g. a path inside a scanned directory).
    pub origin: Option<String>,
    pub bytes: Vec<u8>,
}

impl InputFile {
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            origin: None,
            bytes: bytes.into(),
        }
    }

    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    /// Key used in reports: the origin if known, else the name.
    pub fn label(&self) -> &str {
        self.origin.as_deref().unwrap_or(&self.name)
    }
}

/// What happened to the accepted batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchOutcome {
    /// No file produced a conversation. The store was not contacted.
    NoValidContent,
    /// New records were written (possibly zero when all were duplicates).
    Persisted { inserted: u64, duplicates: usize },
    /// Dry run: what would have been written.
    DryRun { new: usize, duplicates: usize },
}

#[derive(Debug)]
pub struct IngestReport {
    /// Every conversation produced by the normalizers, in file order.
    pub accepted: Vec<Conversation>,
    /// Keyed by file label. A label repeated within one batch gets a
    /// `#n` suffix so every failed file keeps its own entry.
    pub per_file_errors: BTreeMap<String, IngestError>,
    pub files_total: usize,
    pub outcome: BatchOutcome,
    succeeded: usize,
}

impl IngestReport {
    /// Files that produced at least one conversation.
    pub fn files_succeeded(&self) -> usize {
        self.succeeded
    }

    /// Records a file that failed before reaching the pipeline, such as
    /// one that could not be read from disk.
    pub fn record_rejected(&mut self, label: &str, err: IngestError) {
        self.files_total += 1;
        let key = unique_key(&self.per_file_errors, label);
        self.per_file_errors.insert(key, err);
    }

    pub fn inserted(&self) -> u64 {
        match self.outcome {
            BatchOutcome::Persisted { inserted, .. } => inserted,
            _ => 0,
        }
    }

    /// One-line human summary.
    pub fn summary(&self) -> String {
        let files = format!(
            "{} of {} files processed",
            self.files_succeeded(),
            self.files_total
        );
        match self.outcome {
            BatchOutcome::NoValidContent => format!("{}; no valid content", files),
            BatchOutcome::Persisted {
                inserted,
                duplicates,
            } => format!(
                "{}; {} conversations accepted, {} new, {} duplicates skipped",
                files,
                self.accepted.len(),
                inserted,
                duplicates
            ),
            BatchOutcome::DryRun { new, duplicates } => format!(
                "{}; {} conversations accepted, {} would be new, {} duplicates (dry-run)",
                files,
                self.accepted.len(),
                new,
                duplicates
            ),
        }
    }
}

/// Batch importer. The store and extractor are injected; nothing here is
/// global.
pub struct IngestPipeline {
    store: Arc<dyn ConversationStore>,
    extractor: Option<Arc<dyn TextExtractor>>,
    progress: Arc<dyn IngestProgressReporter>,
    dry_run: bool,
}

impl IngestPipeline {
    pub fn new(store: Arc<dyn ConversationStore>) -> Self {
        Self {
            store,
            extractor: None,
            progress: Arc::new(NoProgress),
            dry_run: false,
        }
    }

    pub fn with_extractor(mut self, extractor: Arc<dyn TextExtractor>) -> Self {
        self.extractor = Some(extractor);
        self
    }

    pub fn with_progress(mut self, progress: Arc<dyn IngestProgressReporter>) -> Self {
        self.progress = progress;
        self
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Imports `files`.
    ///
    /// Per-file failures never escape; they are listed in the report. The
    /// returned error is always [`IngestError::PersistenceFailed`], raised
    /// when the store cannot list existing ids or rejects the insert. In
    /// that case nothing from this batch is reported as imported.
    pub async fn ingest(&self, files: Vec<InputFile>) -> Result<IngestReport> {
        let now = Utc::now();
        let total = files.len();
        let mut accepted = Vec::new();
        let mut per_file_errors = BTreeMap::new();
        let mut succeeded = 0;

        for (i, file) in files.iter().enumerate() {
            self.progress.report(IngestProgressEvent::Processing {
                file: file.label().to_string(),
                n: i as u64 + 1,
                total: total as u64,
            });
            match self.process_file(file, now).await {
                Ok(convs) => {
                    tracing::debug!(file = file.label(), conversations = convs.len(), "file normalized");
                    accepted.extend(convs);
                    succeeded += 1;
                }
                Err(e) => {
                    tracing::warn!(file = file.label(), error = %e, "skipping file");
                    self.progress.report(IngestProgressEvent::FileFailed {
                        file: file.label().to_string(),
                        kind: e.kind(),
                    });
                    let key = unique_key(&per_file_errors, file.label());
                    per_file_errors.insert(key, e);
                }
            }
        }

        let mut report = IngestReport {
            accepted,
            per_file_errors,
            files_total: total,
            outcome: BatchOutcome::NoValidContent,
            succeeded,
        };
        if report.accepted.is_empty() {
            tracing::info!(files = total, "no valid content in batch");
            return Ok(report);
        }

        let existing = self
            .store
            .existing_ids()
            .await
            .map_err(|e| IngestError::PersistenceFailed(format!("{:#}", e)))?;
        let deduped = dedup_against(&report.accepted, &existing);
        let duplicates = deduped.duplicate_ids.len();

        report.outcome = if self.dry_run {
            BatchOutcome::DryRun {
                new: deduped.fresh.len(),
                duplicates,
            }
        } else if deduped.fresh.is_empty() {
            BatchOutcome::Persisted {
                inserted: 0,
                duplicates,
            }
        } else {
            self.progress.report(IngestProgressEvent::Persisting {
                records: deduped.fresh.len() as u64,
            });
            let inserted = self
                .store
                .insert_many(&deduped.fresh)
                .await
                .map_err(|e| IngestError::PersistenceFailed(format!("{:#}", e)))?;
            BatchOutcome::Persisted {
                inserted,
                duplicates,
            }
        };

        tracing::info!(
            files = total,
            failed = report.per_file_errors.len(),
            accepted = report.accepted.len(),
            duplicates,
            "ingest batch complete"
        );
        Ok(report)
    }

    async fn process_file(&self, file: &InputFile, now: DateTime<Utc>) -> Result<Vec<Conversation>> {
        let detection = detect(&file.name, &file.bytes)?;
        tracing::debug!(file = file.label(), format = detection.label(), "detected");

        let convs = match detection {
            Detection::Bibtex(text) => normalize_bibtex(&text, &file.name, now)?,
            Detection::ConversationJson(shape) => normalize_json(shape, now),
            Detection::PlainText(text) => vec![normalize_transcript(&text, &file.name, None, now)],
            Detection::NeedsExtraction(kind) => {
                let text = self.extract(file, kind).await?;
                vec![normalize_transcript(
                    &text,
                    &file.name,
                    Some(kind.mime_type()),
                    now,
                )]
            }
        };

        // BibTeX records always carry their synthetic message; any other
        // record without messages has nothing to import.
        let convs: Vec<Conversation> = convs
            .into_iter()
            .filter(|c| c.platform == Platform::BibtexImport || !c.messages.is_empty())
            .collect();
        if convs.is_empty() {
            return Err(IngestError::MalformedContent(
                "no conversation messages found".to_string(),
            ));
        }
        Ok(convs)
    }

    async fn extract(&self, file: &InputFile, kind: BinaryKind) -> Result<String> {
        let extractor = self.extractor.as_ref().ok_or_else(|| {
            IngestError::ExtractionFailed("no text extractor configured".to_string())
        })?;
        tracing::debug!(file = file.label(), extractor = extractor.name(), "extracting text");
        let text = extractor
            .extract_text(&file.bytes, kind.mime_type())
            .await
            .map_err(|e| IngestError::ExtractionFailed(format!("{:#}", e)))?;
        if text.trim().is_empty() {
            return Err(IngestError::ExtractionFailed(
                "extractor returned no text".to_string(),
            ));
        }
        Ok(text)
    }
}

fn unique_key(errors: &BTreeMap<String, IngestError>, label: &str) -> String {
    if !errors.contains_key(label) {
        return label.to_string();
    }
    (2..)
        .map(|n| format!("{}#{}", label, n))
        .find(|key| !errors.contains_key(key))
        .unwrap_or_else(|| label.to_string())
}

/// Runs the normalizers a JSON shape calls for. A `Both` shape yields the
/// ChatGPT records first, then the Claude records.
fn normalize_json(shape: JsonShape, now: DateTime<Utc>) -> Vec<Conversation> {
    let (chatgpt, claude) = match shape {
        JsonShape::ChatGpt(c) => (c, Vec::new()),
        JsonShape::Claude(c) => (Vec::new(), c),
        JsonShape::Both { chatgpt, claude } => (chatgpt, claude),
    };
    chatgpt
        .iter()
        .map(|c| normalize_chatgpt(c, now))
        .chain(claude.iter().map(|c| normalize_claude(c, now)))
        .collect()
}
