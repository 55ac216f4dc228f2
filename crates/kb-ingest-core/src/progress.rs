//! Ingest progress events.
//!
//! The pipeline emits one event per file and one before persisting.
//! Reporters decide how (or whether) to render them; see the `kb` binary
//! for the stderr and JSON-lines reporters.

use crate::error::ErrorKind;

#[derive(Clone, Debug, PartialEq)]
pub enum IngestProgressEvent {
    /// File `n` of `total` (1-based) is being processed.
    Processing { file: String, n: u64, total: u64 },
    /// The file was skipped.
    FileFailed { file: String, kind: ErrorKind },
    /// The deduplicated batch is being written.
    Persisting { records: u64 },
}

pub trait IngestProgressReporter: Send + Sync {
    fn report(&self, event: IngestProgressEvent);
}

/// Discards all events.
pub struct NoProgress;

impl IngestProgressReporter for NoProgress {
    fn report(&self, _event: IngestProgressEvent) {}
}
