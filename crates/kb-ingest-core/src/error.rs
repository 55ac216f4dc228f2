//! Error model for the ingestion pipeline.
//!
//! Per-file failures (`UnsupportedFormat`, `MalformedContent`,
//! `ExtractionFailed`) are recorded in the ingest report and never abort a
//! batch. `NoValidContent` describes a batch outcome. Only
//! `PersistenceFailed` is returned as an `Err` from
//! [`IngestPipeline::ingest`](crate::pipeline::IngestPipeline::ingest).

use std::fmt;

use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("malformed content: {0}")]
    MalformedContent(String),

    #[error("text extraction failed: {0}")]
    ExtractionFailed(String),

    #[error("no valid conversations or text could be extracted from the uploaded files")]
    NoValidContent,

    #[error("persistence failed: {0}")]
    PersistenceFailed(String),
}

impl IngestError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            IngestError::UnsupportedFormat(_) => ErrorKind::UnsupportedFormat,
            IngestError::MalformedContent(_) => ErrorKind::MalformedContent,
            IngestError::ExtractionFailed(_) => ErrorKind::ExtractionFailed,
            IngestError::NoValidContent => ErrorKind::NoValidContent,
            IngestError::PersistenceFailed(_) => ErrorKind::PersistenceFailed,
        }
    }
}

impl From<serde_json::Error> for IngestError {
    fn from(e: serde_json::Error) -> Self {
        IngestError::MalformedContent(format!("invalid JSON: {}", e))
    }
}

/// Fieldless discriminant of [`IngestError`], used in summaries and
/// machine-readable output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorKind {
    UnsupportedFormat,
    MalformedContent,
    ExtractionFailed,
    NoValidContent,
    PersistenceFailed,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::UnsupportedFormat => "UnsupportedFormat",
            ErrorKind::MalformedContent => "MalformedContent",
            ErrorKind::ExtractionFailed => "ExtractionFailed",
            ErrorKind::NoValidContent => "NoValidContent",
            ErrorKind::PersistenceFailed => "PersistenceFailed",
        };
        f.write_str(s)
    }
}

pub type Result<T> = std::result::Result<T, IngestError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_matches_variant() {
        assert_eq!(
            IngestError::UnsupportedFormat(".exe".into()).kind(),
            ErrorKind::UnsupportedFormat
        );
        assert_eq!(IngestError::NoValidContent.kind(), ErrorKind::NoValidContent);
    }

    #[test]
    fn json_errors_are_malformed_content() {
        let err: IngestError = serde_json::from_str::<serde_json::Value>("{oops")
            .unwrap_err()
            .into();
        assert_eq!(err.kind(), ErrorKind::MalformedContent);
        assert!(err.to_string().contains("invalid JSON"));
    }
}
