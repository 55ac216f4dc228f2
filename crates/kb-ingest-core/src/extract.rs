//! External text extraction boundary.
//!
//! Binary uploads (PDF, DOCX) are turned into plain text by a
//! [`TextExtractor`] and then normalized as transcripts. The pipeline
//! awaits each call before moving to the next file; failures, timeouts,
//! and empty results are recorded as per-file `ExtractionFailed` errors.

use anyhow::Result;
use async_trait::async_trait;

#[async_trait]
pub trait TextExtractor: Send + Sync {
    /// Short name for logs (`"builtin"`, `"http"`).
    fn name(&self) -> &str;

    /// Best-effort extraction. May return an empty string, which the
    /// pipeline treats as a failure.
    async fn extract_text(&self, bytes: &[u8], mime_type: &str) -> Result<String>;
}
