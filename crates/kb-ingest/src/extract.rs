//! Text extractors for binary uploads (PDF, DOCX).
//!
//! Two [`TextExtractor`] backends, chosen by `[extractor] provider`:
//!
//! - `builtin`: PDF via `pdf-extract`, DOCX by reading `word/document.xml`
//!   out of the ZIP container with `quick-xml`. Runs on the blocking pool.
//! - `http`: POSTs `{mimeType, data}` (base64) to an external service and
//!   reads `{text}` back.
//!
//! Extractors never panic on bad input; the error becomes a per-file
//! `ExtractionFailed` in the ingest report.

use std::io::Read;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};

use kb_ingest_core::detect::{MIME_DOCX, MIME_PDF};
use kb_ingest_core::extract::TextExtractor;

use crate::config::ExtractorConfig;

/// Maximum decompressed bytes to read from a single ZIP entry (zip-bomb protection).
const MAX_XML_ENTRY_BYTES: u64 = 50 * 1024 * 1024;

/// Builds the configured extractor, or `None` when extraction is disabled.
pub fn build_extractor(config: &ExtractorConfig) -> Result<Option<Arc<dyn TextExtractor>>> {
    match config.provider.as_str() {
        "disabled" => Ok(None),
        "builtin" => Ok(Some(Arc::new(BuiltinExtractor))),
        "http" => {
            let url = config
                .url
                .clone()
                .ok_or_else(|| anyhow!("extractor.url is required for the http provider"))?;
            Ok(Some(Arc::new(HttpExtractor::new(
                url,
                Duration::from_secs(config.timeout_secs),
            )?)))
        }
        other => bail!("Unknown extractor provider: {}", other),
    }
}

/// In-process extraction for PDF and DOCX.
pub struct BuiltinExtractor;

#[async_trait]
impl TextExtractor for BuiltinExtractor {
    fn name(&self) -> &str {
        "builtin"
    }

    async fn extract_text(&self, bytes: &[u8], mime_type: &str) -> Result<String> {
        let bytes = bytes.to_vec();
        let mime_type = mime_type.to_string();
        tokio::task::spawn_blocking(move || extract_sync(&bytes, &mime_type))
            .await
            .context("extraction task panicked")?
    }
}

/// Extracts plain text from binary content by MIME type.
pub fn extract_sync(bytes: &[u8], mime_type: &str) -> Result<String> {
    match mime_type {
        MIME_PDF => {
            pdf_extract::extract_text_from_mem(bytes).context("PDF extraction failed")
        }
        MIME_DOCX => extract_docx(bytes).context("DOCX extraction failed"),
        _ => bail!("unsupported content-type: {}", mime_type),
    }
}

fn extract_docx(bytes: &[u8]) -> Result<String> {
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes))?;
    let entry = archive
        .by_name("word/document.xml")
        .map_err(|_| anyhow!("word/document.xml not found"))?;
    let mut doc_xml = Vec::new();
    entry.take(MAX_XML_ENTRY_BYTES).read_to_end(&mut doc_xml)?;
    if doc_xml.len() as u64 >= MAX_XML_ENTRY_BYTES {
        bail!(
            "word/document.xml exceeds size limit ({} bytes)",
            MAX_XML_ENTRY_BYTES
        );
    }
    docx_paragraph_text(&doc_xml)
}

/// Collects `<w:t>` runs, one line per `<w:p>` paragraph, so transcript
/// speaker prefixes survive extraction.
fn docx_paragraph_text(xml: &[u8]) -> Result<String> {
    use quick_xml::events::Event;

    let mut lines: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut in_text = false;
    let mut reader = quick_xml::Reader::from_reader(xml);
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) if e.local_name().as_ref() == b"t" => in_text = true,
            Event::End(e) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"p" => lines.push(std::mem::take(&mut current)),
                _ => {}
            },
            Event::Empty(e) if e.local_name().as_ref() == b"tab" => current.push('\t'),
            Event::Empty(e) if e.local_name().as_ref() == b"br" => current.push('\n'),
            Event::Text(te) if in_text => current.push_str(&te.unescape()?),
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    if !current.is_empty() {
        lines.push(current);
    }
    Ok(lines.join("\n"))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ExtractRequest<'a> {
    mime_type: &'a str,
    data: String,
}

#[derive(Deserialize)]
struct ExtractResponse {
    #[serde(default)]
    text: String,
}

/// Delegates extraction to an external HTTP service.
pub struct HttpExtractor {
    client: reqwest::Client,
    url: String,
}

impl HttpExtractor {
    pub fn new(url: String, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { client, url })
    }
}

#[async_trait]
impl TextExtractor for HttpExtractor {
    fn name(&self) -> &str {
        "http"
    }

    async fn extract_text(&self, bytes: &[u8], mime_type: &str) -> Result<String> {
        let body = ExtractRequest {
            mime_type,
            data: base64::engine::general_purpose::STANDARD.encode(bytes),
        };
        let resp = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .with_context(|| format!("extractor request to {} failed", self.url))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            bail!("extractor returned {}: {}", status, text.trim());
        }
        let parsed: ExtractResponse = resp
            .json()
            .await
            .context("extractor returned an invalid response body")?;
        Ok(parsed.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn docx_with(document_xml: &str) -> Vec<u8> {
        let mut cursor = std::io::Cursor::new(Vec::new());
        {
            let mut zip = zip::ZipWriter::new(&mut cursor);
            let options = zip::write::SimpleFileOptions::default();
            zip.start_file("word/document.xml", options).unwrap();
            zip.write_all(document_xml.as_bytes()).unwrap();
            zip.finish().unwrap();
        }
        cursor.into_inner()
    }

    #[test]
    fn unsupported_content_type_returns_error() {
        let err = extract_sync(b"foo", "application/octet-stream").unwrap_err();
        assert!(err.to_string().contains("unsupported content-type"));
    }

    #[test]
    fn invalid_pdf_returns_error() {
        assert!(extract_sync(b"not a pdf", MIME_PDF).is_err());
    }

    #[test]
    fn invalid_zip_returns_error_for_docx() {
        assert!(extract_sync(b"not a zip", MIME_DOCX).is_err());
    }

    #[test]
    fn docx_paragraphs_become_lines() {
        let xml = r#"<?xml version="1.0"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
  <w:body>
    <w:p><w:r><w:t>human: what is </w:t></w:r><w:r><w:t>WAL?</w:t></w:r></w:p>
    <w:p><w:r><w:t>assistant: write-ahead logging &amp; more</w:t></w:r></w:p>
  </w:body>
</w:document>"#;
        let text = extract_sync(&docx_with(xml), MIME_DOCX).unwrap();
        assert_eq!(
            text,
            "human: what is WAL?\nassistant: write-ahead logging & more"
        );
    }

    #[test]
    fn docx_without_document_xml_fails() {
        let mut cursor = std::io::Cursor::new(Vec::new());
        {
            let mut zip = zip::ZipWriter::new(&mut cursor);
            zip.start_file("other.xml", zip::write::SimpleFileOptions::default())
                .unwrap();
            zip.write_all(b"<x/>").unwrap();
            zip.finish().unwrap();
        }
        let err = extract_sync(&cursor.into_inner(), MIME_DOCX).unwrap_err();
        assert!(format!("{:#}", err).contains("word/document.xml not found"));
    }

    #[test]
    fn disabled_provider_builds_nothing() {
        let config = ExtractorConfig {
            provider: "disabled".into(),
            url: None,
            timeout_secs: 30,
        };
        assert!(build_extractor(&config).unwrap().is_none());
    }
}
