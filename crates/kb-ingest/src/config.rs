//! TOML configuration for the `kb` binary.
//!
//! ```toml
//! [db]
//! path = "./data/kb.sqlite"
//!
//! [ingest]
//! include_globs = ["**/*.json", "**/*.bib", "**/*.txt"]
//! exclude_globs = ["**/node_modules/**"]
//! max_file_bytes = 52428800
//!
//! [extractor]
//! provider = "builtin"   # builtin | http | disabled
//!
//! [server]
//! bind = "127.0.0.1:3001"
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
    #[serde(default)]
    pub extractor: ExtractorConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct IngestConfig {
    #[serde(default = "default_include_globs")]
    pub include_globs: Vec<String>,
    #[serde(default)]
    pub exclude_globs: Vec<String>,
    #[serde(default)]
    pub follow_symlinks: bool,
    #[serde(default = "default_max_file_bytes")]
    pub max_file_bytes: u64,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            include_globs: default_include_globs(),
            exclude_globs: Vec::new(),
            follow_symlinks: false,
            max_file_bytes: default_max_file_bytes(),
        }
    }
}

fn default_include_globs() -> Vec<String> {
    ["json", "bib", "txt", "md", "pdf", "docx"]
        .iter()
        .map(|ext| format!("**/*.{}", ext))
        .collect()
}

// Same cap as the web upload endpoint.
fn default_max_file_bytes() -> u64 {
    50 * 1024 * 1024
}

#[derive(Debug, Deserialize, Clone)]
pub struct ExtractorConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            url: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_provider() -> String {
    "builtin".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}

impl ExtractorConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:3001".to_string()
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    // Validate ingest
    if config.ingest.max_file_bytes == 0 {
        anyhow::bail!("ingest.max_file_bytes must be > 0");
    }
    if config.ingest.include_globs.is_empty() {
        anyhow::bail!("ingest.include_globs must not be empty");
    }

    // Validate extractor
    match config.extractor.provider.as_str() {
        "disabled" | "builtin" => {}
        "http" => {
            if config.extractor.url.as_deref().map_or(true, str::is_empty) {
                anyhow::bail!("extractor.url must be specified when provider is 'http'");
            }
        }
        other => anyhow::bail!(
            "Unknown extractor provider: '{}'. Must be builtin, http, or disabled.",
            other
        ),
    }
    if config.extractor.is_enabled() && config.extractor.timeout_secs == 0 {
        anyhow::bail!("extractor.timeout_secs must be > 0");
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn load(toml: &str) -> Result<Config> {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(toml.as_bytes()).unwrap();
        load_config(f.path())
    }

    #[test]
    fn minimal_config_gets_defaults() {
        let config = load("[db]\npath = \"kb.sqlite\"\n").unwrap();
        assert_eq!(config.extractor.provider, "builtin");
        assert_eq!(config.server.bind, "127.0.0.1:3001");
        assert!(config
            .ingest
            .include_globs
            .contains(&"**/*.bib".to_string()));
        assert_eq!(config.ingest.max_file_bytes, 50 * 1024 * 1024);
    }

    #[test]
    fn http_extractor_requires_url() {
        let err = load("[db]\npath = \"kb.sqlite\"\n[extractor]\nprovider = \"http\"\n")
            .unwrap_err();
        assert!(err.to_string().contains("extractor.url"));
    }

    #[test]
    fn unknown_provider_is_rejected() {
        let err = load("[db]\npath = \"kb.sqlite\"\n[extractor]\nprovider = \"ocr\"\n")
            .unwrap_err();
        assert!(err.to_string().contains("Unknown extractor provider"));
    }

    #[test]
    fn zero_file_limit_is_rejected() {
        assert!(load("[db]\npath = \"kb.sqlite\"\n[ingest]\nmax_file_bytes = 0\n").is_err());
    }
}
