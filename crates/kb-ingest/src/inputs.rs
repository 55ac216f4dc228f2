//! Collects ingest inputs from the command line.
//!
//! Each path may be a file or a directory. Files named explicitly are
//! always taken. Directories are walked and filtered by the `[ingest]`
//! include/exclude globs, matched against the path relative to the
//! directory. Input order is preserved; directory contents are sorted for
//! deterministic runs.
//!
//! A file that cannot be walked, stat'ed or read lands in
//! [`CollectedInputs::rejected`]; the rest of the batch is still collected.

use anyhow::{bail, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use kb_ingest_core::{IngestError, InputFile};

use crate::config::IngestConfig;

/// Files ready for the pipeline plus files rejected before the pipeline saw
/// them.
#[derive(Debug, Default)]
pub struct CollectedInputs {
    pub files: Vec<InputFile>,
    pub rejected: Vec<(String, IngestError)>,
}

pub fn collect_inputs(paths: &[PathBuf], config: &IngestConfig) -> Result<CollectedInputs> {
    let include_set = build_globset(&config.include_globs)?;

    let mut default_excludes = vec![
        "**/.git/**".to_string(),
        "**/target/**".to_string(),
        "**/node_modules/**".to_string(),
    ];
    default_excludes.extend(config.exclude_globs.clone());
    let exclude_set = build_globset(&default_excludes)?;

    let mut out = CollectedInputs::default();
    for root in paths {
        if root.is_file() {
            push_file(&mut out, root, config.max_file_bytes);
        } else if root.is_dir() {
            let mut found = Vec::new();
            let walker = WalkDir::new(root).follow_links(config.follow_symlinks);
            let wanted = |path: &Path| {
                let relative = path.strip_prefix(root).unwrap_or(path);
                let rel_str = relative.to_string_lossy();
                !exclude_set.is_match(&*rel_str) && include_set.is_match(&*rel_str)
            };
            for entry in walker {
                let entry = match entry {
                    Ok(entry) => entry,
                    Err(e) => {
                        let path = e.path().map(Path::to_path_buf);
                        if path.as_deref().map_or(true, |p| wanted(p)) {
                            let origin = path
                                .map(|p| p.display().to_string())
                                .unwrap_or_else(|| root.display().to_string());
                            reject(&mut out, origin, format!("cannot walk entry: {}", e));
                        }
                        continue;
                    }
                };
                if entry.file_type().is_file() && wanted(entry.path()) {
                    found.push(entry.path().to_path_buf());
                }
            }
            found.sort();
            tracing::debug!(dir = %root.display(), files = found.len(), "scanned directory");
            for path in &found {
                push_file(&mut out, path, config.max_file_bytes);
            }
        } else {
            bail!("Input path does not exist: {}", root.display());
        }
    }
    Ok(out)
}

fn push_file(out: &mut CollectedInputs, path: &Path, max_bytes: u64) {
    let origin = path.display().to_string();
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| origin.clone());

    let size = match std::fs::metadata(path) {
        Ok(meta) => meta.len(),
        Err(e) => return reject(out, origin, format!("cannot stat file: {}", e)),
    };
    if size > max_bytes {
        let reason = format!("file is {} bytes, over the {} byte limit", size, max_bytes);
        return reject(out, origin, reason);
    }

    match std::fs::read(path) {
        Ok(bytes) => out.files.push(InputFile::new(name, bytes).with_origin(origin)),
        Err(e) => reject(out, origin, format!("cannot read file: {}", e)),
    }
}

fn reject(out: &mut CollectedInputs, origin: String, reason: String) {
    tracing::warn!(file = %origin, reason = %reason, "skipping file");
    out.rejected.push((origin, IngestError::MalformedContent(reason)));
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use kb_ingest_core::ErrorKind;
    use std::fs;

    fn config() -> IngestConfig {
        IngestConfig::default()
    }

    #[test]
    fn directories_are_filtered_and_sorted() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.txt"), "b").unwrap();
        fs::write(dir.path().join("a.bib"), "@misc{k, title={t}}").unwrap();
        fs::write(dir.path().join("image.png"), [0u8; 4]).unwrap();
        fs::create_dir_all(dir.path().join("node_modules")).unwrap();
        fs::write(dir.path().join("node_modules/x.txt"), "x").unwrap();

        let got = collect_inputs(&[dir.path().to_path_buf()], &config()).unwrap();
        let names: Vec<_> = got.files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["a.bib", "b.txt"]);
        assert!(got.rejected.is_empty());
    }

    #[test]
    fn explicit_files_bypass_globs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("photo.png");
        fs::write(&path, [1u8, 2, 3]).unwrap();
        let got = collect_inputs(&[path], &config()).unwrap();
        assert_eq!(got.files.len(), 1);
        assert_eq!(got.files[0].bytes, vec![1, 2, 3]);
    }

    #[test]
    fn oversized_files_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.txt");
        fs::write(&path, "0123456789").unwrap();
        let mut cfg = config();
        cfg.max_file_bytes = 4;
        let got = collect_inputs(&[path], &cfg).unwrap();
        assert!(got.files.is_empty());
        assert_eq!(got.rejected.len(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn unreadable_entries_do_not_abort_collection() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), "human: hi").unwrap();
        std::os::unix::fs::symlink(dir.path().join("gone.txt"), dir.path().join("b.txt")).unwrap();

        let mut cfg = config();
        cfg.follow_symlinks = true;
        let got = collect_inputs(&[dir.path().to_path_buf()], &cfg).unwrap();

        let names: Vec<_> = got.files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["a.txt"]);
        assert_eq!(got.rejected.len(), 1);
        assert!(got.rejected[0].0.ends_with("b.txt"));
        assert_eq!(got.rejected[0].1.kind(), ErrorKind::MalformedContent);
    }

    #[test]
    fn missing_path_is_an_error() {
        let err = collect_inputs(&[PathBuf::from("/definitely/not/here")], &config());
        assert!(err.is_err());
    }
}
