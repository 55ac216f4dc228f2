//! `kb ingest`: import files into the knowledge base.
//!
//! Collects the given paths, runs them through the core
//! [`IngestPipeline`] against the SQLite store, and prints a summary.
//! Files rejected before the pipeline (unreadable, or over the size limit)
//! are merged into the same per-file error list.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use serde_json::json;

use kb_ingest_core::{BatchOutcome, IngestError, IngestPipeline, IngestReport};

use crate::config::Config;
use crate::extract::build_extractor;
use crate::inputs::collect_inputs;
use crate::progress::ProgressMode;
use crate::sqlite_store;

pub struct IngestOptions {
    pub dry_run: bool,
    pub json: bool,
    pub progress: ProgressMode,
}

/// Runs an import and returns its report. Fails only when the store is
/// unreachable or rejects the batch.
pub async fn ingest_paths(
    config: &Config,
    paths: &[PathBuf],
    opts: &IngestOptions,
) -> Result<IngestReport> {
    let collected = collect_inputs(paths, &config.ingest)?;
    let store = Arc::new(sqlite_store::open(config).await?);

    let mut pipeline = IngestPipeline::new(store.clone())
        .with_progress(opts.progress.reporter())
        .dry_run(opts.dry_run);
    if let Some(extractor) = build_extractor(&config.extractor)? {
        pipeline = pipeline.with_extractor(extractor);
    }

    let mut report = pipeline.ingest(collected.files).await?;
    for (origin, err) in collected.rejected {
        report.record_rejected(&origin, err);
    }

    store.pool().close().await;
    Ok(report)
}

/// CLI entry point for `kb ingest`.
pub async fn run_ingest(config: &Config, paths: &[PathBuf], opts: IngestOptions) -> Result<()> {
    let report = ingest_paths(config, paths, &opts).await?;

    if opts.json {
        println!("{}", serde_json::to_string_pretty(&report_json(&report))?);
    } else {
        print_report(&report, opts.dry_run);
    }

    if report.outcome == BatchOutcome::NoValidContent {
        return Err(IngestError::NoValidContent.into());
    }
    Ok(())
}

fn print_report(report: &IngestReport, dry_run: bool) {
    println!("ingest{}", if dry_run { " (dry-run)" } else { "" });
    println!(
        "  files: {} ({} skipped)",
        report.files_total,
        report.per_file_errors.len()
    );
    println!("  conversations accepted: {}", report.accepted.len());
    match report.outcome {
        BatchOutcome::Persisted {
            inserted,
            duplicates,
        } => {
            println!("  inserted: {}", inserted);
            println!("  duplicates skipped: {}", duplicates);
        }
        BatchOutcome::DryRun { new, duplicates } => {
            println!("  would insert: {}", new);
            println!("  duplicates: {}", duplicates);
        }
        BatchOutcome::NoValidContent => {}
    }
    for (file, err) in &report.per_file_errors {
        println!("  skipped {}: [{}] {}", file, err.kind(), err);
    }
    if report.outcome != BatchOutcome::NoValidContent {
        println!("ok: {}", report.summary());
    } else {
        println!("{}", report.summary());
    }
}

/// Machine-readable report, shared by `kb ingest --json` and `POST /api/ingest`.
pub fn report_json(report: &IngestReport) -> serde_json::Value {
    let errors: Vec<_> = report
        .per_file_errors
        .iter()
        .map(|(file, err)| {
            json!({
                "file": file,
                "kind": err.kind(),
                "message": err.to_string(),
            })
        })
        .collect();
    let conversations: Vec<_> = report
        .accepted
        .iter()
        .map(|c| {
            json!({
                "id": c.id,
                "title": c.title,
                "platform": c.platform,
                "messages": c.messages.len(),
            })
        })
        .collect();
    let (inserted, duplicates, dry_run) = match report.outcome {
        BatchOutcome::Persisted {
            inserted,
            duplicates,
        } => (inserted, duplicates, false),
        BatchOutcome::DryRun { new, duplicates } => (new as u64, duplicates, true),
        BatchOutcome::NoValidContent => (0, 0, false),
    };
    json!({
        "files": report.files_total,
        "accepted": report.accepted.len(),
        "inserted": inserted,
        "duplicates": duplicates,
        "dryRun": dry_run,
        "noValidContent": report.outcome == BatchOutcome::NoValidContent,
        "conversations": conversations,
        "errors": errors,
    })
}
