//! # kb-ingest core
//!
//! Runtime-agnostic ingestion logic for the C42 OS knowledge base: data
//! models, format detection, the per-format normalizers, deduplication,
//! the store and extractor abstractions, and the pipeline that ties them
//! together.
//!
//! This crate contains no tokio, sqlx, filesystem I/O, or HTTP code.
//! Backends are injected through [`store::ConversationStore`] and
//! [`extract::TextExtractor`].
//!
//! ```text
//! InputFile ─▶ detect ─▶ normalize ─▶ dedup ─▶ ConversationStore
//!                 │
//!                 └─▶ TextExtractor (PDF/DOCX)
//! ```

pub mod analytics;
pub mod dedup;
pub mod detect;
pub mod error;
pub mod extract;
pub mod models;
pub mod normalize;
pub mod pipeline;
pub mod progress;
pub mod store;

pub use error::{ErrorKind, IngestError};
pub use models::{Conversation, Message, Platform, Role};
pub use pipeline::{BatchOutcome, IngestPipeline, IngestReport, InputFile};
