//! # kb-ingest
//!
//! **Import AI conversation exports, bibliographies, and transcripts into a
//! local conversation knowledge base.**
//!
//! The format detection, normalizers, deduplication, and pipeline live in
//! [`kb_ingest_core`]. This crate supplies everything host-specific: TOML
//! configuration, the SQLite store, text extractors for PDF/DOCX, input
//! collection from the filesystem, the `kb` CLI commands, and the JSON HTTP
//! API.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌──────────────────────┐   ┌──────────┐
//! │   inputs    │──▶│   IngestPipeline     │──▶│  SQLite   │
//! │ files/dirs  │   │ detect → normalize → │   │ store     │
//! └─────────────┘   │ dedup                │   └────┬─────┘
//!                   └──────────┬───────────┘        │
//!                              ▼            ┌───────┴───────┐
//!                        TextExtractor      ▼               ▼
//!                      (builtin / http)  ┌──────┐      ┌──────────┐
//!                                        │ CLI  │      │ HTTP API │
//!                                        │ (kb) │      │ (axum)   │
//!                                        └──────┘      └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! kb init                               # create database
//! kb ingest ~/exports/conversations.json refs.bib notes/
//! kb list --platform chatgpt --query "borrow checker"
//! kb stats
//! kb serve                              # start HTTP API
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing and validation |
//! | [`db`] | SQLite connection pool with WAL mode |
//! | [`migrate`] | Database schema migrations (idempotent) |
//! | [`sqlite_store`] | `ConversationStore` backed by SQLite |
//! | [`extract`] | Built-in and HTTP text extractors |
//! | [`inputs`] | File and directory input collection |
//! | [`progress`] | Ingest progress reporters (stderr, JSON) |
//! | [`ingest`] | `kb ingest` |
//! | [`list`] | `kb list` and filtered listing |
//! | [`get`] | `kb get` |
//! | [`stats`] | `kb stats` |
//! | [`export`] | `kb export` |
//! | [`clear`] | `kb clear` |
//! | [`server`] | JSON HTTP API (Axum) with CORS |

pub mod clear;
pub mod config;
pub mod db;
pub mod export;
pub mod extract;
pub mod get;
pub mod ingest;
pub mod inputs;
pub mod list;
pub mod migrate;
pub mod progress;
pub mod server;
pub mod sqlite_store;
pub mod stats;

pub use kb_ingest_core::store;
pub use sqlite_store::SqliteStore;
