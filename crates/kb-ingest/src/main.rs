//! # kb CLI
//!
//! The `kb` binary imports conversation exports and documents into the
//! knowledge base and serves them over a JSON API.
//!
//! ## Usage
//!
//! ```bash
//! kb --config ./config/kb.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `kb init` | Create the SQLite database and run schema migrations |
//! | `kb ingest <paths>...` | Import files and directories |
//! | `kb list` | List conversations, optionally filtered |
//! | `kb get <id>` | Show one conversation |
//! | `kb stats` | Conversation, message, and platform counts |
//! | `kb export` | Dump every conversation as JSON |
//! | `kb clear` | Delete every conversation |
//! | `kb serve` | Start the HTTP API |
//!
//! Logs go to stderr and are controlled by `RUST_LOG`
//! (default `kb_ingest=info`).

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use kb_ingest::ingest::IngestOptions;
use kb_ingest::progress::ProgressMode;
use kb_ingest::store::ConversationFilter;
use kb_ingest::{
    clear, config, export, get, ingest, list, migrate, server, stats,
};

/// kb: import AI conversations, bibliographies, and transcripts into a
/// searchable knowledge base.
#[derive(Parser)]
#[command(
    name = "kb",
    about = "Import ChatGPT, Claude, BibTeX and transcript files into a conversation knowledge base",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/kb.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Idempotent: running it multiple times is safe.
    Init,

    /// Import files or directories.
    ///
    /// Each file is detected by extension (.json, .bib, .txt, .md, .pdf,
    /// .docx), normalized into conversations, and deduplicated by id
    /// against what is already stored. A bad file is reported and skipped.
    Ingest {
        /// Files or directories to import.
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Detect, normalize, and deduplicate without writing.
        #[arg(long)]
        dry_run: bool,

        /// Print the report as JSON on stdout.
        #[arg(long)]
        json: bool,

        /// Progress on stderr: off, human, or json. Defaults to human on a TTY.
        #[arg(long, value_parser = parse_progress)]
        progress: Option<ProgressMode>,
    },

    /// List stored conversations.
    List {
        /// Platform name (case-insensitive), e.g. `ChatGPT`.
        #[arg(long)]
        platform: Option<String>,
        /// `metadata.category`, e.g. `Academic Publications`.
        #[arg(long)]
        category: Option<String>,
        /// `metadata.source`, e.g. `chatgpt_import`.
        #[arg(long)]
        source: Option<String>,
        /// `metadata.type`, e.g. `article`.
        #[arg(long = "type")]
        kind: Option<String>,
        /// Case-insensitive text in the title or any message.
        #[arg(long, short = 'q')]
        query: Option<String>,
        #[arg(long)]
        json: bool,
    },

    /// Show a conversation by id.
    Get {
        id: String,
        #[arg(long)]
        json: bool,
    },

    /// Show collection statistics.
    Stats {
        #[arg(long)]
        json: bool,
    },

    /// Export every conversation as a JSON array.
    Export {
        /// Output file. Defaults to stdout.
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// Delete every stored conversation.
    Clear,

    /// Start the HTTP API on `[server].bind`.
    Serve,
}

fn parse_progress(s: &str) -> Result<ProgressMode, String> {
    ProgressMode::parse(s).ok_or_else(|| format!("invalid progress mode '{}': use off, human, or json", s))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("kb_ingest=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Ingest {
            paths,
            dry_run,
            json,
            progress,
        } => {
            let opts = IngestOptions {
                dry_run,
                json,
                progress: progress.unwrap_or_else(ProgressMode::default_for_tty),
            };
            ingest::run_ingest(&cfg, &paths, opts).await?;
        }
        Commands::List {
            platform,
            category,
            source,
            kind,
            query,
            json,
        } => {
            let filter = ConversationFilter {
                platform,
                category,
                source,
                kind,
                query,
            };
            list::run_list(&cfg, filter, json).await?;
        }
        Commands::Get { id, json } => {
            get::run_get(&cfg, &id, json).await?;
        }
        Commands::Stats { json } => {
            stats::run_stats(&cfg, json).await?;
        }
        Commands::Export { output } => {
            export::run_export(&cfg, output.as_deref()).await?;
        }
        Commands::Clear => {
            clear::run_clear(&cfg).await?;
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}
