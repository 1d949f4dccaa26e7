//! # Code Companion CLI (`companion`)
//!
//! Indexes the functions of a local codebase into a vector store and answers
//! questions with a local LLM, using the most similar functions as examples.
//!
//! ## Usage
//!
//! ```bash
//! companion --config ./config/companion.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `companion index` | Extract functions from the configured roots and store them |
//! | `companion query "<question>"` | Retrieve examples, build a prompt, and generate an answer |
//! | `companion search "<question>"` | Retrieve examples only |
//!
//! ## Examples
//!
//! ```bash
//! # See what would be indexed without touching Chroma
//! companion index --dry-run
//!
//! # Index an extra checkout instead of the configured roots
//! companion index --root ../engine
//!
//! # Print the prompt that would be sent to the model
//! companion query "how do I load a scene?" --prompt-only
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use code_companion::{config, index, query};

/// Code Companion CLI: answers coding questions with examples from your own
/// codebase.
#[derive(Parser)]
#[command(
    name = "companion",
    about = "Code Companion: retrieval-augmented coding answers from your own codebase",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/companion.toml")]
    config: PathBuf,

    /// Log at debug level (overrides RUST_LOG).
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract functions from the configured roots and store them.
    ///
    /// Files that fail to parse or store are reported and skipped.
    /// Re-running replaces existing snippets instead of duplicating them.
    Index {
        /// Extract and count snippets without writing to the store.
        #[arg(long)]
        dry_run: bool,

        /// Index this directory instead of the configured roots (repeatable).
        #[arg(long = "root")]
        roots: Vec<PathBuf>,
    },

    /// Retrieve examples, build a prompt, and generate an answer.
    Query {
        question: String,

        /// Number of examples to retrieve (defaults to `retrieval.examples`).
        #[arg(long)]
        limit: Option<usize>,

        /// Print the assembled prompt instead of calling the model.
        #[arg(long)]
        prompt_only: bool,
    },

    /// Retrieve examples for a question without generating an answer.
    Search {
        question: String,

        #[arg(long)]
        limit: Option<usize>,
    },
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Index { dry_run, roots } => index::run_index(&cfg, &roots, dry_run).await,
        Commands::Query {
            question,
            limit,
            prompt_only,
        } => query::run_query(&cfg, &question, limit, prompt_only).await,
        Commands::Search { question, limit } => {
            query::run_search(&cfg, &question, limit).await
        }
    }
}
