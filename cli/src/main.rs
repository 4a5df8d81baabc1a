//! devdocs - index and query developer documentation from the command line.
//!
//! # Usage
//!
//! ```bash
//! # Build or refresh the index from the configured corpus directory
//! devdocs index
//! devdocs index --corpus ./topics --force
//!
//! # Query the local index only
//! devdocs search "touch target" -n 5
//!
//! # Query the index and the external sources selected by intent
//! devdocs retrieve "how do I build a component" --json
//!
//! # Show the state of the stored index
//! devdocs status
//!
//! # Keep the index fresh while topic files change
//! devdocs watch
//! ```

mod commands;
mod output;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use devdocs_retrieval::RetrievalConfig;
use tracing_subscriber::EnvFilter;

/// Index and query developer documentation.
#[derive(Parser)]
#[command(name = "devdocs", version, about)]
struct Cli {
    /// Configuration file (default: platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build the index, reusing the stored one if the corpus is unchanged
    Index {
        /// Corpus directory (overrides the configuration)
        #[arg(long)]
        corpus: Option<PathBuf>,

        /// Rebuild even if the stored index is current
        #[arg(long)]
        force: bool,
    },

    /// Search the local index
    Search {
        query: String,

        /// Maximum number of results to return
        #[arg(short = 'n', long, default_value = "10")]
        limit: usize,

        /// Output results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Search the local index and external knowledge sources
    Retrieve {
        query: String,

        /// Maximum number of results to return
        #[arg(short = 'n', long, default_value = "10")]
        limit: usize,

        /// Output results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the stored index and whether it matches the corpus
    Status,

    /// Watch the corpus directory and refresh the index on changes
    Watch,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries command output only.
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config_path = cli.config.unwrap_or_else(RetrievalConfig::default_path);
    let config = RetrievalConfig::load(&config_path)?;

    match cli.command {
        Command::Index { corpus, force } => {
            let config = match corpus {
                Some(dir) => config.with_corpus_dir(dir),
                None => config,
            };
            commands::index(config, force).await
        }
        Command::Search { query, limit, json } => {
            commands::search(config, &query, limit, json).await
        }
        Command::Retrieve { query, limit, json } => {
            commands::retrieve(config, &query, limit, json).await
        }
        Command::Status => commands::status(config).await,
        Command::Watch => commands::watch(config).await,
    }
}
