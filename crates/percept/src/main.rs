//! Percept CLI - Concept tagging and hub detection for image search corpora.
//!
//! Percept reads corpus snapshots (JSONL image records with embeddings),
//! assigns concept tags by embedding similarity against a catalog, and
//! detects "hub" images that dominate search results across a query
//! workload so a ranking layer can down-weight them.
//!
//! # Usage
//!
//! ```bash
//! # Tag every image in a corpus snapshot
//! percept tag corpus.jsonl --catalog concepts.json
//!
//! # Scan for hub images with the baseline workload
//! percept hubs corpus.jsonl --catalog concepts.json
//!
//! # Check the opposite relation for one-way edges
//! percept catalog audit --catalog concepts.json
//!
//! # View configuration
//! percept config show
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cli;
mod logging;

/// Percept - Concept tagging and hub detection for image search corpora.
#[derive(Parser, Debug)]
#[command(name = "percept")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long, global = true)]
    json_logs: bool,

    /// Use this config file instead of the default location
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Tag every image in a corpus snapshot against the concept catalog
    Tag(cli::tag::TagArgs),

    /// Scan a corpus for hub images and rewrite their stats
    Hubs(cli::hubs::HubsArgs),

    /// Audit or repair the concept opposite relation
    Catalog(cli::catalog::CatalogArgs),

    /// View and manage configuration
    Config(cli::config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging from config, with CLI verbose override.
    // Note: logging isn't initialized yet, so use eprintln for config warnings.
    let config = match &cli.config {
        Some(path) => percept_core::Config::load_from(path)?,
        None => match percept_core::Config::load() {
            Ok(config) => config,
            Err(e) => {
                eprintln!(
                    "Warning: Failed to load config: {e}\n  \
                     Using default configuration. Check your config file with `percept config path`."
                );
                percept_core::Config::default()
            }
        },
    };
    logging::init_from_config(&config, cli.verbose, cli.json_logs);

    tracing::debug!("Percept v{}", percept_core::VERSION);

    // Dispatch to the appropriate command handler
    match cli.command {
        Commands::Tag(args) => cli::tag::execute(args, &config).await,
        Commands::Hubs(args) => cli::hubs::execute(args, &config).await,
        Commands::Catalog(args) => cli::catalog::execute(args, &config).await,
        Commands::Config(args) => cli::config::execute(args, &config).await,
    }
}
