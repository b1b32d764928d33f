//! Photosift CLI - rank and deduplicate a batch of photos.
//!
//! Point it at a directory of images and it scores every shot, groups
//! near-duplicates, and prints a ranked shortlist while the analysis job
//! reports live progress.
//!
//! # Usage
//!
//! ```bash
//! # Analyze a directory as one batch
//! photosift analyze ./shoot-2026-08/
//!
//! # Print a stored results document
//! photosift results shoot-2026-08
//!
//! # View configuration
//! photosift config show
//! ```

use clap::{Parser, Subcommand};

mod cli;
mod logging;

/// Photosift - rank and deduplicate a batch of photos.
#[derive(Parser, Debug)]
#[command(name = "photosift")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Analyze a directory of images as one batch
    Analyze(cli::analyze::AnalyzeArgs),

    /// Print the stored results document for a batch
    Results(cli::results::ResultsArgs),

    /// View and manage configuration
    Config(cli::config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging from config, with CLI verbose override.
    // Note: logging isn't initialized yet, so use eprintln for config warnings.
    let config = match photosift_core::Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!(
                "Warning: Failed to load config: {e}\n  \
                 Using default configuration. Check your config file with `photosift config path`."
            );
            photosift_core::Config::default()
        }
    };
    logging::init_from_config(&config, cli.verbose, cli.json_logs);

    tracing::debug!("Photosift v{}", photosift_core::VERSION);

    // Dispatch to the appropriate command handler
    match cli.command {
        Commands::Analyze(args) => cli::analyze::execute(args).await,
        Commands::Results(args) => cli::results::execute(args).await,
        Commands::Config(args) => cli::config::execute(args).await,
    }
}
