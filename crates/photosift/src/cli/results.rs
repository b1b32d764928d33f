//! The `photosift results` command: print a stored results document.

use clap::Args;
use photosift_core::{Config, FsResultsStore, ResultsStore};

/// Arguments for the `results` command.
#[derive(Args, Debug)]
pub struct ResultsArgs {
    /// Batch id to fetch results for
    #[arg(required = true)]
    pub batch_id: String,

    /// Pretty-print the JSON output
    #[arg(long, default_value_t = true)]
    pub pretty: bool,
}

/// Execute the results command.
pub async fn execute(args: ResultsArgs) -> anyhow::Result<()> {
    let config = Config::load()?;
    let store = FsResultsStore::from_config(&config);

    let document = store.read(&args.batch_id).await?;

    let json = if args.pretty {
        serde_json::to_string_pretty(&document)?
    } else {
        serde_json::to_string(&document)?
    };
    println!("{json}");

    Ok(())
}
