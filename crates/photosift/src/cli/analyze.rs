//! The `photosift analyze` command: run one batch through the pipeline
//! with live progress, then print the ranked shortlist.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::Context;
use clap::Args;
use photosift_core::jobs::JobStatus;
use photosift_core::{Analyzer, Config, FsResultsStore, FsStorage, ResultsDocument};

/// How often the poller refreshes the progress bar.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Arguments for the `analyze` command.
#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    /// Directory of images to analyze as one batch
    #[arg(required = true)]
    pub input: PathBuf,

    /// Batch id (defaults to the directory name)
    #[arg(long)]
    pub batch_id: Option<String>,

    /// Write the final results document to this file as JSON
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Number of top-ranked images to list in the summary
    #[arg(long, default_value_t = 10)]
    pub top: usize,
}

/// Execute the analyze command.
pub async fn execute(args: AnalyzeArgs) -> anyhow::Result<()> {
    let config = Config::load()?;

    let input = args
        .input
        .canonicalize()
        .with_context(|| format!("Cannot resolve input path {:?}", args.input))?;
    anyhow::ensure!(input.is_dir(), "Input must be a directory: {:?}", input);

    let batch_id = match args.batch_id {
        Some(id) => id,
        None => input
            .file_name()
            .and_then(|n| n.to_str())
            .context("Cannot derive a batch id from the input directory name")?
            .to_string(),
    };
    let uploads_root = input
        .parent()
        .context("Input directory has no parent")?
        .to_path_buf();

    let storage = Arc::new(FsStorage::new(
        uploads_root,
        config.storage.supported_extensions.clone(),
    ));
    let results = Arc::new(FsResultsStore::from_config(&config));
    let analyzer = Arc::new(Analyzer::new(config, storage, results));

    let job_id = new_job_id(&batch_id);
    analyzer.create_job(&job_id, &batch_id)?;
    tracing::info!(%job_id, %batch_id, "Starting analysis");

    let worker = {
        let analyzer = analyzer.clone();
        let job_id = job_id.clone();
        let batch_id = batch_id.clone();
        tokio::spawn(async move { analyzer.run_job(&job_id, &batch_id).await })
    };

    // Poll the job tracker like any other caller would
    let progress = create_progress_bar();
    loop {
        let job = analyzer.job(&job_id)?;
        progress.set_position((job.progress * 100.0).round() as u64);
        match job.status {
            JobStatus::Completed => {
                progress.finish_with_message("done");
                break;
            }
            JobStatus::Failed => {
                progress.abandon_with_message("failed");
                worker.abort();
                anyhow::bail!(
                    "Analysis failed: {}",
                    job.error.unwrap_or_else(|| "unknown error".to_string())
                );
            }
            JobStatus::Queued | JobStatus::Running => {}
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
    worker.await?;

    let document = analyzer.results(&batch_id).await?;
    print_summary(&document, args.top);

    if let Some(output) = args.output {
        std::fs::write(&output, serde_json::to_vec_pretty(&document)?)?;
        tracing::info!("Results written to {:?}", output);
    }

    Ok(())
}

fn new_job_id(batch_id: &str) -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    format!("{batch_id}-{millis}")
}

fn print_summary(document: &ResultsDocument, top: usize) {
    if let Some(metadata) = &document.metadata {
        println!(
            "Analyzed {} images from batch '{}'",
            metadata.total_images, document.upload_id
        );
    }

    println!("\nTop shots:");
    for record in document.images.iter().take(top) {
        let rank = record.rank.unwrap_or_default();
        let tags = if record.tags.is_empty() {
            String::new()
        } else {
            format!("  [{}]", record.tags.join(", "))
        };
        println!("  {rank:>3}. {:<40} {:.3}{tags}", record.image_id, record.final_score);
    }

    if let Some(report) = &document.duplicate_report {
        println!("\nDuplicates:");
        for group in &report.groups {
            println!(
                "  group {}: {} (keep {})",
                group.group_id,
                group.images.join(", "),
                group.recommended_keep.as_deref().unwrap_or("-")
            );
        }
        for recommendation in &report.recommendations {
            println!("  {recommendation}");
        }
    }
}

fn create_progress_bar() -> indicatif::ProgressBar {
    use indicatif::{ProgressBar, ProgressStyle};

    let pb = ProgressBar::new(100);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {percent}% {msg}",
            )
            .unwrap()
            .progress_chars("##-"),
    );
    pb.set_message("analyzing...");
    pb
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_ids_embed_the_batch() {
        let id = new_job_id("wedding");
        assert!(id.starts_with("wedding-"));
    }

    #[test]
    fn test_summary_handles_partial_documents() {
        // No metadata or report: the summary must not panic
        let document = ResultsDocument::partial("batch", vec![]);
        print_summary(&document, 5);
    }
}
