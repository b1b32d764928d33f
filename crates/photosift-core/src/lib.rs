//! Photosift Core - batch photo ranking and deduplication.
//!
//! Photosift analyzes a batch of images uploaded together and ranks them so
//! a user can quickly pick the best shots: every image is scored by a set
//! of signals, near-duplicates are grouped with one recommended keep per
//! group, and a caller polls the run's progress asynchronously.
//!
//! # Architecture
//!
//! One analysis run is a strict two-phase pipeline:
//!
//! ```text
//! Batch → Collect (decode, magnitudes, fingerprints, features)
//!       → Group duplicates (batch-wide)
//!       → Score (percentile-relative sharpness + signal set + weights)
//!       → Sort, rank, persist
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use photosift_core::{Analyzer, Config, FsResultsStore, FsStorage};
//!
//! #[tokio::main]
//! async fn main() -> photosift_core::Result<()> {
//!     let config = Config::load()?;
//!     let storage = Arc::new(FsStorage::from_config(&config));
//!     let results = Arc::new(FsResultsStore::from_config(&config));
//!     let analyzer = Arc::new(Analyzer::new(config, storage, results));
//!
//!     analyzer.create_job("job-1", "batch-1")?;
//!     analyzer.run_job("job-1", "batch-1").await;
//!     println!("{:?}", analyzer.job("job-1")?);
//!     Ok(())
//! }
//! ```

// Module declarations
pub mod analysis;
pub mod config;
pub mod duplicate;
pub mod error;
pub mod jobs;
pub mod math;
pub mod pipeline;
pub mod scoring;
pub mod storage;
pub mod types;

// Re-exports for convenient access
pub use analysis::{Analyzer, BatchContext};
pub use config::Config;
pub use duplicate::DuplicateDetector;
pub use error::{AnalysisError, ConfigError, JobError, PipelineError, Result, SiftError};
pub use jobs::{Job, JobStatus, JobTracker};
pub use pipeline::{AnalysisImage, ImageDecoder};
pub use scoring::{ScoreAggregator, SignalKind};
pub use storage::{FsResultsStore, FsStorage, ResultsStore, Storage};
pub use types::{DuplicateGroup, DuplicateReport, ImageRecord, ResultsDocument};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
