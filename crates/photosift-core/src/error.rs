//! Error types for the Photosift analysis pipeline.
//!
//! Errors are organized by layer: per-image pipeline failures are caught and
//! skipped, per-signal failures degrade to a zero score, and run-boundary
//! failures become job-state transitions rather than errors visible to
//! pollers.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for Photosift operations.
#[derive(Error, Debug)]
pub enum SiftError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Batch analysis errors
    #[error("Analysis error: {0}")]
    Analysis(#[from] AnalysisError),

    /// Per-image pipeline errors
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// Job tracking errors
    #[error("Job error: {0}")]
    Job(#[from] JobError),

    /// General I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the config file from disk
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML configuration
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Configuration values are invalid
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Errors that abort or gate a whole analysis run.
#[derive(Error, Debug)]
pub enum AnalysisError {
    /// The batch resolved to zero images; raised before the job starts running
    #[error("No images found for batch {batch_id}")]
    EmptyBatch { batch_id: String },

    /// No results document exists for the batch
    #[error("Results not found for batch {batch_id}")]
    ResultsNotFound { batch_id: String },

    /// The run was cancelled at an iteration boundary
    #[error("Analysis cancelled for batch {batch_id}")]
    Cancelled { batch_id: String },

    /// The run exceeded its wall-clock deadline
    #[error("Analysis deadline exceeded for batch {batch_id} after {seconds}s")]
    DeadlineExceeded { batch_id: String, seconds: u64 },

    /// Storage collaborator failure (listing, reading, writing)
    #[error("Storage error for batch {batch_id}: {message}")]
    Storage { batch_id: String, message: String },
}

/// Job tracker errors.
#[derive(Error, Debug)]
pub enum JobError {
    /// Polled a job id that was never created
    #[error("Job not found: {0}")]
    NotFound(String),

    /// Attempted to create a job under an id that already exists.
    /// Job ids are caller-supplied unique tokens; nothing is silently
    /// overwritten.
    #[error("Job already exists: {0}")]
    AlreadyExists(String),
}

/// Per-image pipeline errors. Caught at the collection loop and skipped;
/// a decode failure never aborts the batch.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Image decoding failed
    #[error("Decode error for {path}: {message}")]
    Decode { path: PathBuf, message: String },

    /// Unsupported image format
    #[error("Unsupported format for {path}: {format}")]
    UnsupportedFormat { path: PathBuf, format: String },

    /// File not found
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),
}

/// Per-signal scoring errors. Caught by the aggregator; the failing signal
/// degrades to score 0 with no tags.
#[derive(Error, Debug)]
pub enum SignalError {
    /// A signal's internal feature extraction failed
    #[error("Signal {kind} failed for {image_id}: {message}")]
    Computation {
        kind: &'static str,
        image_id: String,
        message: String,
    },
}

/// Convenience type alias for Photosift results.
pub type Result<T> = std::result::Result<T, SiftError>;

/// Convenience type alias for pipeline-specific results.
pub type PipelineResult<T> = std::result::Result<T, PipelineError>;
