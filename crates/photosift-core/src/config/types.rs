//! Sub-configuration structs with defaults matching the shipped scoring
//! scheme.

use serde::{Deserialize, Serialize};

/// Per-signal weights applied by the score aggregator.
///
/// The weights are not forced to sum to 1; when they don't, final scores may
/// leave [0, 1] and callers are expected to tolerate that.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalWeights {
    pub sharpness: f64,
    pub composition: f64,
    pub emotion: f64,
    pub action: f64,
    pub duplicate: f64,
}

impl Default for SignalWeights {
    fn default() -> Self {
        Self {
            sharpness: 0.35,
            composition: 0.30,
            emotion: 0.15,
            action: 0.10,
            duplicate: 0.10,
        }
    }
}

/// Scoring settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Per-signal weights
    pub weights: SignalWeights,
}

/// Duplicate detection thresholds and strategy toggles.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DuplicateConfig {
    /// Max fingerprint Hamming distance for the fingerprint producer
    pub hash_threshold: u32,

    /// Cosine similarity floor for pairwise feature comparison
    pub feature_similarity_threshold: f64,

    /// Cosine similarity floor for gathering a feature candidate group
    pub min_duplicate_similarity: f64,

    /// DBSCAN neighborhood radius (cosine distance)
    pub clustering_eps: f64,

    /// DBSCAN core-point minimum neighborhood size
    pub min_samples: usize,

    /// Enable the fingerprint grouping producer
    pub enable_hash_comparison: bool,

    /// Enable the feature-similarity grouping producer
    pub enable_feature_comparison: bool,

    /// Enable the density clustering producer
    pub enable_clustering: bool,
}

impl Default for DuplicateConfig {
    fn default() -> Self {
        Self {
            hash_threshold: 3,
            feature_similarity_threshold: 0.98,
            min_duplicate_similarity: 0.99,
            clustering_eps: 0.05,
            min_samples: 2,
            enable_hash_comparison: true,
            enable_feature_comparison: true,
            enable_clustering: false,
        }
    }
}

/// Absolute sharpness reference bounds.
///
/// The baseline sharpness score is computed against these fixed variance
/// bounds; the percentile boost on top is batch-relative.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SharpnessConfig {
    /// Laplacian variance mapping to score 0.0
    pub min_variance: f64,

    /// Laplacian variance mapping to score 1.0
    pub max_variance: f64,
}

impl Default for SharpnessConfig {
    fn default() -> Self {
        Self {
            min_variance: 100.0,
            max_variance: 2000.0,
        }
    }
}

/// Resource limits for one analysis run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Longest edge images are downscaled to before analysis
    pub analysis_max_dimension: u32,

    /// Wall-clock deadline for one run in seconds; 0 disables the deadline
    pub max_run_seconds: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            analysis_max_dimension: 1600,
            max_run_seconds: 0,
        }
    }
}

/// Filesystem storage layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Base directory; uploads/ and results/ live underneath
    pub base_dir: String,

    /// Extensions treated as images when listing a batch
    pub supported_extensions: Vec<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            base_dir: "~/.photosift/storage".to_string(),
            supported_extensions: vec![
                "jpg".to_string(),
                "jpeg".to_string(),
                "png".to_string(),
                "tiff".to_string(),
                "bmp".to_string(),
                "webp".to_string(),
            ],
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: error, warn, info, debug, trace
    pub level: String,

    /// Log format: "pretty" or "json"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}
