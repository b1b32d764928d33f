//! Configuration management for Photosift.
//!
//! Configuration is loaded from a TOML file with sensible defaults. All
//! config structs implement `Default`, and loaded values are validated
//! before use.

mod types;
mod validate;

pub use types::*;

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Root configuration structure for Photosift.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Per-signal scoring weights
    pub scoring: ScoringConfig,

    /// Duplicate detection thresholds and toggles
    pub duplicates: DuplicateConfig,

    /// Absolute sharpness reference bounds
    pub sharpness: SharpnessConfig,

    /// Resource limits for a run
    pub limits: LimitsConfig,

    /// Filesystem storage layout
    pub storage: StorageConfig,

    /// Logging settings
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from the default location.
    ///
    /// Returns default configuration if the file doesn't exist.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default config file path.
    ///
    /// Uses platform-appropriate directories, falling back to
    /// ~/.photosift/config.toml if directory detection fails.
    pub fn default_path() -> PathBuf {
        directories::ProjectDirs::from("com", "photosift", "photosift")
            .map(|dirs| dirs.config_dir().to_path_buf().join("config.toml"))
            .unwrap_or_else(|| {
                let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
                PathBuf::from(home).join(".photosift").join("config.toml")
            })
    }

    /// Get the resolved storage base directory (with ~ expansion).
    pub fn storage_base_dir(&self) -> PathBuf {
        let expanded = shellexpand::tilde(&self.storage.base_dir);
        PathBuf::from(expanded.into_owned())
    }

    /// Directory holding uploaded batches, one subdirectory per batch id.
    pub fn uploads_dir(&self) -> PathBuf {
        self.storage_base_dir().join("uploads")
    }

    /// Directory holding per-batch results documents.
    pub fn results_dir(&self) -> PathBuf {
        self.storage_base_dir().join("results")
    }

    /// Serialize the config to a pretty TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ValidationError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.duplicates.hash_threshold, 3);
        assert_eq!(config.limits.analysis_max_dimension, 1600);
        assert!((config.scoring.weights.sharpness - 0.35).abs() < 1e-9);
    }

    #[test]
    fn test_config_to_toml() {
        let config = Config::default();
        let toml = config.to_toml().unwrap();
        assert!(toml.contains("[scoring"));
        assert!(toml.contains("[duplicates]"));
        assert!(toml.contains("[sharpness]"));
    }

    #[test]
    fn test_storage_dirs_derive_from_base() {
        let mut config = Config::default();
        config.storage.base_dir = "/tmp/photosift-test".to_string();
        assert_eq!(
            config.uploads_dir(),
            PathBuf::from("/tmp/photosift-test/uploads")
        );
        assert_eq!(
            config.results_dir(),
            PathBuf::from("/tmp/photosift-test/results")
        );
    }

    #[test]
    fn test_load_from_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[duplicates]\nhash_threshold = 7\n").unwrap();
        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.duplicates.hash_threshold, 7);
        // Unspecified sections fall back to defaults
        assert!((config.scoring.weights.composition - 0.30).abs() < 1e-9);
    }
}
