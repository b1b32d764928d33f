//! Configuration validation with range checks.

use crate::error::ConfigError;

use super::Config;

impl Config {
    /// Validate configuration values are within acceptable ranges.
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        let w = &self.scoring.weights;
        for (name, value) in [
            ("sharpness", w.sharpness),
            ("composition", w.composition),
            ("emotion", w.emotion),
            ("action", w.action),
            ("duplicate", w.duplicate),
        ] {
            if value < 0.0 || !value.is_finite() {
                return Err(ConfigError::ValidationError(format!(
                    "scoring.weights.{name} must be a finite non-negative number"
                )));
            }
        }
        if !(0.0..=1.0).contains(&self.duplicates.feature_similarity_threshold) {
            return Err(ConfigError::ValidationError(
                "duplicates.feature_similarity_threshold must be between 0.0 and 1.0".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.duplicates.min_duplicate_similarity) {
            return Err(ConfigError::ValidationError(
                "duplicates.min_duplicate_similarity must be between 0.0 and 1.0".into(),
            ));
        }
        if self.duplicates.clustering_eps <= 0.0 {
            return Err(ConfigError::ValidationError(
                "duplicates.clustering_eps must be > 0".into(),
            ));
        }
        if self.duplicates.min_samples == 0 {
            return Err(ConfigError::ValidationError(
                "duplicates.min_samples must be > 0".into(),
            ));
        }
        if self.sharpness.max_variance <= self.sharpness.min_variance {
            return Err(ConfigError::ValidationError(
                "sharpness.max_variance must exceed sharpness.min_variance".into(),
            ));
        }
        if self.limits.analysis_max_dimension == 0 {
            return Err(ConfigError::ValidationError(
                "limits.analysis_max_dimension must be > 0".into(),
            ));
        }
        if self.storage.supported_extensions.is_empty() {
            return Err(ConfigError::ValidationError(
                "storage.supported_extensions must not be empty".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_passes_validation() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_negative_weight() {
        let mut config = Config::default();
        config.scoring.weights.emotion = -0.1;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("emotion"));
    }

    #[test]
    fn test_validate_rejects_out_of_range_similarity() {
        let mut config = Config::default();
        config.duplicates.min_duplicate_similarity = 1.5;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("min_duplicate_similarity"));
    }

    #[test]
    fn test_validate_rejects_inverted_variance_bounds() {
        let mut config = Config::default();
        config.sharpness.max_variance = 50.0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("max_variance"));
    }

    #[test]
    fn test_validate_rejects_zero_min_samples() {
        let mut config = Config::default();
        config.duplicates.min_samples = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("min_samples"));
    }

    #[test]
    fn test_weights_need_not_sum_to_one() {
        let mut config = Config::default();
        config.scoring.weights.sharpness = 2.0;
        assert!(config.validate().is_ok());
    }
}
