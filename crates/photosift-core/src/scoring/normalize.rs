//! Percentile-relative normalization of the raw sharpness magnitude.
//!
//! A Laplacian variance of 800 can be "sharp" in a batch of soft shots and
//! "soft" in a batch of crisp ones, so the score has two tiers: an absolute
//! baseline against fixed reference bounds, and a batch-relative boost into
//! the top band for images at or above the 85th percentile.

use crate::config::SharpnessConfig;
use crate::math::percentile;

/// The batch percentiles the normalizer works from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BatchPercentiles {
    pub p15: f64,
    pub p50: f64,
    pub p85: f64,
}

/// Result of normalizing one magnitude against the batch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalizedScore {
    pub value: f64,

    /// Whether the batch-relative boost applied
    pub boosted: bool,
}

/// Converts a raw per-image magnitude into a batch-relative score.
pub struct PercentileNormalizer {
    config: SharpnessConfig,
}

impl PercentileNormalizer {
    pub fn new(config: SharpnessConfig) -> Self {
        Self { config }
    }

    /// The 15th/50th/85th percentiles of the batch's valid magnitudes.
    pub fn batch_percentiles(&self, valid: &[f64]) -> BatchPercentiles {
        BatchPercentiles {
            p15: percentile(valid, 15.0),
            p50: percentile(valid, 50.0),
            p85: percentile(valid, 85.0),
        }
    }

    /// Absolute baseline against the fixed reference bounds.
    pub fn absolute_score(&self, raw: f64) -> f64 {
        let span = self.config.max_variance - self.config.min_variance;
        ((raw - self.config.min_variance) / span).clamp(0.0, 1.0)
    }

    /// Normalize one magnitude against the batch's valid (> 0) magnitudes.
    ///
    /// The boost requires at least two valid magnitudes; a single image can
    /// never be "relatively" sharp.
    pub fn normalize(&self, raw: f64, valid: &[f64]) -> NormalizedScore {
        let baseline = self.absolute_score(raw);

        if valid.len() < 2 {
            return NormalizedScore {
                value: baseline,
                boosted: false,
            };
        }

        let p85 = self.batch_percentiles(valid).p85;
        if raw < p85 {
            return NormalizedScore {
                value: baseline,
                boosted: false,
            };
        }

        let max_valid = valid.iter().copied().fold(f64::MIN, f64::max);
        let spread = max_valid - p85;
        let value = if spread > f64::EPSILON {
            (0.85 + (raw - p85) / spread * 0.15).min(1.0)
        } else {
            0.85
        };
        NormalizedScore {
            value,
            boosted: true,
        }
    }

    /// Percent of valid magnitudes at or below `raw`, for diagnostics.
    pub fn percentile_rank(&self, raw: f64, valid: &[f64]) -> f64 {
        if valid.is_empty() {
            return 0.0;
        }
        let at_or_below = valid.iter().filter(|v| **v <= raw).count();
        at_or_below as f64 / valid.len() as f64 * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normalizer() -> PercentileNormalizer {
        PercentileNormalizer::new(SharpnessConfig::default())
    }

    #[test]
    fn test_absolute_score_clamps_to_bounds() {
        let n = normalizer();
        assert_eq!(n.absolute_score(50.0), 0.0);
        assert_eq!(n.absolute_score(5000.0), 1.0);
        let mid = n.absolute_score(1050.0);
        assert!((mid - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_no_boost_with_single_magnitude() {
        let n = normalizer();
        let result = n.normalize(1900.0, &[1900.0]);
        assert!(!result.boosted);
        assert!(result.value < 0.95);
    }

    #[test]
    fn test_boost_at_top_of_batch() {
        let n = normalizer();
        let valid = vec![200.0, 300.0, 400.0, 500.0, 1800.0];
        let result = n.normalize(1800.0, &valid);
        assert!(result.boosted);
        // The batch maximum boosts to exactly 1.0
        assert!((result.value - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_below_p85_keeps_baseline() {
        let n = normalizer();
        let valid = vec![200.0, 300.0, 400.0, 500.0, 1800.0];
        let result = n.normalize(300.0, &valid);
        assert!(!result.boosted);
        assert!((result.value - n.absolute_score(300.0)).abs() < 1e-12);
    }

    #[test]
    fn test_degenerate_spread_boosts_to_band_floor() {
        let n = normalizer();
        // All magnitudes equal: p85 == max, spread is zero
        let valid = vec![600.0, 600.0, 600.0];
        let result = n.normalize(600.0, &valid);
        assert!(result.boosted);
        assert_eq!(result.value, 0.85);
    }

    #[test]
    fn test_boost_stays_within_unit_interval() {
        let n = normalizer();
        let valid = vec![100.0, 5000.0];
        let result = n.normalize(5000.0, &valid);
        assert!(result.boosted);
        assert!(result.value <= 1.0);
    }

    #[test]
    fn test_percentile_rank() {
        let n = normalizer();
        let valid = vec![100.0, 200.0, 300.0, 400.0];
        assert!((n.percentile_rank(250.0, &valid) - 50.0).abs() < 1e-9);
        assert_eq!(n.percentile_rank(250.0, &[]), 0.0);
    }
}
