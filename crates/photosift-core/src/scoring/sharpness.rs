//! Subject-weighted sharpness scoring with batch-relative normalization.
//!
//! The raw magnitude is the Laplacian variance of a center-weighted subject
//! region (falling back to the whole frame when the region is flat). Phase 1
//! buffers the magnitude; phase 2 normalizes it against the batch and layers
//! a bokeh bonus on top when the subject is much sharper than the
//! background.

use std::collections::BTreeMap;

use serde_json::json;

use crate::analysis::BatchContext;
use crate::config::SharpnessConfig;
use crate::error::SignalError;
use crate::pipeline::ops::{masked_variance, Region};
use crate::pipeline::AnalysisImage;
use crate::types::SignalOutcome;

use super::normalize::PercentileNormalizer;
use super::{SignalKind, SignalScorer};

/// Subject must be this many times sharper than the background to count as
/// bokeh.
const BOKEH_RATIO: f64 = 2.5;

pub struct SharpnessScorer {
    config: SharpnessConfig,
    normalizer: PercentileNormalizer,
}

impl SharpnessScorer {
    pub fn new(config: SharpnessConfig) -> Self {
        let normalizer = PercentileNormalizer::new(config.clone());
        Self { config, normalizer }
    }

    /// Center-weighted subject region: half the width, 60% of the height,
    /// offset toward the upper middle where subjects usually sit.
    pub fn subject_region(image: &AnalysisImage) -> Region {
        let w = image.width();
        let h = image.height();
        Region::new(
            w / 4,
            (f64::from(h) * 0.15) as u32,
            w / 2,
            (f64::from(h) * 0.6) as u32,
        )
    }

    /// Laplacian variance inside and outside the subject region.
    pub fn region_variances(image: &AnalysisImage) -> (f64, f64) {
        let region = Self::subject_region(image);
        let response = image.gray.laplacian();
        let width = image.gray.width;
        let subject = masked_variance(&response, |i| {
            let x = i as u32 % width;
            let y = i as u32 / width;
            region.contains(x, y)
        });
        let background = masked_variance(&response, |i| {
            let x = i as u32 % width;
            let y = i as u32 / width;
            !region.contains(x, y)
        });
        (subject, background)
    }

    /// The phase-1 raw magnitude: subject variance, or the whole-frame
    /// variance when the subject region carries no detail.
    pub fn collect_magnitude(image: &AnalysisImage) -> f64 {
        let (subject, _) = Self::region_variances(image);
        if subject > 0.0 {
            subject
        } else {
            image.gray.laplacian_variance()
        }
    }

    /// Diagnostic attributes for the record's debug section.
    pub fn debug_info(
        &self,
        image: &AnalysisImage,
        ctx: &BatchContext,
    ) -> BTreeMap<String, serde_json::Value> {
        let raw = ctx
            .magnitude_of(&image.image_id)
            .unwrap_or_else(|| Self::collect_magnitude(image));
        let (subject, background) = Self::region_variances(image);
        let valid = ctx.valid_magnitudes();

        let mut info = BTreeMap::new();
        info.insert("raw_magnitude".into(), json!(round2(raw)));
        info.insert(
            "absolute_score".into(),
            json!(round3(self.normalizer.absolute_score(raw))),
        );
        info.insert(
            "batch_context".into(),
            json!(format!("{} images", ctx.processed_count())),
        );
        info.insert(
            "percentile_rank".into(),
            json!(round2(self.normalizer.percentile_rank(raw, &valid))),
        );
        info.insert("subject_variance".into(), json!(round2(subject)));
        info.insert("background_variance".into(), json!(round2(background)));
        if background > 0.0 {
            info.insert(
                "sharpness_ratio".into(),
                json!(round2(subject / background)),
            );
        }
        info.insert("subject_region".into(), json!("center_weighted"));
        info
    }
}

impl SignalScorer for SharpnessScorer {
    fn kind(&self) -> SignalKind {
        SignalKind::Sharpness
    }

    fn score(
        &self,
        image: &AnalysisImage,
        ctx: &BatchContext,
    ) -> Result<SignalOutcome, SignalError> {
        let (subject, background) = Self::region_variances(image);

        let primary = if subject > 0.0 {
            subject
        } else {
            ctx.magnitude_of(&image.image_id)
                .unwrap_or_else(|| Self::collect_magnitude(image))
        };

        let valid = ctx.valid_magnitudes();
        let normalized = self.normalizer.normalize(primary, &valid);

        let mut value = normalized.value;
        let mut tags = Vec::new();
        if normalized.boosted {
            tags.push("sharp".to_string());
        }

        if subject > 0.0 && background > 0.0 {
            let ratio = subject / background;
            if subject > self.config.min_variance * 2.0 && ratio > BOKEH_RATIO {
                tags.push("high_bokeh".to_string());
                value = (value * 1.05).min(1.0);
            }
        }

        Ok(SignalOutcome::new(value, tags))
    }
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

fn round3(v: f64) -> f64 {
    (v * 1000.0).round() / 1000.0
}
