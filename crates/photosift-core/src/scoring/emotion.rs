//! Emotion scoring via a crowd-energy proxy.
//!
//! Face-level expression analysis belongs to an external detection plugin;
//! the built-in signal measures the scene's visual energy: texture
//! variance, edge complexity, and color variance.

use crate::analysis::BatchContext;
use crate::error::SignalError;
use crate::pipeline::ops::{self, variance};
use crate::pipeline::AnalysisImage;
use crate::types::SignalOutcome;

use super::{SignalKind, SignalScorer};

const EMOTION_THRESHOLD: f64 = 0.6;

#[derive(Default)]
pub struct EmotionScorer;

impl EmotionScorer {
    pub fn new() -> Self {
        Self
    }

    /// Scene energy in [0, 1] from texture, edges, and color spread.
    fn crowd_energy(image: &AnalysisImage) -> f64 {
        let texture_energy = variance(image.gray.pixels()) / 5000.0;

        let edge_complexity = image.gray.edge_density(100.0);

        let channel_vars = ops::channel_variances(&image.rgb);
        let color_energy = channel_vars.iter().sum::<f64>() / 3.0 / 5000.0;

        (texture_energy * 0.3 + edge_complexity * 0.2 + color_energy * 0.1).min(1.0)
    }
}

impl SignalScorer for EmotionScorer {
    fn kind(&self) -> SignalKind {
        SignalKind::Emotion
    }

    fn score(
        &self,
        image: &AnalysisImage,
        _ctx: &BatchContext,
    ) -> Result<SignalOutcome, SignalError> {
        let value = Self::crowd_energy(image).clamp(0.0, 1.0);

        let mut tags = Vec::new();
        if value > EMOTION_THRESHOLD {
            tags.push("high_emotion".to_string());
        }

        Ok(SignalOutcome::new(value, tags))
    }
}
