//! Action scoring from motion energy and dynamic structure.

use crate::analysis::BatchContext;
use crate::error::SignalError;
use crate::pipeline::ops::{variance, MOTION_HORIZONTAL, MOTION_VERTICAL};
use crate::pipeline::AnalysisImage;
use crate::types::SignalOutcome;

use super::{SignalKind, SignalScorer};

const ACTION_THRESHOLD: f64 = 0.15;

#[derive(Default)]
pub struct ActionScorer;

impl ActionScorer {
    pub fn new() -> Self {
        Self
    }

    /// Directional motion energy plus gradient spread.
    fn motion_intensity(image: &AnalysisImage) -> f64 {
        let gray = &image.gray;
        let horizontal = gray.convolve3x3(&MOTION_HORIZONTAL);
        let vertical = gray.convolve3x3(&MOTION_VERTICAL);

        let motion_energy: f64 = horizontal
            .iter()
            .zip(vertical.iter())
            .map(|(h, v)| f64::from((h * h + v * v).sqrt()))
            .sum::<f64>()
            / horizontal.len().max(1) as f64;
        let motion_score = motion_energy / 255.0;

        let gradient_variance = variance(&gray.sobel_magnitude()) / 10000.0;

        (motion_score * 0.6 + gradient_variance * 0.4).min(1.0)
    }

    /// Edge density and texture variance read as dynamic scene structure.
    fn dynamic_score(image: &AnalysisImage) -> f64 {
        let edge_density = image.gray.edge_density(150.0);
        let texture_variance = variance(image.gray.pixels()) / 10000.0;
        (edge_density * 2.0 + texture_variance).min(1.0)
    }
}

impl SignalScorer for ActionScorer {
    fn kind(&self) -> SignalKind {
        SignalKind::Action
    }

    fn score(
        &self,
        image: &AnalysisImage,
        _ctx: &BatchContext,
    ) -> Result<SignalOutcome, SignalError> {
        let motion = Self::motion_intensity(image);
        let dynamic = Self::dynamic_score(image);

        let value = (motion * 0.7 + dynamic * 0.3).clamp(0.0, 1.0);

        let mut tags = Vec::new();
        if value > ACTION_THRESHOLD {
            tags.push("high_action".to_string());
        }

        Ok(SignalOutcome::new(value, tags))
    }
}
