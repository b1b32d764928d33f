//! Composition scoring: how much a frame looks like B-roll rather than the
//! main subject matter.
//!
//! Three cues, blended: crowd-like horizontal texture, non-action framing
//! (soft focus, moderate edge density, large uniform areas), and
//! rectangular equipment/facility structure.

use crate::analysis::BatchContext;
use crate::error::SignalError;
use crate::pipeline::ops::{Region, MOTION_HORIZONTAL, MOTION_VERTICAL};
use crate::pipeline::AnalysisImage;
use crate::types::SignalOutcome;

use super::{SignalKind, SignalScorer};

const B_ROLL_THRESHOLD: f64 = 0.4;

/// Cell edge for the rectangular-structure scan.
const STRUCTURE_CELL: u32 = 32;

/// Mean directional response a cell needs in both axes to count as a
/// rectangular structure.
const STRUCTURE_ENERGY: f64 = 20.0;

#[derive(Default)]
pub struct CompositionScorer;

impl CompositionScorer {
    pub fn new() -> Self {
        Self
    }

    /// Crowd indicator: dense horizontal line texture reads as bleachers,
    /// railings, or rows of spectators.
    fn crowd_score(image: &AnalysisImage) -> f64 {
        let response = image.gray.convolve3x3(&MOTION_HORIZONTAL);
        let energy = response.iter().map(|v| f64::from(v.abs())).sum::<f64>()
            / response.len().max(1) as f64
            / 100.0;
        energy.min(0.3)
    }

    /// Non-action cues: low overall detail, mid-range edge density, and
    /// large uniform areas all point away from gameplay.
    fn non_action_score(image: &AnalysisImage) -> f64 {
        let mut score: f64 = 0.0;

        if image.gray.laplacian_variance() < 500.0 {
            score += 0.3;
        }

        let density = image.gray.edge_density(150.0);
        if density > 0.05 && density < 0.15 {
            score += 0.2;
        }

        if image.gray.uniform_area_fraction(20, 100.0) > 0.4 {
            score += 0.3;
        }

        score.min(1.0)
    }

    /// Count grid cells with strong responses along both axes — a coarse
    /// proxy for rectangular equipment and facility structure.
    fn structure_score(image: &AnalysisImage) -> f64 {
        let gray = &image.gray;
        let horizontal = gray.convolve3x3(&MOTION_HORIZONTAL);
        let vertical = gray.convolve3x3(&MOTION_VERTICAL);

        let cell_energy = |response: &[f32], region: Region| {
            let mut sum = 0.0f64;
            let mut count = 0usize;
            for y in region.y..(region.y + region.height).min(gray.height) {
                for x in region.x..(region.x + region.width).min(gray.width) {
                    sum += f64::from(response[(y * gray.width + x) as usize].abs());
                    count += 1;
                }
            }
            if count == 0 {
                0.0
            } else {
                sum / count as f64
            }
        };

        let mut structures = 0usize;
        let mut y = 0;
        while y < gray.height {
            let mut x = 0;
            while x < gray.width {
                let region = Region::new(
                    x,
                    y,
                    STRUCTURE_CELL.min(gray.width - x),
                    STRUCTURE_CELL.min(gray.height - y),
                );
                if cell_energy(&horizontal, region) > STRUCTURE_ENERGY
                    && cell_energy(&vertical, region) > STRUCTURE_ENERGY
                {
                    structures += 1;
                }
                x += STRUCTURE_CELL;
            }
            y += STRUCTURE_CELL;
        }

        (structures as f64 * 0.1).min(0.5)
    }
}

impl SignalScorer for CompositionScorer {
    fn kind(&self) -> SignalKind {
        SignalKind::Composition
    }

    fn score(
        &self,
        image: &AnalysisImage,
        _ctx: &BatchContext,
    ) -> Result<SignalOutcome, SignalError> {
        let crowd = Self::crowd_score(image);
        let non_action = Self::non_action_score(image);
        let structure = Self::structure_score(image);

        let value = (crowd * 0.5 + non_action * 0.3 + structure * 0.2).min(1.0);

        let mut tags = Vec::new();
        if value > B_ROLL_THRESHOLD {
            tags.push("B_roll".to_string());
        }

        Ok(SignalOutcome::new(value, tags))
    }
}
