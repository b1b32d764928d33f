//! Duplicate scoring from the batch's merged duplicate groups.
//!
//! The first-encountered image of a duplicate set keeps a full score; later
//! members are penalized by position without ever dropping to zero.

use crate::analysis::BatchContext;
use crate::error::SignalError;
use crate::pipeline::AnalysisImage;
use crate::types::SignalOutcome;

use super::{SignalKind, SignalScorer};

/// Floor for a duplicate's score regardless of position.
const DUPLICATE_SCORE_FLOOR: f64 = 0.1;

/// Penalty per position step within a group.
const POSITION_PENALTY: f64 = 0.3;

#[derive(Default)]
pub struct DuplicateScorer;

impl DuplicateScorer {
    pub fn new() -> Self {
        Self
    }
}

impl SignalScorer for DuplicateScorer {
    fn kind(&self) -> SignalKind {
        SignalKind::Duplicate
    }

    fn score(
        &self,
        image: &AnalysisImage,
        ctx: &BatchContext,
    ) -> Result<SignalOutcome, SignalError> {
        match ctx.group_position(&image.image_id) {
            None => Ok(SignalOutcome::new(1.0, vec!["unique".to_string()])),
            Some(pos) => {
                let value =
                    (1.0 - POSITION_PENALTY * pos.position as f64).max(DUPLICATE_SCORE_FLOOR);
                let mut tags = vec![format!("duplicate_group_{}", pos.size)];
                if pos.position == 0 {
                    tags.push("duplicate_primary".to_string());
                } else {
                    tags.push("duplicate_secondary".to_string());
                }
                Ok(SignalOutcome::new(value, tags))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::ImageDecoder;
    use crate::types::DuplicateGroup;

    fn decode(id: &str) -> AnalysisImage {
        let img = image::RgbImage::from_pixel(16, 16, image::Rgb([50, 50, 50]));
        let mut bytes = Vec::new();
        image::DynamicImage::ImageRgb8(img)
            .write_to(
                &mut std::io::Cursor::new(&mut bytes),
                image::ImageFormat::Png,
            )
            .unwrap();
        ImageDecoder::decode_sync(id, bytes, 1600).unwrap()
    }

    fn grouped_context() -> BatchContext {
        let mut ctx = BatchContext::new("batch");
        ctx.set_groups(vec![DuplicateGroup::new(
            0,
            vec!["a".into(), "b".into(), "c".into(), "d".into(), "e".into()],
        )]);
        ctx
    }

    #[test]
    fn test_ungrouped_image_is_unique() {
        let scorer = DuplicateScorer::new();
        let outcome = scorer.score(&decode("solo"), &grouped_context()).unwrap();
        assert_eq!(outcome.value, 1.0);
        assert_eq!(outcome.tags, vec!["unique".to_string()]);
    }

    #[test]
    fn test_primary_keeps_full_score() {
        let scorer = DuplicateScorer::new();
        let outcome = scorer.score(&decode("a"), &grouped_context()).unwrap();
        assert_eq!(outcome.value, 1.0);
        assert!(outcome.tags.contains(&"duplicate_primary".to_string()));
        assert!(outcome.tags.contains(&"duplicate_group_5".to_string()));
    }

    #[test]
    fn test_secondary_penalized_by_position() {
        let scorer = DuplicateScorer::new();
        let outcome = scorer.score(&decode("b"), &grouped_context()).unwrap();
        assert!((outcome.value - 0.7).abs() < 1e-9);
        assert!(outcome.tags.contains(&"duplicate_secondary".to_string()));
    }

    #[test]
    fn test_deep_positions_hit_the_floor() {
        let scorer = DuplicateScorer::new();
        // Position 4 would be 1.0 - 1.2; the floor holds at 0.1
        let outcome = scorer.score(&decode("e"), &grouped_context()).unwrap();
        assert!((outcome.value - DUPLICATE_SCORE_FLOOR).abs() < 1e-9);
    }
}
