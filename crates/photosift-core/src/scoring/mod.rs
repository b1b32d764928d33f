//! Signal scoring: five polymorphic scorers behind one trait, a percentile
//! normalizer for the batch-relative sharpness score, and the weighted
//! aggregator that folds all signals into one final score.

pub mod action;
pub mod aggregate;
pub mod composition;
pub mod duplicate;
pub mod emotion;
pub mod normalize;
pub mod sharpness;

pub use aggregate::{AggregatedScore, ScoreAggregator};
pub use normalize::PercentileNormalizer;

use serde::{Deserialize, Serialize};

use crate::analysis::BatchContext;
use crate::error::SignalError;
use crate::pipeline::AnalysisImage;
use crate::types::SignalOutcome;

/// The closed set of signal kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalKind {
    Sharpness,
    Composition,
    Emotion,
    Action,
    Duplicate,
}

impl SignalKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalKind::Sharpness => "sharpness",
            SignalKind::Composition => "composition",
            SignalKind::Emotion => "emotion",
            SignalKind::Action => "action",
            SignalKind::Duplicate => "duplicate",
        }
    }
}

impl std::fmt::Display for SignalKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One scoring capability: a bounded value plus tags for one image.
///
/// Implementations clamp their output to [0, 1]. Only the sharpness scorer
/// reads batch-wide statistics from the context; the duplicate scorer reads
/// the merged groups; the rest are single-image pure functions.
pub trait SignalScorer: Send + Sync {
    fn kind(&self) -> SignalKind;

    fn score(
        &self,
        image: &AnalysisImage,
        ctx: &BatchContext,
    ) -> Result<SignalOutcome, SignalError>;
}

/// Build the full scorer set in aggregation order.
pub fn scorer_set(config: &crate::config::Config) -> Vec<Box<dyn SignalScorer>> {
    vec![
        Box::new(sharpness::SharpnessScorer::new(config.sharpness.clone())),
        Box::new(composition::CompositionScorer::new()),
        Box::new(emotion::EmotionScorer::new()),
        Box::new(action::ActionScorer::new()),
        Box::new(duplicate::DuplicateScorer::new()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signal_kind_serializes_lowercase() {
        let json = serde_json::to_string(&SignalKind::Sharpness).unwrap();
        assert_eq!(json, "\"sharpness\"");
    }

    #[test]
    fn test_scorer_set_order_and_kinds() {
        let config = crate::config::Config::default();
        let scorers = scorer_set(&config);
        let kinds: Vec<SignalKind> = scorers.iter().map(|s| s.kind()).collect();
        assert_eq!(
            kinds,
            vec![
                SignalKind::Sharpness,
                SignalKind::Composition,
                SignalKind::Emotion,
                SignalKind::Action,
                SignalKind::Duplicate,
            ]
        );
    }
}
