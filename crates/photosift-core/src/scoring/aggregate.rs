//! Weighted aggregation of all signal scores into one final score.

use std::collections::{BTreeMap, BTreeSet};

use crate::analysis::BatchContext;
use crate::config::SignalWeights;
use crate::pipeline::AnalysisImage;

use super::{SignalKind, SignalScorer};

/// The combined scoring output for one image.
#[derive(Debug, Clone)]
pub struct AggregatedScore {
    /// Weighted sum over all signals; intentionally not clamped
    pub final_score: f64,

    pub scores: BTreeMap<SignalKind, f64>,

    /// Union of all signal tags, deduplicated, sorted
    pub tags: Vec<String>,
}

/// Runs the scorer set over an image and folds the results by weight.
pub struct ScoreAggregator {
    scorers: Vec<Box<dyn SignalScorer>>,
    weights: SignalWeights,
}

impl ScoreAggregator {
    pub fn new(scorers: Vec<Box<dyn SignalScorer>>, weights: SignalWeights) -> Self {
        Self { scorers, weights }
    }

    fn weight_for(&self, kind: SignalKind) -> f64 {
        match kind {
            SignalKind::Sharpness => self.weights.sharpness,
            SignalKind::Composition => self.weights.composition,
            SignalKind::Emotion => self.weights.emotion,
            SignalKind::Action => self.weights.action,
            SignalKind::Duplicate => self.weights.duplicate,
        }
    }

    /// Score one image with every configured signal.
    ///
    /// A failing signal is logged and degrades to 0 with no tags — one bad
    /// extractor never sinks the image or the batch.
    pub fn aggregate(&self, image: &AnalysisImage, ctx: &BatchContext) -> AggregatedScore {
        let mut scores = BTreeMap::new();
        let mut tags = BTreeSet::new();
        let mut final_score = 0.0;

        for scorer in &self.scorers {
            let kind = scorer.kind();
            let outcome = match scorer.score(image, ctx) {
                Ok(outcome) => outcome,
                Err(e) => {
                    tracing::warn!(
                        image_id = %image.image_id,
                        signal = %kind,
                        "Signal failed, degrading to 0: {e}"
                    );
                    crate::types::SignalOutcome::degraded()
                }
            };
            final_score += self.weight_for(kind) * outcome.value;
            scores.insert(kind, outcome.value);
            tags.extend(outcome.tags);
        }

        AggregatedScore {
            final_score,
            scores,
            tags: tags.into_iter().collect(),
        }
    }
}
