//! Core data types for the Photosift analysis pipeline.
//!
//! These types form the persisted results document: per-image records,
//! duplicate groups, and the batch-level metadata wrapper.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::scoring::SignalKind;

/// One signal's output for one image: a bounded value plus tags.
///
/// Computed once per phase per image and immutable afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalOutcome {
    /// Score in [0, 1]; every scorer clamps before returning.
    pub value: f64,

    /// Zero or more descriptive tags ("sharp", "unique", ...).
    pub tags: Vec<String>,
}

impl SignalOutcome {
    /// Create an outcome, clamping the value into [0, 1].
    pub fn new(value: f64, tags: Vec<String>) -> Self {
        Self {
            value: value.clamp(0.0, 1.0),
            tags,
        }
    }

    /// The zero outcome used when a signal fails.
    pub fn degraded() -> Self {
        Self {
            value: 0.0,
            tags: Vec::new(),
        }
    }
}

/// The fully-scored record for one image in a batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageRecord {
    /// Image identifier, unique within the batch
    pub image_id: String,

    /// Weighted sum of all signal scores. Not clamped: when the configured
    /// weights do not sum to 1 the value may leave [0, 1].
    pub final_score: f64,

    /// Union of all signal tags, deduplicated, deterministic order
    pub tags: Vec<String>,

    /// Per-signal scores keyed by signal kind
    pub scores: BTreeMap<SignalKind, f64>,

    /// Dense 1-based rank assigned after the final sort.
    /// During phase 2 this holds the provisional processing-order rank.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rank: Option<u32>,

    /// Optional diagnostic attributes (raw variances, percentile standing, ...)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug_info: Option<BTreeMap<String, serde_json::Value>>,
}

/// A set of images judged to depict the same moment.
///
/// The first image is the recommended keep. Group ids are sequence indices
/// for one run and are not stable across re-runs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DuplicateGroup {
    pub group_id: usize,

    /// Member ids in batch processing order; first = recommended keep
    pub images: Vec<String>,

    pub count: usize,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub recommended_keep: Option<String>,
}

impl DuplicateGroup {
    pub fn new(group_id: usize, images: Vec<String>) -> Self {
        let count = images.len();
        let recommended_keep = images.first().cloned();
        Self {
            group_id,
            images,
            count,
            recommended_keep,
        }
    }
}

/// Counts summarizing one batch's duplicate analysis.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DuplicateSummary {
    /// Candidate groups produced by fingerprint grouping
    pub hash_groups: usize,

    /// Candidate groups produced by feature-similarity grouping
    pub feature_groups: usize,

    /// Candidate groups produced by density clustering
    pub cluster_groups: usize,

    /// Total images that belong to some merged group
    pub total_duplicates: usize,

    /// Images not in any group, plus one representative per group
    pub unique_images: usize,
}

/// The duplicate section of the results document: merged groups plus
/// human-readable recommendations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DuplicateReport {
    pub summary: DuplicateSummary,
    pub groups: Vec<DuplicateGroup>,
    pub recommendations: Vec<String>,
}

/// Batch-level metadata attached to the final results document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchMetadata {
    /// Number of successfully analyzed images (skipped decodes excluded)
    pub total_images: usize,

    /// Identifier of the scoring scheme that produced the document
    pub scoring_method: String,

    pub duplicate_summary: DuplicateSummary,
}

/// The persisted output of one analysis run.
///
/// Partial snapshots written during phase 2 carry only `upload_id` and
/// `images`; metadata and the duplicate report appear once the run
/// finalizes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultsDocument {
    pub upload_id: String,

    pub images: Vec<ImageRecord>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<BatchMetadata>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub duplicate_report: Option<DuplicateReport>,
}

impl ResultsDocument {
    /// A partial snapshot: records scored so far, no metadata or report yet.
    pub fn partial(upload_id: impl Into<String>, images: Vec<ImageRecord>) -> Self {
        Self {
            upload_id: upload_id.into(),
            images,
            metadata: None,
            duplicate_report: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signal_outcome_clamps() {
        assert_eq!(SignalOutcome::new(1.7, vec![]).value, 1.0);
        assert_eq!(SignalOutcome::new(-0.2, vec![]).value, 0.0);
        assert_eq!(SignalOutcome::new(0.42, vec![]).value, 0.42);
    }

    #[test]
    fn test_duplicate_group_recommends_first() {
        let group = DuplicateGroup::new(0, vec!["a.jpg".into(), "b.jpg".into()]);
        assert_eq!(group.count, 2);
        assert_eq!(group.recommended_keep.as_deref(), Some("a.jpg"));
    }

    #[test]
    fn test_partial_document_skips_absent_sections() {
        let doc = ResultsDocument::partial("upload-1", vec![]);
        let json = serde_json::to_string(&doc).unwrap();
        assert!(!json.contains("metadata"));
        assert!(!json.contains("duplicate_report"));
    }

    #[test]
    fn test_image_record_serializes_scores_by_kind() {
        let mut scores = BTreeMap::new();
        scores.insert(SignalKind::Sharpness, 0.9);
        scores.insert(SignalKind::Duplicate, 1.0);
        let record = ImageRecord {
            image_id: "img.jpg".into(),
            final_score: 0.5,
            tags: vec!["sharp".into()],
            scores,
            rank: Some(1),
            debug_info: None,
        };
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"sharpness\":0.9"));
        assert!(json.contains("\"duplicate\":1.0"));
        assert!(json.contains("\"rank\":1"));
        assert!(!json.contains("debug_info"));
    }
}
