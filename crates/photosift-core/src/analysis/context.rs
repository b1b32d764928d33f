//! Per-run batch state.
//!
//! A `BatchContext` is created fresh at the start of every analysis run and
//! owns everything phase 2 needs from phase 1: buffered sharpness
//! magnitudes, fingerprints, feature vectors, and (after grouping) the
//! merged duplicate groups. Building a new context per run is what
//! guarantees no cross-batch state leaks into grouping or normalization.

use std::collections::HashMap;

use crate::pipeline::Fingerprint;
use crate::types::DuplicateGroup;

/// Where an image sits within its merged duplicate group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupPosition {
    /// 0-based index within the group; 0 is the recommended keep
    pub position: usize,

    /// Total member count of the group
    pub size: usize,
}

/// Accumulated phase-1 state for one batch run.
#[derive(Default)]
pub struct BatchContext {
    batch_id: String,

    /// Successfully decoded image ids in processing order
    processed: Vec<String>,

    /// Raw sharpness magnitude per image
    magnitudes: HashMap<String, f64>,

    fingerprints: HashMap<String, Fingerprint>,

    features: HashMap<String, Vec<f32>>,

    /// Merged duplicate groups, set once grouping has run
    groups: Vec<DuplicateGroup>,

    /// Image id -> position within its merged group
    positions: HashMap<String, GroupPosition>,
}

impl BatchContext {
    pub fn new(batch_id: impl Into<String>) -> Self {
        Self {
            batch_id: batch_id.into(),
            ..Default::default()
        }
    }

    pub fn batch_id(&self) -> &str {
        &self.batch_id
    }

    /// Record one decoded image's phase-1 signals, in processing order.
    pub fn record_image(
        &mut self,
        image_id: &str,
        magnitude: f64,
        fingerprint: Fingerprint,
        features: Vec<f32>,
    ) {
        self.processed.push(image_id.to_string());
        self.magnitudes.insert(image_id.to_string(), magnitude);
        self.fingerprints.insert(image_id.to_string(), fingerprint);
        self.features.insert(image_id.to_string(), features);
    }

    /// Ids of all successfully processed images, in processing order.
    pub fn processed_ids(&self) -> &[String] {
        &self.processed
    }

    pub fn processed_count(&self) -> usize {
        self.processed.len()
    }

    pub fn magnitude_of(&self, image_id: &str) -> Option<f64> {
        self.magnitudes.get(image_id).copied()
    }

    /// All valid (> 0) magnitudes, in processing order.
    pub fn valid_magnitudes(&self) -> Vec<f64> {
        self.processed
            .iter()
            .filter_map(|id| self.magnitudes.get(id))
            .copied()
            .filter(|m| *m > 0.0)
            .collect()
    }

    pub fn fingerprint_of(&self, image_id: &str) -> Option<&Fingerprint> {
        self.fingerprints.get(image_id)
    }

    pub fn features_of(&self, image_id: &str) -> Option<&[f32]> {
        self.features.get(image_id).map(|f| f.as_slice())
    }

    /// Install the merged duplicate groups and index member positions.
    pub fn set_groups(&mut self, groups: Vec<DuplicateGroup>) {
        self.positions.clear();
        for group in &groups {
            for (position, image_id) in group.images.iter().enumerate() {
                self.positions.insert(
                    image_id.clone(),
                    GroupPosition {
                        position,
                        size: group.count,
                    },
                );
            }
        }
        self.groups = groups;
    }

    pub fn groups(&self) -> &[DuplicateGroup] {
        &self.groups
    }

    /// The image's standing within its merged group, if it is in one.
    pub fn group_position(&self, image_id: &str) -> Option<GroupPosition> {
        self.positions.get(image_id).copied()
    }
}
