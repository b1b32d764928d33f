//! Multi-strategy duplicate grouping.
//!
//! Three independent producers propose candidate groups — fingerprint
//! Hamming grouping, feature cosine-similarity grouping behind a validation
//! gate, and optional density clustering — and a union-find merge folds
//! overlapping candidates into pairwise-disjoint final groups.

use std::collections::HashMap;

use crate::analysis::BatchContext;
use crate::config::DuplicateConfig;
use crate::math::{cosine_similarity, mean, standardize_columns};
use crate::types::{DuplicateGroup, DuplicateSummary};

use super::cluster::dbscan_cosine;
use super::union_find::UnionFind;

/// Every pair in a validated feature group must be at least this similar.
const VALIDATION_MIN_SIMILARITY: f64 = 0.99;

/// A validated feature group's mean pairwise similarity floor.
const VALIDATION_AVG_SIMILARITY: f64 = 0.995;

/// Max fingerprint distance tolerated inside a validated feature group.
const VALIDATION_MAX_HASH_DISTANCE: u32 = 5;

/// Loose similarity chains blow up beyond this size; reject them.
const VALIDATION_MAX_GROUP_SIZE: usize = 4;

/// The detector's output: merged groups plus producer counts.
#[derive(Debug, Clone)]
pub struct GroupingOutcome {
    pub groups: Vec<DuplicateGroup>,
    pub summary: DuplicateSummary,
}

/// Runs all enabled grouping strategies over one batch's context.
pub struct DuplicateDetector {
    config: DuplicateConfig,
}

impl DuplicateDetector {
    pub fn new(config: DuplicateConfig) -> Self {
        Self { config }
    }

    /// Group the batch. Call once, after every image has been collected.
    pub fn analyze(&self, ctx: &BatchContext) -> GroupingOutcome {
        let ids = ctx.processed_ids();

        let hash_candidates = if self.config.enable_hash_comparison {
            self.candidates_by_fingerprint(ids, ctx)
        } else {
            Vec::new()
        };
        let feature_candidates = if self.config.enable_feature_comparison {
            self.candidates_by_features(ids, ctx)
        } else {
            Vec::new()
        };
        let cluster_candidates = if self.config.enable_clustering {
            self.candidates_by_clustering(ids, ctx)
        } else {
            Vec::new()
        };

        tracing::debug!(
            hash = hash_candidates.len(),
            feature = feature_candidates.len(),
            cluster = cluster_candidates.len(),
            "Candidate duplicate groups produced"
        );

        let all: Vec<Vec<String>> = hash_candidates
            .iter()
            .chain(feature_candidates.iter())
            .chain(cluster_candidates.iter())
            .cloned()
            .collect();
        let groups = merge_candidate_groups(ids, &all);

        let total_duplicates: usize = groups.iter().map(|g| g.count).sum();
        let collapsed: usize = groups.iter().map(|g| g.count - 1).sum();
        let summary = DuplicateSummary {
            hash_groups: hash_candidates.len(),
            feature_groups: feature_candidates.len(),
            cluster_groups: cluster_candidates.len(),
            total_duplicates,
            unique_images: ctx.processed_count() - collapsed,
        };

        GroupingOutcome { groups, summary }
    }

    /// Single-link grouping by fingerprint Hamming distance.
    ///
    /// Seeded as a union-find over every pairwise judgment, so two images
    /// within the threshold always share a group — directly or through a
    /// chain of intermediates — and no image lands in two groups.
    fn candidates_by_fingerprint(&self, ids: &[String], ctx: &BatchContext) -> Vec<Vec<String>> {
        let mut uf = UnionFind::new(ids.len());
        for i in 0..ids.len() {
            let Some(anchor) = ctx.fingerprint_of(&ids[i]) else {
                continue;
            };
            for j in (i + 1)..ids.len() {
                let Some(other) = ctx.fingerprint_of(&ids[j]) else {
                    continue;
                };
                // None means mismatched lengths: infinitely distant
                if let Some(distance) = anchor.distance(other) {
                    if distance <= self.config.hash_threshold {
                        uf.union(i, j);
                    }
                }
            }
        }

        let mut components: HashMap<usize, Vec<usize>> = HashMap::new();
        for i in 0..ids.len() {
            components.entry(uf.find(i)).or_default().push(i);
        }
        let mut groups: Vec<Vec<usize>> = components
            .into_values()
            .filter(|members| members.len() > 1)
            .collect();
        for members in &mut groups {
            members.sort_unstable();
        }
        groups.sort_by_key(|members| members[0]);
        groups
            .into_iter()
            .map(|members| members.into_iter().map(|i| ids[i].clone()).collect())
            .collect()
    }

    /// Greedy grouping by cosine similarity, validated per candidate group.
    fn candidates_by_features(&self, ids: &[String], ctx: &BatchContext) -> Vec<Vec<String>> {
        if ids.len() < 2 {
            return Vec::new();
        }
        let features: Vec<&[f32]> = ids
            .iter()
            .map(|id| ctx.features_of(id).unwrap_or(&[]))
            .collect();

        let n = ids.len();
        let mut similarity = vec![vec![0.0f64; n]; n];
        for i in 0..n {
            for j in i..n {
                let sim = cosine_similarity(features[i], features[j]);
                similarity[i][j] = sim;
                similarity[j][i] = sim;
            }
        }

        let mut candidates = Vec::new();
        let mut assigned = vec![false; n];

        for i in 0..n {
            if assigned[i] {
                continue;
            }
            let mut group = vec![i];
            for j in (i + 1)..n {
                if assigned[j] {
                    continue;
                }
                if similarity[i][j] >= self.config.min_duplicate_similarity {
                    group.push(j);
                }
            }
            if group.len() > 1 && self.validate_feature_group(&group, &similarity, ids, ctx) {
                for &member in &group {
                    assigned[member] = true;
                }
                candidates.push(group.into_iter().map(|k| ids[k].clone()).collect());
            }
        }
        candidates
    }

    /// Near-duplicate means *every* pair is close, not just a chain through
    /// the anchor; the gate also cross-checks fingerprints and caps size.
    fn validate_feature_group(
        &self,
        group: &[usize],
        similarity: &[Vec<f64>],
        ids: &[String],
        ctx: &BatchContext,
    ) -> bool {
        let mut pairwise = Vec::new();
        for (a, &i) in group.iter().enumerate() {
            for &j in group.iter().skip(a + 1) {
                pairwise.push(similarity[i][j]);
            }
        }
        let min_sim = pairwise.iter().copied().fold(f64::MAX, f64::min);
        if min_sim < VALIDATION_MIN_SIMILARITY || mean(&pairwise) < VALIDATION_AVG_SIMILARITY {
            tracing::debug!(min_sim, "Rejecting feature group on pairwise similarity");
            return false;
        }

        let fingerprints: Vec<_> = group
            .iter()
            .filter_map(|&i| ctx.fingerprint_of(&ids[i]))
            .collect();
        if fingerprints.len() == group.len() {
            for (a, fp_a) in fingerprints.iter().enumerate() {
                for fp_b in fingerprints.iter().skip(a + 1) {
                    match fp_a.distance(fp_b) {
                        Some(d) if d <= VALIDATION_MAX_HASH_DISTANCE => {}
                        _ => {
                            tracing::debug!("Rejecting feature group on fingerprint distance");
                            return false;
                        }
                    }
                }
            }
        }

        if group.len() > VALIDATION_MAX_GROUP_SIZE {
            tracing::debug!(size = group.len(), "Rejecting oversized feature group");
            return false;
        }

        true
    }

    /// DBSCAN over standardized feature vectors with cosine distance.
    fn candidates_by_clustering(&self, ids: &[String], ctx: &BatchContext) -> Vec<Vec<String>> {
        if ids.len() < 2 {
            return Vec::new();
        }
        let mut matrix: Vec<Vec<f32>> = ids
            .iter()
            .map(|id| ctx.features_of(id).map(|f| f.to_vec()).unwrap_or_default())
            .collect();
        standardize_columns(&mut matrix);

        let labels = dbscan_cosine(
            &matrix,
            self.config.clustering_eps,
            self.config.min_samples,
        );

        let mut clusters: HashMap<usize, Vec<String>> = HashMap::new();
        for (i, label) in labels.iter().enumerate() {
            if let Some(cluster) = label {
                clusters.entry(*cluster).or_default().push(ids[i].clone());
            }
        }
        let mut candidates: Vec<Vec<String>> =
            clusters.into_values().filter(|c| c.len() > 1).collect();
        // Deterministic producer order: by first member's batch position
        let position: HashMap<&str, usize> = ids
            .iter()
            .enumerate()
            .map(|(i, id)| (id.as_str(), i))
            .collect();
        candidates.sort_by_key(|c| position[c[0].as_str()]);
        candidates
    }
}

/// Merge candidate groups by connectivity into pairwise-disjoint groups.
///
/// Members are ordered by batch processing position, so the recommended
/// keep is always the earliest-encountered image of the merged set.
pub(crate) fn merge_candidate_groups(
    ids: &[String],
    candidates: &[Vec<String>],
) -> Vec<DuplicateGroup> {
    let position: HashMap<&str, usize> = ids
        .iter()
        .enumerate()
        .map(|(i, id)| (id.as_str(), i))
        .collect();

    let mut uf = UnionFind::new(ids.len());
    for group in candidates {
        let mut members = group.iter().filter_map(|id| position.get(id.as_str()));
        if let Some(&first) = members.next() {
            for &member in members {
                uf.union(first, member);
            }
        }
    }

    let mut components: HashMap<usize, Vec<usize>> = HashMap::new();
    for i in 0..ids.len() {
        components.entry(uf.find(i)).or_default().push(i);
    }

    let mut merged: Vec<Vec<usize>> = components
        .into_values()
        .filter(|members| members.len() > 1)
        .collect();
    for members in &mut merged {
        members.sort_unstable();
    }
    merged.sort_by_key(|members| members[0]);

    merged
        .into_iter()
        .enumerate()
        .map(|(group_id, members)| {
            DuplicateGroup::new(
                group_id,
                members.into_iter().map(|i| ids[i].clone()).collect(),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{Fingerprinter, ImageDecoder};

    fn decode(id: &str, seed: u32) -> crate::pipeline::AnalysisImage {
        let img = image::RgbImage::from_fn(64, 64, |x, y| {
            let v = ((x * seed + y * (seed * 3 + 1)) % 256) as u8;
            image::Rgb([v, v.wrapping_add(40), 255 - v])
        });
        let mut bytes = Vec::new();
        image::DynamicImage::ImageRgb8(img)
            .write_to(
                &mut std::io::Cursor::new(&mut bytes),
                image::ImageFormat::Png,
            )
            .unwrap();
        ImageDecoder::decode_sync(id, bytes, 1600).unwrap()
    }

    /// Context with hand-picked feature vectors; fingerprints come from the
    /// named seed so identical seeds are Hamming-identical.
    fn context(entries: &[(&str, u32, Vec<f32>)]) -> BatchContext {
        let fp = Fingerprinter::new();
        let mut ctx = BatchContext::new("batch");
        for (id, seed, features) in entries {
            let image = decode(id, *seed);
            ctx.record_image(id, 500.0, fp.fingerprint(&image.rgb), features.clone());
        }
        ctx
    }

    fn ids(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_identical_pair_groups_with_unrelated_third() {
        let ctx = context(&[
            ("a.jpg", 7, vec![1.0, 0.0, 0.0]),
            ("b.jpg", 7, vec![1.0, 0.0, 0.0]),
            ("c.jpg", 151, vec![0.0, 1.0, 0.0]),
        ]);
        let outcome = DuplicateDetector::new(Default::default()).analyze(&ctx);
        assert_eq!(outcome.groups.len(), 1);
        let group = &outcome.groups[0];
        assert_eq!(group.images, ids(&["a.jpg", "b.jpg"]));
        assert_eq!(group.recommended_keep.as_deref(), Some("a.jpg"));
        assert_eq!(outcome.summary.total_duplicates, 2);
        assert_eq!(outcome.summary.unique_images, 2);
    }

    #[test]
    fn test_disabled_producers_find_nothing() {
        let ctx = context(&[
            ("a.jpg", 7, vec![1.0, 0.0]),
            ("b.jpg", 7, vec![1.0, 0.0]),
        ]);
        let config = crate::config::DuplicateConfig {
            enable_hash_comparison: false,
            enable_feature_comparison: false,
            enable_clustering: false,
            ..Default::default()
        };
        let outcome = DuplicateDetector::new(config).analyze(&ctx);
        assert!(outcome.groups.is_empty());
        assert_eq!(outcome.summary.unique_images, 2);
    }

    #[test]
    fn test_validation_rejects_chained_group() {
        // a~b and a~c are above the gather threshold but b~c is loose, so
        // the all-pairs gate rejects the candidate.
        let cos = 0.992f64;
        let sin = (1.0 - cos * cos).sqrt();
        let ctx = context(&[
            ("a.jpg", 7, vec![1.0, 0.0]),
            ("b.jpg", 7, vec![cos as f32, sin as f32]),
            ("c.jpg", 7, vec![cos as f32, -sin as f32]),
        ]);
        let config = crate::config::DuplicateConfig {
            enable_hash_comparison: false,
            ..Default::default()
        };
        let outcome = DuplicateDetector::new(config).analyze(&ctx);
        assert!(outcome.groups.is_empty());
        assert_eq!(outcome.summary.feature_groups, 0);
    }

    #[test]
    fn test_validation_rejects_oversized_group() {
        let entries: Vec<(String, u32, Vec<f32>)> = (0..5)
            .map(|i| (format!("img{i}.jpg"), 7u32, vec![1.0f32, 0.0]))
            .collect();
        let borrowed: Vec<(&str, u32, Vec<f32>)> = entries
            .iter()
            .map(|(id, seed, f)| (id.as_str(), *seed, f.clone()))
            .collect();
        let ctx = context(&borrowed);
        let config = crate::config::DuplicateConfig {
            enable_hash_comparison: false,
            ..Default::default()
        };
        let outcome = DuplicateDetector::new(config).analyze(&ctx);
        assert_eq!(outcome.summary.feature_groups, 0);
        assert!(outcome.groups.is_empty());
    }

    #[test]
    fn test_fingerprint_chaining_links_transitively() {
        // a-b and b-c are within the threshold, a-c is not; single-link
        // still puts all three in one group.
        use crate::pipeline::Fingerprint;
        let base = vec![0u8; 24];
        let mut near = base.clone();
        near[0] = 0b0000_0011;
        let mut far = base.clone();
        far[0] = 0b0000_1111;

        let mut ctx = BatchContext::new("batch");
        ctx.record_image("a.jpg", 100.0, Fingerprint::from_bits(base), vec![1.0, 0.0]);
        ctx.record_image("b.jpg", 100.0, Fingerprint::from_bits(near), vec![0.0, 1.0]);
        ctx.record_image("c.jpg", 100.0, Fingerprint::from_bits(far), vec![1.0, 1.0]);

        let config = crate::config::DuplicateConfig {
            enable_feature_comparison: false,
            ..Default::default()
        };
        let outcome = DuplicateDetector::new(config).analyze(&ctx);
        assert_eq!(outcome.groups.len(), 1);
        assert_eq!(outcome.groups[0].images, ids(&["a.jpg", "b.jpg", "c.jpg"]));
        assert_eq!(outcome.groups[0].recommended_keep.as_deref(), Some("a.jpg"));
    }

    #[test]
    fn test_merge_unions_overlapping_candidates() {
        let all = ids(&["a", "b", "c", "d", "e"]);
        let candidates = vec![ids(&["a", "b"]), ids(&["b", "c"]), ids(&["d", "e"])];
        let merged = merge_candidate_groups(&all, &candidates);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].images, ids(&["a", "b", "c"]));
        assert_eq!(merged[1].images, ids(&["d", "e"]));
        assert_eq!(merged[0].group_id, 0);
        assert_eq!(merged[1].group_id, 1);
    }

    #[test]
    fn test_merged_groups_are_disjoint() {
        let all = ids(&["a", "b", "c", "d", "e", "f"]);
        let candidates = vec![
            ids(&["a", "c"]),
            ids(&["c", "e"]),
            ids(&["b", "d"]),
            ids(&["e", "a"]),
        ];
        let merged = merge_candidate_groups(&all, &candidates);
        let mut seen = std::collections::HashSet::new();
        for group in &merged {
            for image in &group.images {
                assert!(seen.insert(image.clone()), "{image} appears twice");
            }
        }
    }

    #[test]
    fn test_merge_keeps_batch_order_for_recommended_keep() {
        let all = ids(&["first", "second", "third"]);
        // Candidate listed out of batch order still recommends the earliest
        let candidates = vec![ids(&["third", "first"])];
        let merged = merge_candidate_groups(&all, &candidates);
        assert_eq!(merged[0].recommended_keep.as_deref(), Some("first"));
    }

    #[test]
    fn test_clustering_producer_groups_tight_vectors() {
        let ctx = context(&[
            ("a.jpg", 7, vec![1.0, 0.0, 0.0]),
            ("b.jpg", 9, vec![1.0, 0.001, 0.0]),
            ("c.jpg", 151, vec![0.0, 1.0, 0.0]),
        ]);
        let config = crate::config::DuplicateConfig {
            enable_hash_comparison: false,
            enable_feature_comparison: false,
            enable_clustering: true,
            clustering_eps: 0.5,
            min_samples: 2,
            ..Default::default()
        };
        let outcome = DuplicateDetector::new(config).analyze(&ctx);
        assert_eq!(outcome.summary.cluster_groups, outcome.groups.len());
    }
}
