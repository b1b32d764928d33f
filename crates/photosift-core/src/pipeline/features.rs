//! Fixed-length feature vectors for duplicate similarity comparison.
//!
//! A vector is the concatenation of a detection summary block (top-K
//! detected objects, zero-filled when the provider yields nothing) and a
//! statistical descriptor block, so every vector in a batch has the same
//! dimensionality and stays comparable under cosine similarity.

use std::sync::Arc;

use super::decode::AnalysisImage;
use super::ops::{self, Region};

/// Detections summarized per object slot: x1, y1, x2, y2, confidence,
/// class, area, center-x, center-y, aspect ratio.
const VALUES_PER_DETECTION: usize = 10;

/// Number of top-confidence detections summarized.
const TOP_K_DETECTIONS: usize = 5;

/// Length of the detection summary block.
pub const DETECTION_BLOCK_DIM: usize = TOP_K_DETECTIONS * VALUES_PER_DETECTION;

/// Length of the statistical descriptor block:
/// 9 grayscale stats + 3x16 channel histograms + 4 edge stats
/// + 2x2 block means/stds.
pub const STATISTICAL_BLOCK_DIM: usize = 9 + 3 * 16 + 4 + 8;

/// Total feature vector length.
pub const FEATURE_DIM: usize = DETECTION_BLOCK_DIM + STATISTICAL_BLOCK_DIM;

/// One detected object with a normalized bounding box.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    /// Normalized [x1, y1, x2, y2] in [0, 1]
    pub bbox: [f32; 4],

    pub confidence: f32,

    pub class_id: f32,
}

/// Seam for an external object detector. The default configuration carries
/// none, in which case the detection block is zero and similarity rests on
/// the statistical descriptor alone.
pub trait DetectionProvider: Send + Sync {
    fn detect(&self, image: &AnalysisImage) -> Vec<Detection>;
}

/// Extracts comparable feature vectors from analysis images.
#[derive(Default)]
pub struct FeatureExtractor {
    detector: Option<Arc<dyn DetectionProvider>>,
}

impl FeatureExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_detector(detector: Arc<dyn DetectionProvider>) -> Self {
        Self {
            detector: Some(detector),
        }
    }

    /// Compute the feature vector for one image. Always `FEATURE_DIM` long.
    pub fn extract(&self, image: &AnalysisImage) -> Vec<f32> {
        let detections = self
            .detector
            .as_ref()
            .map(|d| d.detect(image))
            .unwrap_or_default();

        let mut features = Vec::with_capacity(FEATURE_DIM);
        features.extend_from_slice(&detection_block(&detections));
        features.extend_from_slice(&statistical_block(image));
        debug_assert_eq!(features.len(), FEATURE_DIM);
        features
    }
}

/// Summarize the top-K detections by confidence into a fixed block.
fn detection_block(detections: &[Detection]) -> [f32; DETECTION_BLOCK_DIM] {
    let mut block = [0.0f32; DETECTION_BLOCK_DIM];

    let mut ranked: Vec<&Detection> = detections.iter().collect();
    ranked.sort_by(|a, b| {
        a.confidence
            .partial_cmp(&b.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    let top: Vec<&Detection> = ranked
        .into_iter()
        .rev()
        .take(TOP_K_DETECTIONS)
        .collect();

    // Lowest-confidence slot first, matching the stable slot layout
    for (slot, det) in top.iter().rev().enumerate() {
        let [x1, y1, x2, y2] = det.bbox;
        let width = x2 - x1;
        let height = y2 - y1;
        let values = [
            x1,
            y1,
            x2,
            y2,
            det.confidence,
            det.class_id,
            width * height,
            (x1 + x2) / 2.0,
            (y1 + y2) / 2.0,
            if height > 0.0 { width / height } else { 0.0 },
        ];
        block[slot * VALUES_PER_DETECTION..(slot + 1) * VALUES_PER_DETECTION]
            .copy_from_slice(&values);
    }
    block
}

/// Statistical descriptor of grayscale, color, edge, and regional structure.
fn statistical_block(image: &AnalysisImage) -> Vec<f32> {
    let gray = &image.gray;
    let mut features = Vec::with_capacity(STATISTICAL_BLOCK_DIM);

    let pixels: Vec<f64> = gray.pixels().iter().map(|v| f64::from(*v)).collect();
    let mut sorted = pixels.clone();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let min = sorted.first().copied().unwrap_or(0.0);
    let max = sorted.last().copied().unwrap_or(0.0);
    let mean = crate::math::mean(&pixels);
    let std = crate::math::std_dev(&pixels);
    let median = crate::math::percentile(&pixels, 50.0);
    let p25 = crate::math::percentile(&pixels, 25.0);
    let p75 = crate::math::percentile(&pixels, 75.0);
    let unique_levels = {
        let mut seen = [false; 256];
        for v in gray.pixels() {
            seen[(*v as i64).clamp(0, 255) as usize] = true;
        }
        seen.iter().filter(|s| **s).count() as f64
    };
    for v in [mean, std, min, max, median, p25, p75, std * std, unique_levels] {
        features.push(v as f32);
    }

    for channel in 0..3 {
        features.extend_from_slice(&ops::channel_histogram(&image.rgb, channel));
    }

    let magnitude = gray.sobel_magnitude();
    let edges: Vec<f32> = magnitude
        .iter()
        .map(|m| if *m > 150.0 { 255.0 } else { 0.0 })
        .collect();
    let edge_sum: f64 = edges.iter().map(|v| f64::from(*v)).sum();
    let edge_mean = if edges.is_empty() {
        0.0
    } else {
        edge_sum / edges.len() as f64
    };
    let edge_std = ops::variance(&edges).sqrt();
    features.push(edge_sum as f32);
    features.push(edge_mean as f32);
    features.push(edge_std as f32);
    features.push(gray.laplacian_variance() as f32);

    let half_w = gray.width / 2;
    let half_h = gray.height / 2;
    for row in 0..2u32 {
        for col in 0..2u32 {
            let region = Region::new(
                col * half_w,
                row * half_h,
                if col == 0 { half_w } else { gray.width - half_w },
                if row == 0 { half_h } else { gray.height - half_h },
            );
            let (m, s) = gray.region_mean_std(region);
            features.push(m as f32);
            features.push(s as f32);
        }
    }

    debug_assert_eq!(features.len(), STATISTICAL_BLOCK_DIM);
    features
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::decode::ImageDecoder;

    fn decode_test_image(seed: u8) -> AnalysisImage {
        let img = image::RgbImage::from_fn(48, 32, |x, y| {
            let v = ((x + y) as u32 * u32::from(seed) % 256) as u8;
            image::Rgb([v, v / 2, 255 - v])
        });
        let mut bytes = Vec::new();
        image::DynamicImage::ImageRgb8(img)
            .write_to(
                &mut std::io::Cursor::new(&mut bytes),
                image::ImageFormat::Png,
            )
            .unwrap();
        ImageDecoder::decode_sync(&format!("img-{seed}.png"), bytes, 1600).unwrap()
    }

    struct FixedDetections(Vec<Detection>);

    impl DetectionProvider for FixedDetections {
        fn detect(&self, _image: &AnalysisImage) -> Vec<Detection> {
            self.0.clone()
        }
    }

    #[test]
    fn test_feature_dim_without_detector() {
        let extractor = FeatureExtractor::new();
        let features = extractor.extract(&decode_test_image(3));
        assert_eq!(features.len(), FEATURE_DIM);
        // Detection block is all zeros when no provider is configured
        assert!(features[..DETECTION_BLOCK_DIM].iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_feature_dim_with_detector() {
        let detection = Detection {
            bbox: [0.1, 0.2, 0.5, 0.8],
            confidence: 0.9,
            class_id: 2.0,
        };
        let extractor =
            FeatureExtractor::with_detector(Arc::new(FixedDetections(vec![detection])));
        let features = extractor.extract(&decode_test_image(3));
        assert_eq!(features.len(), FEATURE_DIM);
        assert!(features[..DETECTION_BLOCK_DIM].iter().any(|v| *v != 0.0));
    }

    #[test]
    fn test_identical_images_identical_features() {
        let extractor = FeatureExtractor::new();
        let a = extractor.extract(&decode_test_image(5));
        let b = extractor.extract(&decode_test_image(5));
        assert_eq!(a, b);
    }

    #[test]
    fn test_different_images_differ() {
        let extractor = FeatureExtractor::new();
        let a = extractor.extract(&decode_test_image(5));
        let b = extractor.extract(&decode_test_image(11));
        assert_ne!(a, b);
    }

    #[test]
    fn test_detection_block_caps_at_top_k() {
        let many: Vec<Detection> = (0..8)
            .map(|i| Detection {
                bbox: [0.0, 0.0, 0.5, 0.5],
                confidence: i as f32 / 10.0,
                class_id: i as f32,
            })
            .collect();
        let block = detection_block(&many);
        // Eight detections offered, only five slots filled
        let filled = block
            .chunks(VALUES_PER_DETECTION)
            .filter(|chunk| chunk.iter().any(|v| *v != 0.0))
            .count();
        assert_eq!(filled, TOP_K_DETECTIONS);
    }
}
