//! Perceptual fingerprints for near-duplicate detection.
//!
//! A fingerprint concatenates the bits of three perceptual hash algorithms
//! (gradient, double-gradient, mean). Visually similar images land within a
//! small Hamming distance; fingerprints of differing length never compare.

use image::RgbImage;
use image_hasher::{HashAlg, HasherConfig};

/// Fixed-length discrete code summarizing an image's coarse visual
/// structure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fingerprint {
    bits: Vec<u8>,
}

impl Fingerprint {
    /// Bitwise Hamming distance to another fingerprint.
    ///
    /// Returns `None` when the lengths differ — such fingerprints are
    /// treated as infinitely distant and never grouped.
    pub fn distance(&self, other: &Fingerprint) -> Option<u32> {
        if self.bits.len() != other.bits.len() {
            return None;
        }
        Some(
            self.bits
                .iter()
                .zip(other.bits.iter())
                .map(|(a, b)| (a ^ b).count_ones())
                .sum(),
        )
    }

    /// Total number of bits in the code.
    pub fn bit_len(&self) -> usize {
        self.bits.len() * 8
    }

    /// Test-only constructor for hand-built codes.
    #[cfg(test)]
    pub(crate) fn from_bits(bits: Vec<u8>) -> Self {
        Self { bits }
    }
}

/// Computes fingerprints with pre-configured hashers, avoiding per-image
/// `HasherConfig` allocation.
pub struct Fingerprinter {
    gradient: image_hasher::Hasher,
    double_gradient: image_hasher::Hasher,
    mean: image_hasher::Hasher,
}

impl Default for Fingerprinter {
    fn default() -> Self {
        Self::new()
    }
}

impl Fingerprinter {
    pub fn new() -> Self {
        let build = |alg: HashAlg| HasherConfig::new().hash_alg(alg).hash_size(8, 8).to_hasher();
        Self {
            gradient: build(HashAlg::Gradient),
            double_gradient: build(HashAlg::DoubleGradient),
            mean: build(HashAlg::Mean),
        }
    }

    /// Fingerprint an RGB image.
    pub fn fingerprint(&self, rgb: &RgbImage) -> Fingerprint {
        let mut bits = Vec::new();
        for hasher in [&self.gradient, &self.double_gradient, &self.mean] {
            bits.extend_from_slice(hasher.hash_image(rgb).as_bytes());
        }
        Fingerprint { bits }
    }
}
