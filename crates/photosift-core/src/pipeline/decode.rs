//! Image decoding with downscaling to the analysis dimension.
//!
//! Decode failures are per-image events: the orchestrator logs and skips the
//! image, the batch keeps going.

use image::imageops::FilterType;
use image::{GenericImageView, RgbImage};
use std::path::PathBuf;

use crate::config::LimitsConfig;
use crate::error::PipelineError;

use super::ops::GrayBuffer;

/// A decoded image ready for analysis: RGB pixels plus a cached grayscale
/// plane, downscaled so the longest edge fits the configured bound.
#[derive(Debug)]
pub struct AnalysisImage {
    /// Image identifier within its batch
    pub image_id: String,

    /// BLAKE3 hash of the original encoded bytes
    pub content_hash: String,

    pub rgb: RgbImage,

    pub gray: GrayBuffer,
}

impl AnalysisImage {
    pub fn width(&self) -> u32 {
        self.rgb.width()
    }

    pub fn height(&self) -> u32 {
        self.rgb.height()
    }
}

/// Decoder with configurable analysis bounds.
pub struct ImageDecoder {
    limits: LimitsConfig,
}

impl ImageDecoder {
    pub fn new(limits: LimitsConfig) -> Self {
        Self { limits }
    }

    /// Decode an image from its encoded bytes on the blocking pool.
    pub async fn decode(
        &self,
        image_id: &str,
        bytes: Vec<u8>,
    ) -> Result<AnalysisImage, PipelineError> {
        let id = image_id.to_string();
        let max_dimension = self.limits.analysis_max_dimension;
        tokio::task::spawn_blocking(move || Self::decode_sync(&id, bytes, max_dimension))
            .await
            .map_err(|e| PipelineError::Decode {
                path: PathBuf::from(image_id),
                message: format!("Task join error: {}", e),
            })?
    }

    /// Synchronous decode (runs in spawn_blocking).
    pub fn decode_sync(
        image_id: &str,
        bytes: Vec<u8>,
        max_dimension: u32,
    ) -> Result<AnalysisImage, PipelineError> {
        use std::io::Cursor;

        let content_hash = blake3::hash(&bytes).to_hex().to_string();

        let reader = image::ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| PipelineError::Decode {
                path: PathBuf::from(image_id),
                message: format!("Cannot detect image format: {}", e),
            })?;
        if reader.format().is_none() {
            return Err(PipelineError::UnsupportedFormat {
                path: PathBuf::from(image_id),
                format: "unknown".to_string(),
            });
        }
        let mut decoded = reader.decode().map_err(|e| PipelineError::Decode {
            path: PathBuf::from(image_id),
            message: e.to_string(),
        })?;

        let (width, height) = decoded.dimensions();
        if width.max(height) > max_dimension {
            decoded = decoded.resize(max_dimension, max_dimension, FilterType::Lanczos3);
        }

        let rgb = decoded.to_rgb8();
        let gray = GrayBuffer::from_rgb(&rgb);

        Ok(AnalysisImage {
            image_id: image_id.to_string(),
            content_hash,
            rgb,
            gray,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode_png(width: u32, height: u32) -> Vec<u8> {
        let img = image::DynamicImage::new_rgb8(width, height);
        let mut bytes = Vec::new();
        img.write_to(
            &mut std::io::Cursor::new(&mut bytes),
            image::ImageFormat::Png,
        )
        .unwrap();
        bytes
    }

    #[test]
    fn test_decode_sync_keeps_small_dimensions() {
        let bytes = encode_png(100, 60);
        let decoded = ImageDecoder::decode_sync("a.png", bytes, 1600).unwrap();
        assert_eq!(decoded.width(), 100);
        assert_eq!(decoded.height(), 60);
        assert_eq!(decoded.image_id, "a.png");
        assert!(!decoded.content_hash.is_empty());
    }

    #[test]
    fn test_decode_sync_downscales_longest_edge() {
        let bytes = encode_png(400, 200);
        let decoded = ImageDecoder::decode_sync("b.png", bytes, 100).unwrap();
        assert_eq!(decoded.width(), 100);
        assert_eq!(decoded.height(), 50);
    }

    #[test]
    fn test_decode_sync_rejects_garbage() {
        let err = ImageDecoder::decode_sync("junk.bin", vec![0u8; 64], 1600).unwrap_err();
        match err {
            PipelineError::Decode { .. } | PipelineError::UnsupportedFormat { .. } => {}
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_identical_bytes_identical_content_hash() {
        let bytes = encode_png(32, 32);
        let a = ImageDecoder::decode_sync("a.png", bytes.clone(), 1600).unwrap();
        let b = ImageDecoder::decode_sync("b.png", bytes, 1600).unwrap();
        assert_eq!(a.content_hash, b.content_hash);
    }

    #[tokio::test]
    async fn test_decode_async_wrapper() {
        let decoder = ImageDecoder::new(LimitsConfig::default());
        let decoded = decoder.decode("c.png", encode_png(64, 64)).await.unwrap();
        assert_eq!(decoded.width(), 64);
    }
}
