//! Per-image processing stages feeding the batch analysis.
//!
//! - **decode**: load and downscale images to the analysis dimension
//! - **ops**: grayscale plane math shared by scorers and features
//! - **fingerprint**: perceptual fingerprints for near-duplicate detection
//! - **features**: fixed-length feature vectors for similarity comparison

pub mod decode;
pub mod features;
pub mod fingerprint;
pub mod ops;

// Re-exports for convenient access
pub use decode::{AnalysisImage, ImageDecoder};
pub use features::{Detection, DetectionProvider, FeatureExtractor, FEATURE_DIM};
pub use fingerprint::{Fingerprint, Fingerprinter};
pub use ops::GrayBuffer;
