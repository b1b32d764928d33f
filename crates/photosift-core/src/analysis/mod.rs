//! The two-phase batch analysis orchestrator.
//!
//! Phase 1 ("collecting") decodes every image in order and buffers its raw
//! sharpness magnitude, fingerprint, and feature vector into a fresh
//! [`BatchContext`]. Duplicate grouping then runs over the whole batch.
//! Phase 2 ("scoring") revisits each loaded image with the full scorer set,
//! persisting a partial snapshot after every image so pollers see output
//! before completion. The phases are strictly sequential: percentiles and
//! the duplicate graph need the complete batch.

pub mod context;
pub mod report;

pub use context::{BatchContext, GroupPosition};
pub use report::build_duplicate_report;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::json;

use crate::config::Config;
use crate::duplicate::DuplicateDetector;
use crate::error::{AnalysisError, JobError, Result, SiftError};
use crate::jobs::{Job, JobTracker};
use crate::pipeline::{AnalysisImage, FeatureExtractor, Fingerprinter, ImageDecoder};
use crate::scoring::sharpness::SharpnessScorer;
use crate::scoring::{scorer_set, ScoreAggregator};
use crate::storage::{ResultsStore, Storage};
use crate::types::{BatchMetadata, ImageRecord, ResultsDocument};

/// Identifier of the scoring scheme written into results metadata.
const SCORING_METHOD: &str = "percentile_based_with_duplicates";

/// Progress share of the collecting phase; scoring takes the rest up to 1.0.
const COLLECT_BAND: f64 = 0.3;
const SCORE_BAND: f64 = 0.6;

/// Drives analysis runs and owns the job tracker updates for them.
pub struct Analyzer {
    storage: Arc<dyn Storage>,
    results: Arc<dyn ResultsStore>,
    jobs: JobTracker,
    config: Config,
    decoder: ImageDecoder,
    fingerprinter: Fingerprinter,
    features: FeatureExtractor,
    detector: DuplicateDetector,
    aggregator: ScoreAggregator,
    sharpness: SharpnessScorer,
}

impl Analyzer {
    pub fn new(config: Config, storage: Arc<dyn Storage>, results: Arc<dyn ResultsStore>) -> Self {
        let decoder = ImageDecoder::new(config.limits.clone());
        let detector = DuplicateDetector::new(config.duplicates.clone());
        let aggregator = ScoreAggregator::new(scorer_set(&config), config.scoring.weights.clone());
        let sharpness = SharpnessScorer::new(config.sharpness.clone());
        Self {
            storage,
            results,
            jobs: JobTracker::new(),
            config,
            decoder,
            fingerprinter: Fingerprinter::new(),
            features: FeatureExtractor::new(),
            detector,
            aggregator,
            sharpness,
        }
    }

    /// Use an externally supplied feature extractor (e.g. one wired to an
    /// object detection plugin).
    pub fn with_feature_extractor(mut self, features: FeatureExtractor) -> Self {
        self.features = features;
        self
    }

    pub fn jobs(&self) -> &JobTracker {
        &self.jobs
    }

    /// Register a queued job for a batch.
    pub fn create_job(&self, job_id: &str, batch_id: &str) -> std::result::Result<Job, JobError> {
        self.jobs.create(job_id, batch_id)
    }

    /// Poll a job's current state.
    pub fn job(&self, job_id: &str) -> std::result::Result<Job, JobError> {
        self.jobs.get(job_id)
    }

    /// Read the current (partial or final) results document for a batch.
    pub async fn results(
        &self,
        batch_id: &str,
    ) -> std::result::Result<ResultsDocument, AnalysisError> {
        self.results.read(batch_id).await
    }

    /// Execute a job end to end, absorbing the run boundary.
    ///
    /// Every outcome lands in the job tracker: an empty batch fails the job
    /// before it ever transitions to running, any error escaping the run
    /// marks it failed with the error's message, and success completes it
    /// at progress 1.0. Pollers only ever observe job states.
    pub async fn run_job(&self, job_id: &str, batch_id: &str) {
        let images = match self.storage.list_images(batch_id).await {
            Ok(images) => images,
            Err(e) => {
                tracing::error!(batch_id, "Listing batch failed: {e}");
                self.jobs.set_failed(job_id, &e.to_string());
                return;
            }
        };
        if images.is_empty() {
            let err = AnalysisError::EmptyBatch {
                batch_id: batch_id.to_string(),
            };
            self.jobs.set_failed(job_id, &err.to_string());
            return;
        }

        self.jobs.set_running(job_id);
        let tracker = self.jobs.clone();
        let tracked_job = job_id.to_string();
        let outcome = self
            .analyze_images(batch_id, images, Some(job_id), move |p| {
                tracker.set_progress(&tracked_job, p)
            })
            .await;

        match outcome {
            Ok(_) => self.jobs.set_completed(job_id),
            Err(e) => {
                tracing::error!(batch_id, job_id, "Analysis run failed: {e}");
                self.jobs.set_failed(job_id, &e.to_string());
            }
        }
    }

    /// Run analysis directly, without a job. Progress values in [0, 1] are
    /// reported through the callback.
    pub async fn analyze_batch(
        &self,
        batch_id: &str,
        progress: impl FnMut(f64),
    ) -> Result<ResultsDocument> {
        let images = self.storage.list_images(batch_id).await?;
        if images.is_empty() {
            return Err(AnalysisError::EmptyBatch {
                batch_id: batch_id.to_string(),
            }
            .into());
        }
        self.analyze_images(batch_id, images, None, progress).await
    }

    /// The two-phase pipeline over a non-empty image list.
    async fn analyze_images(
        &self,
        batch_id: &str,
        images: Vec<String>,
        job_id: Option<&str>,
        mut progress: impl FnMut(f64),
    ) -> Result<ResultsDocument> {
        let deadline = match self.config.limits.max_run_seconds {
            0 => None,
            seconds => Some(Instant::now() + Duration::from_secs(seconds)),
        };

        // Fresh per-run state: nothing from a previous batch can leak into
        // percentiles or grouping.
        let mut ctx = BatchContext::new(batch_id);
        let total = images.len();
        let mut loaded: Vec<AnalysisImage> = Vec::new();

        tracing::info!(batch_id, total, "Collecting batch");
        for (i, image_id) in images.iter().enumerate() {
            self.check_interrupt(batch_id, job_id, deadline)?;
            match self.load_image(batch_id, image_id).await {
                Ok(image) => {
                    let magnitude = SharpnessScorer::collect_magnitude(&image);
                    let fingerprint = self.fingerprinter.fingerprint(&image.rgb);
                    let features = self.features.extract(&image);
                    ctx.record_image(image_id, magnitude, fingerprint, features);
                    loaded.push(image);
                }
                Err(e) => {
                    tracing::warn!(batch_id, %image_id, "Skipping image: {e}");
                }
            }
            progress((i + 1) as f64 / total as f64 * COLLECT_BAND);
        }

        let grouping = self.detector.analyze(&ctx);
        ctx.set_groups(grouping.groups.clone());
        tracing::info!(
            batch_id,
            loaded = loaded.len(),
            groups = grouping.groups.len(),
            "Collection complete, scoring"
        );

        let mut records: Vec<ImageRecord> = Vec::with_capacity(loaded.len());
        let loaded_count = loaded.len();
        for (i, image) in loaded.iter().enumerate() {
            self.check_interrupt(batch_id, job_id, deadline)?;

            let aggregated = self.aggregator.aggregate(image, &ctx);

            let mut debug_info = BTreeMap::new();
            debug_info.insert("content_hash".to_string(), json!(image.content_hash));
            debug_info.insert(
                "sharpness".to_string(),
                json!(self.sharpness.debug_info(image, &ctx)),
            );

            records.push(ImageRecord {
                image_id: image.image_id.clone(),
                final_score: aggregated.final_score,
                tags: aggregated.tags,
                scores: aggregated.scores,
                rank: Some((i + 1) as u32),
                debug_info: Some(debug_info),
            });

            progress(COLLECT_BAND + (i + 1) as f64 / loaded_count as f64 * SCORE_BAND);
            self.results.write_partial(batch_id, &records).await?;
        }

        let report = build_duplicate_report(&grouping, loaded_count);

        // Stable sort: ties keep their processing order
        records.sort_by(|a, b| {
            b.final_score
                .partial_cmp(&a.final_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        for (i, record) in records.iter_mut().enumerate() {
            record.rank = Some((i + 1) as u32);
        }

        let document = ResultsDocument {
            upload_id: batch_id.to_string(),
            images: records,
            metadata: Some(BatchMetadata {
                total_images: loaded_count,
                scoring_method: SCORING_METHOD.to_string(),
                duplicate_summary: grouping.summary.clone(),
            }),
            duplicate_report: Some(report),
        };
        self.results.write_final(batch_id, &document).await?;
        progress(1.0);

        tracing::info!(batch_id, total_images = loaded_count, "Analysis complete");
        Ok(document)
    }

    async fn load_image(&self, batch_id: &str, image_id: &str) -> Result<AnalysisImage> {
        let bytes = self.storage.read_image(batch_id, image_id).await?;
        Ok(self.decoder.decode(image_id, bytes).await?)
    }

    fn check_interrupt(
        &self,
        batch_id: &str,
        job_id: Option<&str>,
        deadline: Option<Instant>,
    ) -> Result<()> {
        if let Some(job_id) = job_id {
            if self.jobs.cancel_requested(job_id) {
                return Err(SiftError::Analysis(AnalysisError::Cancelled {
                    batch_id: batch_id.to_string(),
                }));
            }
        }
        if let Some(deadline) = deadline {
            if Instant::now() >= deadline {
                return Err(SiftError::Analysis(AnalysisError::DeadlineExceeded {
                    batch_id: batch_id.to_string(),
                    seconds: self.config.limits.max_run_seconds,
                }));
            }
        }
        Ok(())
    }
}
