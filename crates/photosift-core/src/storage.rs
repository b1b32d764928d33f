//! Storage collaborators: image sources and results persistence.
//!
//! Both seams are async traits so the orchestrator can run against the
//! filesystem, an object store, or an in-memory double in tests. The
//! filesystem results store replaces snapshots atomically via a temp-file
//! rename — at-least-once persistence with one writer per batch.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::config::Config;
use crate::error::AnalysisError;
use crate::types::{ImageRecord, ResultsDocument};

/// Source of batch image listings and encoded image bytes.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Ordered image ids for a batch. An empty list means an empty batch.
    async fn list_images(&self, batch_id: &str) -> Result<Vec<String>, AnalysisError>;

    /// Encoded bytes for one image. A failure here is a per-image skip.
    async fn read_image(&self, batch_id: &str, image_id: &str)
        -> Result<Vec<u8>, AnalysisError>;

    /// Where the image lives, for diagnostics and serving.
    fn path_for(&self, batch_id: &str, image_id: &str) -> PathBuf;
}

/// Sink for partial and final results documents.
#[async_trait]
pub trait ResultsStore: Send + Sync {
    /// Overwrite the batch's snapshot with the records scored so far.
    async fn write_partial(
        &self,
        batch_id: &str,
        records: &[ImageRecord],
    ) -> Result<(), AnalysisError>;

    /// Overwrite the batch's snapshot with the final document.
    async fn write_final(
        &self,
        batch_id: &str,
        document: &ResultsDocument,
    ) -> Result<(), AnalysisError>;

    /// Read the current document for a batch.
    async fn read(&self, batch_id: &str) -> Result<ResultsDocument, AnalysisError>;
}

/// Filesystem storage: one directory per batch under the uploads root.
pub struct FsStorage {
    uploads_dir: PathBuf,
    extensions: Vec<String>,
}

impl FsStorage {
    pub fn new(uploads_dir: PathBuf, extensions: Vec<String>) -> Self {
        let extensions = extensions.into_iter().map(|e| e.to_lowercase()).collect();
        Self {
            uploads_dir,
            extensions,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.uploads_dir(),
            config.storage.supported_extensions.clone(),
        )
    }

    fn is_image(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| self.extensions.iter().any(|known| known == &e.to_lowercase()))
            .unwrap_or(false)
    }
}

#[async_trait]
impl Storage for FsStorage {
    async fn list_images(&self, batch_id: &str) -> Result<Vec<String>, AnalysisError> {
        let batch_dir = self.uploads_dir.join(batch_id);
        if !batch_dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut images: Vec<String> = walkdir::WalkDir::new(&batch_dir)
            .max_depth(1)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file() && self.is_image(entry.path()))
            .filter_map(|entry| entry.file_name().to_str().map(|s| s.to_string()))
            .collect();
        images.sort();
        Ok(images)
    }

    async fn read_image(
        &self,
        batch_id: &str,
        image_id: &str,
    ) -> Result<Vec<u8>, AnalysisError> {
        tokio::fs::read(self.path_for(batch_id, image_id))
            .await
            .map_err(|e| AnalysisError::Storage {
                batch_id: batch_id.to_string(),
                message: format!("read {image_id}: {e}"),
            })
    }

    fn path_for(&self, batch_id: &str, image_id: &str) -> PathBuf {
        self.uploads_dir.join(batch_id).join(image_id)
    }
}

/// Filesystem results store: `<results_dir>/<batch_id>.json`.
pub struct FsResultsStore {
    results_dir: PathBuf,
}

impl FsResultsStore {
    pub fn new(results_dir: PathBuf) -> Self {
        Self { results_dir }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.results_dir())
    }

    fn document_path(&self, batch_id: &str) -> PathBuf {
        self.results_dir.join(format!("{batch_id}.json"))
    }

    /// Serialize and atomically replace the batch's document.
    async fn write_document(
        &self,
        batch_id: &str,
        document: &ResultsDocument,
    ) -> Result<(), AnalysisError> {
        let storage_err = |message: String| AnalysisError::Storage {
            batch_id: batch_id.to_string(),
            message,
        };

        tokio::fs::create_dir_all(&self.results_dir)
            .await
            .map_err(|e| storage_err(format!("create results dir: {e}")))?;

        let json = serde_json::to_vec_pretty(document)
            .map_err(|e| storage_err(format!("serialize results: {e}")))?;

        let final_path = self.document_path(batch_id);
        let tmp_path = self.results_dir.join(format!("{batch_id}.json.tmp"));
        tokio::fs::write(&tmp_path, json)
            .await
            .map_err(|e| storage_err(format!("write snapshot: {e}")))?;
        tokio::fs::rename(&tmp_path, &final_path)
            .await
            .map_err(|e| storage_err(format!("replace snapshot: {e}")))?;
        Ok(())
    }
}

#[async_trait]
impl ResultsStore for FsResultsStore {
    async fn write_partial(
        &self,
        batch_id: &str,
        records: &[ImageRecord],
    ) -> Result<(), AnalysisError> {
        let snapshot = ResultsDocument::partial(batch_id, records.to_vec());
        self.write_document(batch_id, &snapshot).await
    }

    async fn write_final(
        &self,
        batch_id: &str,
        document: &ResultsDocument,
    ) -> Result<(), AnalysisError> {
        self.write_document(batch_id, document).await
    }

    async fn read(&self, batch_id: &str) -> Result<ResultsDocument, AnalysisError> {
        let path = self.document_path(batch_id);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(AnalysisError::ResultsNotFound {
                    batch_id: batch_id.to_string(),
                })
            }
            Err(e) => {
                return Err(AnalysisError::Storage {
                    batch_id: batch_id.to_string(),
                    message: format!("read results: {e}"),
                })
            }
        };
        serde_json::from_slice(&bytes).map_err(|e| AnalysisError::Storage {
            batch_id: batch_id.to_string(),
            message: format!("parse results: {e}"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_png(path: &Path) {
        let img = image::DynamicImage::new_rgb8(8, 8);
        img.save_with_format(path, image::ImageFormat::Png).unwrap();
    }

    #[tokio::test]
    async fn test_list_images_sorted_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        let batch = dir.path().join("batch-1");
        std::fs::create_dir_all(&batch).unwrap();
        write_png(&batch.join("b.png"));
        write_png(&batch.join("a.jpg"));
        std::fs::write(batch.join("notes.txt"), "not an image").unwrap();

        let storage = FsStorage::new(dir.path().to_path_buf(), vec!["jpg".into(), "png".into()]);
        let images = storage.list_images("batch-1").await.unwrap();
        assert_eq!(images, vec!["a.jpg".to_string(), "b.png".to_string()]);
    }

    #[tokio::test]
    async fn test_list_images_missing_batch_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FsStorage::new(dir.path().to_path_buf(), vec!["jpg".into()]);
        assert!(storage.list_images("nope").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_read_image_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let batch = dir.path().join("batch-1");
        std::fs::create_dir_all(&batch).unwrap();
        write_png(&batch.join("a.png"));

        let storage = FsStorage::new(dir.path().to_path_buf(), vec!["png".into()]);
        let bytes = storage.read_image("batch-1", "a.png").await.unwrap();
        assert!(!bytes.is_empty());
        assert!(storage.read_image("batch-1", "missing.png").await.is_err());
    }

    #[tokio::test]
    async fn test_results_round_trip_and_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsResultsStore::new(dir.path().join("results"));

        store.write_partial("batch-1", &[]).await.unwrap();
        let partial = store.read("batch-1").await.unwrap();
        assert!(partial.images.is_empty());
        assert!(partial.metadata.is_none());

        let document = ResultsDocument {
            upload_id: "batch-1".into(),
            images: vec![],
            metadata: Some(crate::types::BatchMetadata {
                total_images: 0,
                scoring_method: "percentile_based_with_duplicates".into(),
                duplicate_summary: Default::default(),
            }),
            duplicate_report: None,
        };
        store.write_final("batch-1", &document).await.unwrap();
        let read_back = store.read("batch-1").await.unwrap();
        assert!(read_back.metadata.is_some());
    }

    #[tokio::test]
    async fn test_read_missing_results_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsResultsStore::new(dir.path().join("results"));
        assert!(matches!(
            store.read("nope").await,
            Err(AnalysisError::ResultsNotFound { .. })
        ));
    }
}
