//! Job tracking for asynchronous analysis runs.
//!
//! One worker mutates a job while any number of pollers read it, so each
//! entry sits behind its own reader/writer lock; entries for different jobs
//! never contend. Jobs are created, mutated by the run that owns them, and
//! read until the process exits — the tracker never deletes.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};

use crate::error::JobError;

/// Lifecycle of one analysis run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Running,
    Completed,
    Failed,
}

/// One in-flight or finished analysis run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub job_id: String,

    pub batch_id: String,

    pub status: JobStatus,

    /// Monotonically non-decreasing within a run; exactly 1.0 on completion
    pub progress: f64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Cooperative cancellation flag, checked at per-image boundaries
    #[serde(skip)]
    pub cancel_requested: bool,
}

type Entry = Arc<RwLock<Job>>;

/// Concurrent map from job id to job state.
#[derive(Clone, Default)]
pub struct JobTracker {
    jobs: Arc<RwLock<HashMap<String, Entry>>>,
}

fn read_lock<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn write_lock<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl JobTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new queued job. Job ids are caller-supplied unique
    /// tokens; an existing id is an error, never an overwrite.
    pub fn create(&self, job_id: &str, batch_id: &str) -> Result<Job, JobError> {
        let mut jobs = write_lock(&self.jobs);
        if jobs.contains_key(job_id) {
            return Err(JobError::AlreadyExists(job_id.to_string()));
        }
        let job = Job {
            job_id: job_id.to_string(),
            batch_id: batch_id.to_string(),
            status: JobStatus::Queued,
            progress: 0.0,
            error: None,
            cancel_requested: false,
        };
        jobs.insert(job_id.to_string(), Arc::new(RwLock::new(job.clone())));
        Ok(job)
    }

    /// Snapshot a job for a poller.
    pub fn get(&self, job_id: &str) -> Result<Job, JobError> {
        let entry = self.entry(job_id)?;
        let snapshot = read_lock(&entry).clone();
        Ok(snapshot)
    }

    pub fn set_running(&self, job_id: &str) {
        self.mutate(job_id, |job| {
            job.status = JobStatus::Running;
        });
    }

    /// Advance progress. Regressions are logic errors in the caller; they
    /// are debug-asserted and clamped so pollers never observe a decrease.
    pub fn set_progress(&self, job_id: &str, progress: f64) {
        self.mutate(job_id, |job| {
            debug_assert!(
                progress + 1e-9 >= job.progress,
                "progress regression: {} -> {}",
                job.progress,
                progress
            );
            job.progress = job.progress.max(progress.clamp(0.0, 1.0));
        });
    }

    pub fn set_completed(&self, job_id: &str) {
        self.mutate(job_id, |job| {
            job.status = JobStatus::Completed;
            job.progress = 1.0;
        });
    }

    pub fn set_failed(&self, job_id: &str, message: &str) {
        self.mutate(job_id, |job| {
            job.status = JobStatus::Failed;
            job.error = Some(message.to_string());
        });
    }

    /// Ask the owning worker to stop at its next per-image boundary.
    pub fn request_cancel(&self, job_id: &str) -> Result<(), JobError> {
        let entry = self.entry(job_id)?;
        write_lock(&entry).cancel_requested = true;
        Ok(())
    }

    pub fn cancel_requested(&self, job_id: &str) -> bool {
        self.entry(job_id)
            .map(|entry| read_lock(&entry).cancel_requested)
            .unwrap_or(false)
    }

    fn entry(&self, job_id: &str) -> Result<Entry, JobError> {
        read_lock(&self.jobs)
            .get(job_id)
            .cloned()
            .ok_or_else(|| JobError::NotFound(job_id.to_string()))
    }

    fn mutate(&self, job_id: &str, f: impl FnOnce(&mut Job)) {
        match self.entry(job_id) {
            Ok(entry) => f(&mut write_lock(&entry)),
            Err(_) => {
                tracing::error!(job_id, "Mutation of unknown job ignored");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_starts_queued() {
        let tracker = JobTracker::new();
        let job = tracker.create("job-1", "batch-1").unwrap();
        assert_eq!(job.status, JobStatus::Queued);
        assert_eq!(job.progress, 0.0);
        assert!(job.error.is_none());
    }

    #[test]
    fn test_create_refuses_duplicate_id() {
        let tracker = JobTracker::new();
        tracker.create("job-1", "batch-1").unwrap();
        let err = tracker.create("job-1", "batch-2").unwrap_err();
        assert!(matches!(err, JobError::AlreadyExists(_)));
        // The original job is untouched
        assert_eq!(tracker.get("job-1").unwrap().batch_id, "batch-1");
    }

    #[test]
    fn test_get_unknown_job() {
        let tracker = JobTracker::new();
        assert!(matches!(
            tracker.get("missing"),
            Err(JobError::NotFound(_))
        ));
    }

    #[test]
    fn test_lifecycle_transitions() {
        let tracker = JobTracker::new();
        tracker.create("job-1", "batch-1").unwrap();
        tracker.set_running("job-1");
        assert_eq!(tracker.get("job-1").unwrap().status, JobStatus::Running);
        tracker.set_progress("job-1", 0.5);
        tracker.set_completed("job-1");
        let job = tracker.get("job-1").unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.progress, 1.0);
    }

    #[test]
    fn test_failed_carries_message() {
        let tracker = JobTracker::new();
        tracker.create("job-1", "batch-1").unwrap();
        tracker.set_running("job-1");
        tracker.set_failed("job-1", "No images found for batch batch-1");
        let job = tracker.get("job-1").unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(
            job.error.as_deref(),
            Some("No images found for batch batch-1")
        );
    }

    #[test]
    fn test_progress_never_regresses_for_pollers() {
        let tracker = JobTracker::new();
        tracker.create("job-1", "batch-1").unwrap();
        tracker.set_progress("job-1", 0.6);
        // A release-build regression is clamped away
        if !cfg!(debug_assertions) {
            tracker.set_progress("job-1", 0.4);
        }
        assert!(tracker.get("job-1").unwrap().progress >= 0.6);
    }

    #[test]
    fn test_cancel_flag_round_trip() {
        let tracker = JobTracker::new();
        tracker.create("job-1", "batch-1").unwrap();
        assert!(!tracker.cancel_requested("job-1"));
        tracker.request_cancel("job-1").unwrap();
        assert!(tracker.cancel_requested("job-1"));
        assert!(tracker.request_cancel("missing").is_err());
    }

    #[test]
    fn test_concurrent_pollers_and_writer() {
        let tracker = JobTracker::new();
        tracker.create("job-1", "batch-1").unwrap();
        let writer = {
            let tracker = tracker.clone();
            std::thread::spawn(move || {
                for i in 0..=100 {
                    tracker.set_progress("job-1", f64::from(i) / 100.0);
                }
                tracker.set_completed("job-1");
            })
        };
        let reader = {
            let tracker = tracker.clone();
            std::thread::spawn(move || {
                let mut last = 0.0f64;
                for _ in 0..200 {
                    let job = tracker.get("job-1").unwrap();
                    assert!(job.progress + 1e-9 >= last);
                    last = job.progress;
                }
            })
        };
        writer.join().unwrap();
        reader.join().unwrap();
        assert_eq!(tracker.get("job-1").unwrap().progress, 1.0);
    }
}
