use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{Job, JobStatus, JobUpdate};
use crate::error::JobError;

/// Result of [`JobStore::advance`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvanceOutcome {
    /// The job moved to the requested state.
    Applied,
    /// No job with that id exists (never created, or already reaped).
    Missing,
    /// The transition would move the job backwards or out of a terminal state.
    Rejected,
}

/// In-memory job map guarded by a single lock.
///
/// Every read and write goes through the one `RwLock`, so a reader never
/// observes a job with its status, result and error out of step.
#[derive(Clone)]
pub struct JobStore {
    jobs: Arc<RwLock<HashMap<String, Job>>>,
    retention: chrono::Duration,
}

impl JobStore {
    /// Create an empty store whose jobs expire `retention` after creation.
    pub fn new(retention: Duration) -> Self {
        Self {
            jobs: Arc::new(RwLock::new(HashMap::new())),
            retention: chrono::Duration::from_std(retention)
                .unwrap_or_else(|_| chrono::Duration::hours(1)),
        }
    }

    /// Insert a new PENDING job and return its id.
    pub async fn create(&self, video_id: &str) -> String {
        let job = Job {
            id: Uuid::new_v4().to_string(),
            video_id: video_id.to_string(),
            status: JobStatus::Pending,
            result: None,
            error: None,
            created_at: Utc::now(),
        };
        let id = job.id.clone();

        self.jobs.write().await.insert(id.clone(), job);
        debug!(job_id = %id, video_id = %video_id, "Job created");
        id
    }

    /// Apply `update` to a job.
    ///
    /// Writes to an unknown id are ignored, so an orchestration task whose
    /// job was reaped keeps running harmlessly.
    pub async fn advance(&self, job_id: &str, update: JobUpdate) -> AdvanceOutcome {
        let mut jobs = self.jobs.write().await;
        let Some(job) = jobs.get_mut(job_id) else {
            debug!(job_id = %job_id, "Ignoring update for missing job");
            return AdvanceOutcome::Missing;
        };

        let next = update.status();
        if !job.status.can_advance_to(next) {
            warn!(
                job_id = %job_id,
                from = %job.status,
                to = %next,
                "Rejected non-monotonic job transition"
            );
            return AdvanceOutcome::Rejected;
        }

        job.status = next;
        match update {
            JobUpdate::Processing => {}
            JobUpdate::Completed(result) => {
                job.result = Some(result);
                job.error = None;
            }
            JobUpdate::Failed(message) => {
                job.result = None;
                job.error = Some(if message.trim().is_empty() {
                    "Unknown error".to_string()
                } else {
                    message
                });
            }
        }
        AdvanceOutcome::Applied
    }

    /// Snapshot of a job.
    pub async fn get(&self, job_id: &str) -> Result<Job, JobError> {
        self.jobs
            .read()
            .await
            .get(job_id)
            .cloned()
            .ok_or_else(|| JobError::NotFound {
                job_id: job_id.to_string(),
            })
    }

    /// Number of jobs currently held.
    pub async fn len(&self) -> usize {
        self.jobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.jobs.read().await.is_empty()
    }

    /// Remove every job created more than the retention window before `now`,
    /// whatever its status. Returns how many were removed.
    pub async fn reap_expired(&self, now: DateTime<Utc>) -> usize {
        let cutoff = now - self.retention;
        let mut jobs = self.jobs.write().await;
        let before = jobs.len();
        jobs.retain(|_, job| job.created_at >= cutoff);
        before - jobs.len()
    }

    /// Run [`reap_expired`](Self::reap_expired) every `interval` until the
    /// returned handle is aborted.
    pub fn spawn_reaper(&self, interval: Duration) -> JoinHandle<()> {
        let store = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick completes immediately.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let removed = store.reap_expired(Utc::now()).await;
                if removed > 0 {
                    let remaining = store.len().await;
                    info!(removed, remaining, "Reaped expired jobs");
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AnalysisResult;

    fn store() -> JobStore {
        JobStore::new(Duration::from_secs(3600))
    }

    fn empty_result() -> AnalysisResult {
        AnalysisResult {
            video_id: "vid".to_string(),
            analyzed_at: Utc::now(),
            profiles: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_create_is_pending() {
        let store = store();
        let id = store.create("vid").await;
        let job = store.get(&id).await.unwrap();
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.video_id, "vid");
        assert!(job.result.is_none());
        assert!(job.error.is_none());

        let other = store.create("vid").await;
        assert_ne!(id, other);
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn test_get_unknown_is_not_found() {
        let err = store().get("nope").await.unwrap_err();
        assert_eq!(err.to_string(), "Job not found: nope");
    }

    #[tokio::test]
    async fn test_lifecycle_is_monotonic() {
        let store = store();
        let id = store.create("vid").await;

        assert_eq!(store.advance(&id, JobUpdate::Processing).await, AdvanceOutcome::Applied);
        assert_eq!(store.advance(&id, JobUpdate::Processing).await, AdvanceOutcome::Rejected);
        assert_eq!(
            store.advance(&id, JobUpdate::Completed(empty_result())).await,
            AdvanceOutcome::Applied
        );
        assert_eq!(
            store.advance(&id, JobUpdate::Failed("late".to_string())).await,
            AdvanceOutcome::Rejected
        );

        let job = store.get(&id).await.unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert!(job.result.is_some());
        assert!(job.error.is_none());
    }

    #[tokio::test]
    async fn test_failed_job_has_error_and_no_result() {
        let store = store();
        let id = store.create("vid").await;
        store.advance(&id, JobUpdate::Processing).await;
        store.advance(&id, JobUpdate::Failed("   ".to_string())).await;

        let job = store.get(&id).await.unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.error.as_deref(), Some("Unknown error"));
        assert!(job.result.is_none());
    }

    #[tokio::test]
    async fn test_advance_missing_job_is_ignored() {
        let store = store();
        assert_eq!(
            store.advance("ghost", JobUpdate::Failed("x".to_string())).await,
            AdvanceOutcome::Missing
        );
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_reap_expired_respects_retention() {
        let store = store();
        let id = store.create("vid").await;
        let created_at = store.get(&id).await.unwrap().created_at;

        assert_eq!(store.reap_expired(created_at + chrono::Duration::minutes(59)).await, 0);
        assert!(store.get(&id).await.is_ok());

        assert_eq!(store.reap_expired(created_at + chrono::Duration::minutes(61)).await, 1);
        assert!(store.get(&id).await.is_err());
        assert_eq!(
            store.advance(&id, JobUpdate::Processing).await,
            AdvanceOutcome::Missing
        );
    }

    #[tokio::test]
    async fn test_reap_ignores_status() {
        let store = store();
        let running = store.create("a").await;
        store.advance(&running, JobUpdate::Processing).await;
        store.create("b").await;

        let later = Utc::now() + chrono::Duration::hours(2);
        assert_eq!(store.reap_expired(later).await, 2);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_spawned_reaper_evicts_jobs() {
        let store = JobStore::new(Duration::from_millis(0));
        let id = store.create("vid").await;

        let handle = store.spawn_reaper(Duration::from_millis(20));
        tokio::time::sleep(Duration::from_millis(100)).await;
        handle.abort();

        assert!(store.get(&id).await.is_err());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_reaper_runs_on_worker_threads() {
        let store = JobStore::new(Duration::from_millis(0));
        for video in ["a", "b", "c"] {
            store.create(video).await;
        }

        let handle = store.spawn_reaper(Duration::from_millis(10));
        tokio::time::sleep(Duration::from_millis(80)).await;
        handle.abort();

        assert!(store.is_empty().await);
    }
}
