//! Caller-facing job API.
//!
//! [`AnalysisService`] validates the video URL, registers a PENDING job and
//! hands the orchestration to a supervised task set. Callers then poll
//! [`AnalysisService::get_job_status`] until the job reaches a terminal
//! state.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{error, info, warn};

use crate::analysis::{EvidenceRetriever, LlmClaimExtractor, PerspectiveAnalyzer};
use crate::config::Config;
use crate::error::{AppError, AppResult, JobError, PipelineError, ValidationError};
use crate::jobs::{JobStatus, JobStore, JobUpdate};
use crate::llm::build_completion_provider;
use crate::models::AnalysisResponse;
use crate::pipeline::Pipeline;
use crate::search::GoogleSearchClient;
use crate::transcript::{extract_video_id, FileTranscriptSource};

/// Job state as seen by a caller.
///
/// `result` is set only for completed jobs and `error` only for failed ones.
/// Both are always serialized, as `null` when unset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobStatusResponse {
    pub job_id: String,
    pub status: JobStatus,
    pub result: Option<AnalysisResponse>,
    pub error: Option<String>,
}

impl JobStatusResponse {
    /// `Err(AppError::JobFailed)` when the job failed, `Ok` otherwise.
    pub fn check(&self) -> AppResult<()> {
        if self.status != JobStatus::Failed {
            return Ok(());
        }
        Err(AppError::JobFailed {
            job_id: self.job_id.clone(),
            message: self
                .error
                .clone()
                .unwrap_or_else(|| "Unknown error".to_string()),
        })
    }
}

/// Entry point for creating and observing analysis jobs.
pub struct AnalysisService {
    store: JobStore,
    pipeline: Arc<Pipeline>,
    tasks: Mutex<JoinSet<()>>,
    reaper: JoinHandle<()>,
}

impl AnalysisService {
    /// Wrap `pipeline` and start the reaper for its store.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(pipeline: Pipeline, reap_interval: Duration) -> Self {
        let store = pipeline.store().clone();
        let reaper = store.spawn_reaper(reap_interval);
        Self {
            store,
            pipeline: Arc::new(pipeline),
            tasks: Mutex::new(JoinSet::new()),
            reaper,
        }
    }

    /// Wire up the production collaborators from configuration.
    pub fn from_config(config: &Config) -> AppResult<Self> {
        let llm = build_completion_provider(&config.llm, config.request.clone())?;
        let search = Arc::new(GoogleSearchClient::new(&config.search)?);
        let store = JobStore::new(Duration::from_secs(config.jobs.retention_secs));

        let pipeline = Pipeline::new(
            Arc::new(FileTranscriptSource::new(config.transcripts.dir.clone())),
            Arc::new(LlmClaimExtractor::new(llm.clone())),
            EvidenceRetriever::from_config(search, &config.search),
            PerspectiveAnalyzer::new(llm),
            store,
        )
        .with_max_claims(config.jobs.max_claims);

        Ok(Self::new(
            pipeline,
            Duration::from_secs(config.jobs.reap_interval_secs),
        ))
    }

    /// Validate `video_url`, register a PENDING job and schedule its analysis.
    ///
    /// Returns as soon as the job is registered.
    pub async fn create_job(&self, video_url: &str) -> Result<String, ValidationError> {
        let video_id = extract_video_id(video_url)?;
        let job_id = self.store.create(&video_id).await;

        let pipeline = Arc::clone(&self.pipeline);
        let store = self.store.clone();
        let task_job_id = job_id.clone();

        let mut tasks = self.tasks.lock().await;
        while let Some(finished) = tasks.try_join_next() {
            if let Err(e) = finished {
                warn!(error = %e, "Analysis task ended abnormally");
            }
        }
        tasks.spawn(async move {
            let outcome = AssertUnwindSafe(pipeline.run(&task_job_id, &video_id))
                .catch_unwind()
                .await;
            if let Err(panic) = outcome {
                let err = PipelineError::Panicked {
                    message: panic_message(panic.as_ref()),
                };
                error!(job_id = %task_job_id, error = %err, "Analysis task panicked");
                store
                    .advance(&task_job_id, JobUpdate::Failed(err.to_string()))
                    .await;
            }
        });

        info!(job_id = %job_id, "Analysis job scheduled");
        Ok(job_id)
    }

    /// Current state of a job.
    pub async fn get_job_status(&self, job_id: &str) -> Result<JobStatusResponse, JobError> {
        let job = self.store.get(job_id).await?;
        Ok(JobStatusResponse {
            job_id: job.id,
            status: job.status,
            result: job.result.as_ref().map(AnalysisResponse::from),
            error: job.error,
        })
    }

    /// Poll until `job_id` is terminal.
    pub async fn wait_for_job(
        &self,
        job_id: &str,
        poll_interval: Duration,
    ) -> Result<JobStatusResponse, JobError> {
        loop {
            let status = self.get_job_status(job_id).await?;
            if status.status.is_terminal() {
                return Ok(status);
            }
            tokio::time::sleep(poll_interval).await;
        }
    }

    /// Stop the reaper and wait for in-flight analyses to finish.
    pub async fn shutdown(&self) {
        self.reaper.abort();
        let mut tasks = self.tasks.lock().await;
        while let Some(finished) = tasks.join_next().await {
            if let Err(e) = finished {
                warn!(error = %e, "Analysis task ended abnormally during shutdown");
            }
        }
        info!("Analysis service stopped");
    }
}

impl Drop for AnalysisService {
    fn drop(&mut self) {
        self.reaper.abort();
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
