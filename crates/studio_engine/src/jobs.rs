use std::future::Future;
use std::sync::mpsc;
use std::time::Duration;

use studio_core::{JobOutput, Ticket};
use studio_logging::{studio_debug, studio_info, studio_warn};
use tokio_util::sync::CancellationToken;

use crate::api::ApiClient;
use crate::types::{ApiError, EngineEvent, FailureKind};
use crate::wire::{value_text, JobStart, JobState, JobStatus};

#[derive(Debug, Clone, Copy)]
pub struct PollSettings {
    /// Wait before every status request, including the first.
    pub interval: Duration,
    /// Status requests allowed before giving up on a job.
    pub max_polls: u32,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(1000),
            max_polls: 3600,
        }
    }
}

pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: EngineEvent);
}

pub struct ChannelProgressSink {
    tx: mpsc::Sender<EngineEvent>,
}

impl ChannelProgressSink {
    pub fn new(tx: mpsc::Sender<EngineEvent>) -> Self {
        Self { tx }
    }
}

impl ProgressSink for ChannelProgressSink {
    fn emit(&self, event: EngineEvent) {
        let _ = self.tx.send(event);
    }
}

/// Source of job status snapshots.
#[async_trait::async_trait]
pub trait JobApi: Send + Sync {
    async fn job_status(&self, job_id: &str) -> Result<JobStatus, ApiError>;
}

#[async_trait::async_trait]
impl JobApi for ApiClient {
    async fn job_status(&self, job_id: &str) -> Result<JobStatus, ApiError> {
        self.get(&format!("api/job_status/{job_id}")).await
    }
}

/// Drives backend jobs to a terminal state.
#[derive(Debug, Clone, Default)]
pub struct JobClient {
    settings: PollSettings,
}

impl JobClient {
    pub fn new(settings: PollSettings) -> Self {
        Self { settings }
    }

    /// Single-request pattern: the response already is the final result.
    pub async fn request<F>(
        &self,
        request: F,
        cancel: &CancellationToken,
    ) -> Result<JobOutput, ApiError>
    where
        F: Future<Output = Result<JobOutput, ApiError>>,
    {
        cancel
            .run_until_cancelled(request)
            .await
            .unwrap_or_else(|| Err(ApiError::cancelled()))
    }

    /// Start-then-poll pattern. A failed start ends the job without polling.
    pub async fn run<F>(
        &self,
        api: &dyn JobApi,
        ticket: Ticket,
        start: F,
        sink: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<JobOutput, ApiError>
    where
        F: Future<Output = Result<JobStart, ApiError>>,
    {
        let start = cancel
            .run_until_cancelled(start)
            .await
            .unwrap_or_else(|| Err(ApiError::cancelled()))?;
        self.complete(api, ticket, start, sink, cancel).await
    }

    /// Polls until the job is done, failed, cancelled or out of polls.
    pub async fn complete(
        &self,
        api: &dyn JobApi,
        ticket: Ticket,
        start: JobStart,
        sink: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<JobOutput, ApiError> {
        let job_id = match start {
            JobStart::Cached(output) => {
                studio_info!("Ticket {} served from the backend cache", ticket);
                return Ok(output);
            }
            JobStart::Pending { job_id } => job_id,
        };

        for poll in 1..=self.settings.max_polls {
            if cancel
                .run_until_cancelled(tokio::time::sleep(self.settings.interval))
                .await
                .is_none()
            {
                studio_info!("Stopped polling job {} (ticket {})", job_id, ticket);
                return Err(ApiError::cancelled());
            }

            let status = cancel
                .run_until_cancelled(api.job_status(&job_id))
                .await
                .unwrap_or_else(|| Err(ApiError::cancelled()))?;
            studio_debug!("Job {} poll {}: {:?}", job_id, poll, status.status);

            match status.status {
                JobState::Done => {
                    return Ok(JobOutput {
                        text: value_text(status.result),
                        meta: status.meta,
                    });
                }
                JobState::Error => {
                    let message = status
                        .error
                        .filter(|message| !message.trim().is_empty())
                        .unwrap_or_else(|| "job failed".to_string());
                    studio_warn!("Job {} failed: {}", job_id, message);
                    return Err(ApiError::new(FailureKind::JobFailed, message));
                }
                JobState::Pending | JobState::Running | JobState::Unknown => {
                    sink.emit(EngineEvent::JobProgress {
                        ticket,
                        progress: status.progress,
                        eta_seconds: status.eta_seconds,
                    });
                }
            }
        }

        studio_warn!(
            "Job {} still unfinished after {} polls",
            job_id,
            self.settings.max_polls
        );
        Err(ApiError::new(
            FailureKind::PollLimitExceeded,
            format!("job still running after {} polls", self.settings.max_polls),
        ))
    }
}
