pub mod poll;
pub mod scheduler;

use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::backend::types::VideoJob;
use crate::backend::VideoBackend;
use crate::gallery::GalleryStore;
use crate::request::{GenerationMode, GenerationRequest};
use scheduler::Scheduler;

pub const DEFAULT_INITIAL_POLL_DELAY: Duration = Duration::from_secs(1);
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);
pub const DEFAULT_MAX_WAIT: Duration = Duration::from_secs(600); // 10 minutes

/// Timing of the poll loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollPolicy {
    /// Wait before the first poll, giving the backend time to register the job.
    pub initial_delay: Duration,
    /// Wait after each non-terminal response.
    pub interval: Duration,
    /// Total scheduled wait before giving up. `None` polls until a terminal status.
    pub max_wait: Option<Duration>,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            initial_delay: DEFAULT_INITIAL_POLL_DELAY,
            interval: DEFAULT_POLL_INTERVAL,
            max_wait: Some(DEFAULT_MAX_WAIT),
        }
    }
}

/// How a job ended. Every failure mode of the engine lands here; nothing is
/// propagated as an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum JobOutcome {
    Completed(VideoJob),
    /// The backend reported `failed`.
    Failed { job_id: String },
    /// The submission itself was rejected or never reached the backend.
    SubmitFailed { reason: String },
    /// A status query failed in transport or parsing.
    PollFailed { job_id: String, reason: String },
    TimedOut { job_id: String, waited_secs: u64 },
    Cancelled { job_id: Option<String> },
}

impl JobOutcome {
    pub fn job_id(&self) -> Option<&str> {
        match self {
            Self::Completed(job) => Some(&job.id),
            Self::Failed { job_id }
            | Self::PollFailed { job_id, .. }
            | Self::TimedOut { job_id, .. } => Some(job_id),
            Self::Cancelled { job_id } => job_id.as_deref(),
            Self::SubmitFailed { .. } => None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Completed(_))
    }

    /// Message shown to the user for anything other than success.
    pub fn failure_notice(&self) -> Option<String> {
        match self {
            Self::Completed(_) => None,
            Self::Failed { .. } => Some("Video generation failed. Please try again.".into()),
            Self::SubmitFailed { reason } => Some(format!("Could not start video generation: {reason}")),
            Self::PollFailed { reason, .. } => {
                Some(format!("Lost track of the video job: {reason}"))
            }
            Self::TimedOut { waited_secs, .. } => Some(format!(
                "Video generation did not finish within {waited_secs}s."
            )),
            Self::Cancelled { .. } => Some("Video generation cancelled.".into()),
        }
    }
}

/// Observable lifecycle of one submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum JobState {
    Idle,
    Submitting { mode: GenerationMode },
    Polling { job_id: String, attempts: u32 },
    Finished(JobOutcome),
}

impl JobState {
    pub fn is_generating(&self) -> bool {
        matches!(self, Self::Submitting { .. } | Self::Polling { .. })
    }
}

// ---------------------------------------------------------------------------
// PollEngine: submits a request and drives it to a terminal outcome
// ---------------------------------------------------------------------------

pub struct PollEngine {
    backend: Arc<dyn VideoBackend>,
    scheduler: Arc<dyn Scheduler>,
    gallery: Arc<GalleryStore>,
    policy: PollPolicy,
}

impl PollEngine {
    pub fn new(
        backend: Arc<dyn VideoBackend>,
        scheduler: Arc<dyn Scheduler>,
        gallery: Arc<GalleryStore>,
        policy: PollPolicy,
    ) -> Self {
        Self {
            backend,
            scheduler,
            gallery,
            policy,
        }
    }

    pub fn policy(&self) -> &PollPolicy {
        &self.policy
    }

    /// Submit `req`, poll until terminal, and refresh the gallery on success.
    ///
    /// Every transition is published on `state`; the last value sent is
    /// always `JobState::Finished` with the returned outcome.
    pub async fn run(
        &self,
        req: GenerationRequest,
        state: &watch::Sender<JobState>,
        cancel: &CancellationToken,
    ) -> JobOutcome {
        let mode = req.mode();
        state.send_replace(JobState::Submitting { mode });

        let submitted = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            res = self.backend.submit(&req) => Some(res),
        };

        let outcome = match submitted {
            None => JobOutcome::Cancelled { job_id: None },
            Some(Err(e)) => {
                error!(mode = %mode, "video submission failed: {e:#}");
                JobOutcome::SubmitFailed {
                    reason: format!("{e:#}"),
                }
            }
            Some(Ok(job_id)) => {
                info!(job_id = %job_id, mode = %mode, style = %req.style, duration = req.duration, "video job submitted");
                state.send_replace(JobState::Polling {
                    job_id: job_id.clone(),
                    attempts: 0,
                });
                poll::poll_until_terminal(
                    self.backend.as_ref(),
                    self.scheduler.as_ref(),
                    &self.policy,
                    &job_id,
                    state,
                    cancel,
                )
                .await
            }
        };

        if outcome.is_success() {
            if let Err(e) = self.gallery.refresh().await {
                warn!("gallery refresh after completion failed: {e:#}");
            }
        }

        state.send_replace(JobState::Finished(outcome.clone()));
        outcome
    }
}
