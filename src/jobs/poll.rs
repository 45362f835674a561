use std::time::Duration;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::scheduler::Scheduler;
use super::{JobOutcome, JobState, PollPolicy};
use crate::backend::types::{JobStatus, VideoJob};
use crate::backend::VideoBackend;

/// Poll `job_id` until the backend reports a terminal status.
///
/// Each poll is scheduled only after the previous one resolved, so polls for
/// one job never overlap. Transport errors end the job; nothing is retried.
pub(crate) async fn poll_until_terminal(
    backend: &dyn VideoBackend,
    scheduler: &dyn Scheduler,
    policy: &PollPolicy,
    job_id: &str,
    state: &watch::Sender<JobState>,
    cancel: &CancellationToken,
) -> JobOutcome {
    let mut delay = policy.initial_delay;
    let mut waited = Duration::ZERO;
    let mut attempts = 0u32;

    loop {
        if let Some(max_wait) = policy.max_wait {
            if waited + delay > max_wait {
                warn!(job_id = %job_id, attempts, waited_secs = waited.as_secs(), "gave up waiting for video job");
                return JobOutcome::TimedOut {
                    job_id: job_id.to_string(),
                    waited_secs: waited.as_secs(),
                };
            }
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => return cancelled(job_id),
            _ = scheduler.sleep(delay) => {}
        }
        waited += delay;
        attempts += 1;

        state.send_replace(JobState::Polling {
            job_id: job_id.to_string(),
            attempts,
        });

        let resp = tokio::select! {
            biased;
            _ = cancel.cancelled() => return cancelled(job_id),
            resp = backend.fetch_job(job_id) => resp,
        };

        let resp = match resp {
            Ok(resp) => resp,
            Err(e) => {
                error!(job_id = %job_id, attempt = attempts, "video status poll failed: {e:#}");
                return JobOutcome::PollFailed {
                    job_id: job_id.to_string(),
                    reason: format!("{e:#}"),
                };
            }
        };

        let raw_status = resp.status.clone();
        let job = VideoJob::from_status(job_id, resp);
        match job.status {
            JobStatus::Completed => {
                info!(job_id = %job_id, attempts, "video job completed");
                return JobOutcome::Completed(job);
            }
            JobStatus::Failed => {
                warn!(job_id = %job_id, attempts, "video job failed");
                return JobOutcome::Failed {
                    job_id: job_id.to_string(),
                };
            }
            JobStatus::Pending => {
                debug!(
                    job_id = %job_id,
                    attempt = attempts,
                    status = raw_status.as_deref().unwrap_or("<none>"),
                    "polling video job..."
                );
            }
        }

        delay = policy.interval;
    }
}

fn cancelled(job_id: &str) -> JobOutcome {
    info!(job_id = %job_id, "video job polling cancelled");
    JobOutcome::Cancelled {
        job_id: Some(job_id.to_string()),
    }
}
