//! Client-side state the presentation layer reads and writes: the form, the
//! active mode, the in-flight submission and the result on display.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::backend::types::{GalleryEntry, VideoJob};
use crate::backend::VideoBackend;
use crate::catalog::StyleCatalog;
use crate::gallery::GalleryStore;
use crate::jobs::scheduler::Scheduler;
use crate::jobs::{JobOutcome, JobState, PollEngine, PollPolicy};
use crate::request::{self, FormState, GenerationMode, ValidationError};

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("a video is already being generated")]
    Busy,
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmissionRecord {
    pub submission_id: Uuid,
    pub mode: GenerationMode,
    pub submitted_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub outcome: Option<JobOutcome>,
}

struct ActiveSubmission {
    record: SubmissionRecord,
    state: watch::Receiver<JobState>,
    cancel: CancellationToken,
}

struct SessionState {
    mode: GenerationMode,
    form: FormState,
    catalog: StyleCatalog,
    displayed: Option<VideoJob>,
    active: Option<ActiveSubmission>,
    last: Option<SubmissionRecord>,
    notice: Option<String>,
}

impl SessionState {
    fn new() -> Self {
        Self {
            mode: GenerationMode::TextToVideo,
            form: FormState::default(),
            catalog: StyleCatalog::default(),
            displayed: None,
            active: None,
            last: None,
            notice: None,
        }
    }

    /// Apply the outcome of `submission_id`. Returns false, changing nothing,
    /// when that submission is no longer the active one.
    fn finish(&mut self, submission_id: Uuid, outcome: &JobOutcome) -> bool {
        let is_current = self
            .active
            .as_ref()
            .is_some_and(|a| a.record.submission_id == submission_id);
        if !is_current {
            debug!(submission_id = %submission_id, "ignoring stale job outcome");
            return false;
        }
        let Some(active) = self.active.take() else {
            return false;
        };

        let mut record = active.record;
        record.finished_at = Some(Utc::now());
        record.outcome = Some(outcome.clone());

        if let JobOutcome::Completed(job) = outcome {
            self.displayed = Some(job.clone());
        }
        self.notice = outcome.failure_notice();
        self.last = Some(record);
        true
    }

    /// Clear `submission_id` when its task ended without an outcome.
    fn abandon(&mut self, submission_id: Uuid) {
        if !self
            .active
            .as_ref()
            .is_some_and(|a| a.record.submission_id == submission_id)
        {
            return;
        }
        if let Some(active) = self.active.take() {
            warn!(submission_id = %submission_id, "generation task ended without an outcome");
            let mut record = active.record;
            record.finished_at = Some(Utc::now());
            self.notice = Some("Video generation stopped unexpectedly.".to_string());
            self.last = Some(record);
        }
    }
}

/// Releases the session's in-flight slot if the generation task is dropped
/// (aborted or unwinding) before it reports an outcome.
struct ActiveGuard {
    shared: Arc<Mutex<SessionState>>,
    submission_id: Uuid,
}

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.shared
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .abandon(self.submission_id);
    }
}

/// Returned by a successful `generate`; resolves once the job is terminal.
pub struct SubmissionHandle {
    pub submission_id: Uuid,
    pub state: watch::Receiver<JobState>,
    join: JoinHandle<JobOutcome>,
}

impl SubmissionHandle {
    pub async fn wait(self) -> Result<JobOutcome> {
        self.join.await.context("generation task did not finish")
    }
}

/// Serializable view of the session.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub mode: GenerationMode,
    pub is_generating: bool,
    pub job_state: Option<JobState>,
    pub submission: Option<SubmissionRecord>,
    pub notice: Option<String>,
    pub displayed: Option<VideoJob>,
    pub gallery_count: usize,
}

pub struct GeneratorSession {
    backend: Arc<dyn VideoBackend>,
    gallery: Arc<GalleryStore>,
    engine: Arc<PollEngine>,
    state: Arc<Mutex<SessionState>>,
}

impl GeneratorSession {
    pub fn new(
        backend: Arc<dyn VideoBackend>,
        scheduler: Arc<dyn Scheduler>,
        policy: PollPolicy,
    ) -> Self {
        let gallery = Arc::new(GalleryStore::new(Arc::clone(&backend)));
        let engine = Arc::new(PollEngine::new(
            Arc::clone(&backend),
            scheduler,
            Arc::clone(&gallery),
            policy,
        ));
        Self {
            backend,
            gallery,
            engine,
            state: Arc::new(Mutex::new(SessionState::new())),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Load the style catalog and the gallery. Neither failure is fatal.
    pub async fn start(&self) {
        let catalog = StyleCatalog::load_or_empty(self.backend.as_ref()).await;
        self.lock().catalog = catalog;
        self.gallery.refresh_or_keep().await;
    }

    pub fn mode(&self) -> GenerationMode {
        self.lock().mode
    }

    pub fn set_mode(&self, mode: GenerationMode) {
        self.lock().mode = mode;
    }

    pub fn form(&self) -> FormState {
        self.lock().form.clone()
    }

    pub fn edit_form(&self, edit: impl FnOnce(&mut FormState)) {
        edit(&mut self.lock().form);
    }

    pub fn catalog(&self) -> StyleCatalog {
        self.lock().catalog.clone()
    }

    pub fn is_generating(&self) -> bool {
        self.lock().active.is_some()
    }

    /// Mirrors the generate button: enabled when idle and the mode's
    /// required input is present.
    pub fn can_generate(&self) -> bool {
        let state = self.lock();
        state.active.is_none() && state.form.has_required_input(state.mode)
    }

    /// Submit the current form for the current mode.
    pub fn generate(&self) -> Result<SubmissionHandle, SessionError> {
        let mut state = self.lock();
        self.start_locked(&mut state)
    }

    /// Replace mode and form, then submit, as one step.
    pub fn submit_form(
        &self,
        mode: GenerationMode,
        form: FormState,
    ) -> Result<SubmissionHandle, SessionError> {
        let mut state = self.lock();
        if state.active.is_some() {
            return Err(SessionError::Busy);
        }
        state.mode = mode;
        state.form = form;
        self.start_locked(&mut state)
    }

    fn start_locked(&self, state: &mut SessionState) -> Result<SubmissionHandle, SessionError> {
        if state.active.is_some() {
            return Err(SessionError::Busy);
        }
        let req = request::build(state.mode, &state.form)?;
        state.catalog.check(req.mode(), &req.style)?;

        let submission_id = Uuid::new_v4();
        let (tx, rx) = watch::channel(JobState::Idle);
        let cancel = CancellationToken::new();
        let record = SubmissionRecord {
            submission_id,
            mode: req.mode(),
            submitted_at: Utc::now(),
            finished_at: None,
            outcome: None,
        };
        info!(submission_id = %submission_id, mode = %record.mode, "starting video generation");

        state.active = Some(ActiveSubmission {
            record,
            state: rx.clone(),
            cancel: cancel.clone(),
        });
        state.notice = None;

        let engine = Arc::clone(&self.engine);
        let shared = Arc::clone(&self.state);
        let join = tokio::spawn(async move {
            let guard = ActiveGuard {
                shared,
                submission_id,
            };
            let outcome = engine.run(req, &tx, &cancel).await;
            guard
                .shared
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .finish(submission_id, &outcome);
            outcome
        });

        Ok(SubmissionHandle {
            submission_id,
            state: rx,
            join,
        })
    }

    /// Stop the in-flight job, if any. No further polls are issued for it.
    pub fn cancel(&self) -> bool {
        match &self.lock().active {
            Some(active) => {
                info!(submission_id = %active.record.submission_id, "cancelling video generation");
                active.cancel.cancel();
                true
            }
            None => false,
        }
    }

    pub fn displayed(&self) -> Option<VideoJob> {
        self.lock().displayed.clone()
    }

    pub fn notice(&self) -> Option<String> {
        self.lock().notice.clone()
    }

    pub fn gallery(&self) -> Vec<GalleryEntry> {
        self.gallery.entries()
    }

    pub async fn refresh_gallery(&self) -> Result<Vec<GalleryEntry>> {
        self.gallery.refresh().await
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let state = self.lock();
        let (job_state, submission) = match &state.active {
            Some(active) => (
                Some(active.state.borrow().clone()),
                Some(active.record.clone()),
            ),
            None => (None, state.last.clone()),
        };
        SessionSnapshot {
            mode: state.mode,
            is_generating: state.active.is_some(),
            job_state,
            submission,
            notice: state.notice.clone(),
            displayed: state.displayed.clone(),
            gallery_count: self.gallery.len(),
        }
    }
}
