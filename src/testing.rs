//! In-memory doubles shared by the unit tests.

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use crate::backend::types::{
    GalleryEntry, ImageToVideoFields, StyleOption, StylesResponse, TextToVideoPayload,
    VideoStatusResponse,
};
use crate::backend::VideoBackend;
use crate::jobs::scheduler::Scheduler;
use crate::request::ImageUpload;

#[derive(Debug, Clone)]
pub enum PollReply {
    Body(VideoStatusResponse),
    TransportError(String),
}

impl PollReply {
    pub fn status(status: &str) -> Self {
        Self::Body(VideoStatusResponse {
            status: Some(status.into()),
            ..Default::default()
        })
    }

    pub fn completed(video_url: &str) -> Self {
        Self::Body(VideoStatusResponse {
            status: Some("completed".into()),
            video_url: Some(video_url.into()),
            ..Default::default()
        })
    }

    pub fn completed_with(video_url: &str, duration: u32, style: &str) -> Self {
        Self::Body(VideoStatusResponse {
            status: Some("completed".into()),
            video_url: Some(video_url.into()),
            duration: Some(duration),
            style: Some(style.into()),
            ..Default::default()
        })
    }

    pub fn failed() -> Self {
        Self::status("failed")
    }

    pub fn transport_error(msg: &str) -> Self {
        Self::TransportError(msg.into())
    }
}

#[derive(Default)]
struct MockState {
    job_id: Option<String>,
    submit_error: Option<String>,
    polls: VecDeque<PollReply>,
    poll_count: usize,
    text_submissions: Vec<TextToVideoPayload>,
    image_submissions: Vec<(String, ImageToVideoFields)>,
    styles: StylesResponse,
    styles_error: Option<String>,
    gallery: Vec<GalleryEntry>,
    gallery_error: Option<String>,
    gallery_fetches: usize,
}

/// Scripted backend. Polls pop replies in order; once the script runs out
/// every poll answers "generating".
#[derive(Default)]
pub struct MockBackend {
    state: Mutex<MockState>,
}

impl MockBackend {
    pub fn with_polls(polls: Vec<PollReply>) -> Self {
        let backend = Self::default();
        backend.lock().polls = polls.into();
        backend
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().expect("mock state lock")
    }

    pub fn set_job_id(&self, id: &str) {
        self.lock().job_id = Some(id.into());
    }

    pub fn push_polls(&self, polls: Vec<PollReply>) {
        self.lock().polls.extend(polls);
    }

    pub fn fail_submissions(&self, msg: &str) {
        self.lock().submit_error = Some(msg.into());
    }

    pub fn set_styles(&self, styles: StylesResponse) {
        self.lock().styles = styles;
    }

    pub fn fail_styles(&self, msg: &str) {
        self.lock().styles_error = Some(msg.into());
    }

    pub fn set_gallery(&self, gallery: Vec<GalleryEntry>) {
        let mut state = self.lock();
        state.gallery = gallery;
        state.gallery_error = None;
    }

    pub fn fail_gallery(&self, msg: &str) {
        self.lock().gallery_error = Some(msg.into());
    }

    pub fn poll_count(&self) -> usize {
        self.lock().poll_count
    }

    pub fn gallery_fetches(&self) -> usize {
        self.lock().gallery_fetches
    }

    pub fn text_submissions(&self) -> Vec<TextToVideoPayload> {
        self.lock().text_submissions.clone()
    }

    pub fn image_submissions(&self) -> Vec<(String, ImageToVideoFields)> {
        self.lock().image_submissions.clone()
    }

    fn next_job_id(state: &MockState) -> String {
        state.job_id.clone().unwrap_or_else(|| {
            format!(
                "job-{}",
                state.text_submissions.len() + state.image_submissions.len()
            )
        })
    }
}

#[async_trait]
impl VideoBackend for MockBackend {
    async fn fetch_styles(&self) -> Result<StylesResponse> {
        let state = self.lock();
        if let Some(msg) = &state.styles_error {
            bail!("styles API error {msg}");
        }
        Ok(state.styles.clone())
    }

    async fn fetch_gallery(&self) -> Result<Vec<GalleryEntry>> {
        let mut state = self.lock();
        state.gallery_fetches += 1;
        if let Some(msg) = &state.gallery_error {
            bail!("gallery API error {msg}");
        }
        Ok(state.gallery.clone())
    }

    async fn submit_text(&self, payload: &TextToVideoPayload) -> Result<String> {
        let mut state = self.lock();
        if let Some(msg) = &state.submit_error {
            return Err(anyhow!("text-to-video request failed: {msg}"));
        }
        state.text_submissions.push(payload.clone());
        Ok(Self::next_job_id(&state))
    }

    async fn submit_image(
        &self,
        image: &ImageUpload,
        fields: &ImageToVideoFields,
    ) -> Result<String> {
        let mut state = self.lock();
        if let Some(msg) = &state.submit_error {
            return Err(anyhow!("image-to-video request failed: {msg}"));
        }
        state
            .image_submissions
            .push((image.file_name.clone(), fields.clone()));
        Ok(Self::next_job_id(&state))
    }

    async fn fetch_job(&self, job_id: &str) -> Result<VideoStatusResponse> {
        let mut state = self.lock();
        state.poll_count += 1;
        match state.polls.pop_front() {
            Some(PollReply::Body(mut body)) => {
                body.id = Some(job_id.into());
                Ok(body)
            }
            Some(PollReply::TransportError(msg)) => bail!("video status request failed: {msg}"),
            None => Ok(VideoStatusResponse {
                id: Some(job_id.into()),
                status: Some("generating".into()),
                ..Default::default()
            }),
        }
    }
}

/// Records every requested delay and returns without waiting.
#[derive(Default)]
pub struct RecordingScheduler {
    delays: Mutex<Vec<Duration>>,
}

impl RecordingScheduler {
    pub fn delays(&self) -> Vec<Duration> {
        self.delays.lock().expect("delays lock").clone()
    }
}

#[async_trait]
impl Scheduler for RecordingScheduler {
    async fn sleep(&self, delay: Duration) {
        self.delays.lock().expect("delays lock").push(delay);
        tokio::task::yield_now().await;
    }
}

pub fn gallery_entry(id: &str) -> GalleryEntry {
    GalleryEntry {
        id: id.into(),
        video_url: Some(format!("https://cdn.example/{id}.mp4")),
        thumbnail_url: None,
        duration: Some(7),
        style: Some("realistic".into()),
        prompt: Some(format!("prompt for {id}")),
    }
}

fn style(id: &str, name: &str, description: &str) -> StyleOption {
    StyleOption {
        id: id.into(),
        name: name.into(),
        description: description.into(),
    }
}

/// The catalog the reference backend serves.
pub fn default_styles() -> StylesResponse {
    StylesResponse {
        text_to_video_styles: vec![
            style("realistic", "Realistic", "Photorealistic video generation"),
            style("anime", "Anime", "Japanese animation style"),
            style("cartoon", "Cartoon", "Western cartoon style"),
            style("surreal", "Surreal", "Abstract and artistic style"),
            style("talking_image", "Talking Image", "Face animation from image"),
        ],
        image_to_video_styles: vec![
            style("character_animation", "Character Animation", "Animate characters in the image"),
            style("movement_overlay", "Movement Overlay", "Add dynamic movement effects"),
            style("talking_face", "Talking Face", "Make faces speak and move"),
        ],
    }
}
