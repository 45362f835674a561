pub mod types;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use std::time::Duration;
use types::{
    CreateJobResponse, GalleryEntry, GalleryResponse, ImageToVideoFields, StylesResponse,
    TextToVideoPayload, VideoStatusResponse,
};

use crate::request::{GenerationInput, GenerationRequest, ImageUpload};

/// The generation service as seen by the client. [`BackendClient`] talks
/// HTTP; tests substitute an in-memory double.
#[async_trait]
pub trait VideoBackend: Send + Sync {
    async fn fetch_styles(&self) -> Result<StylesResponse>;

    async fn fetch_gallery(&self) -> Result<Vec<GalleryEntry>>;

    /// Returns the job id.
    async fn submit_text(&self, payload: &TextToVideoPayload) -> Result<String>;

    /// Returns the job id.
    async fn submit_image(&self, image: &ImageUpload, fields: &ImageToVideoFields)
        -> Result<String>;

    async fn fetch_job(&self, job_id: &str) -> Result<VideoStatusResponse>;

    /// Route a validated request to the endpoint for its mode.
    async fn submit(&self, req: &GenerationRequest) -> Result<String> {
        match &req.input {
            GenerationInput::Text { prompt } => {
                let payload = TextToVideoPayload {
                    prompt: prompt.clone(),
                    style: req.style.clone(),
                    duration: req.duration,
                    nsfw_enabled: req.nsfw_enabled,
                };
                self.submit_text(&payload).await
            }
            GenerationInput::Image(image) => {
                let fields = ImageToVideoFields {
                    style: req.style.clone(),
                    duration: req.duration,
                    nsfw_enabled: req.nsfw_enabled,
                };
                self.submit_image(image, &fields).await
            }
        }
    }
}

pub struct BackendClient {
    api_base: String,
    http: Client,
}

impl BackendClient {
    /// `api_base` already includes the route prefix, e.g. `http://host:8001/api`.
    pub fn new(api_base: String, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            api_base: api_base.trim_end_matches('/').to_string(),
            http,
        })
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.api_base, path.trim_start_matches('/'))
    }
}

async fn ensure_success(resp: Response, what: &str) -> Result<Response> {
    if !resp.status().is_success() {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        bail!("{what} API error {status}: {body}");
    }
    Ok(resp)
}

fn job_id_from(body: CreateJobResponse) -> Result<String> {
    body.id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| anyhow!("no job ID in create response"))
}

#[async_trait]
impl VideoBackend for BackendClient {
    /// GET /styles
    async fn fetch_styles(&self) -> Result<StylesResponse> {
        let resp = self
            .http
            .get(self.url("styles"))
            .send()
            .await
            .context("styles request failed")?;

        ensure_success(resp, "styles")
            .await?
            .json::<StylesResponse>()
            .await
            .context("failed to parse styles response")
    }

    /// GET /videos
    async fn fetch_gallery(&self) -> Result<Vec<GalleryEntry>> {
        let resp = self
            .http
            .get(self.url("videos"))
            .send()
            .await
            .context("gallery request failed")?;

        let body = ensure_success(resp, "gallery")
            .await?
            .json::<GalleryResponse>()
            .await
            .context("failed to parse gallery response")?;
        Ok(body.videos)
    }

    /// POST /generate-text-to-video: JSON body, returns the job id.
    async fn submit_text(&self, payload: &TextToVideoPayload) -> Result<String> {
        let resp = self
            .http
            .post(self.url("generate-text-to-video"))
            .json(payload)
            .send()
            .await
            .context("text-to-video request failed")?;

        let body = ensure_success(resp, "text-to-video")
            .await?
            .json::<CreateJobResponse>()
            .await
            .context("failed to parse text-to-video response")?;
        job_id_from(body)
    }

    /// POST /generate-image-to-video: multipart form, returns the job id.
    async fn submit_image(
        &self,
        image: &ImageUpload,
        fields: &ImageToVideoFields,
    ) -> Result<String> {
        let file = Part::bytes(image.bytes.clone())
            .file_name(image.file_name.clone())
            .mime_str(&image.content_type)
            .with_context(|| format!("invalid content type {}", image.content_type))?;
        let form = Form::new()
            .part("file", file)
            .text("style", fields.style.clone())
            .text("duration", fields.duration.to_string())
            .text("nsfw_enabled", fields.nsfw_enabled.to_string());

        let resp = self
            .http
            .post(self.url("generate-image-to-video"))
            .multipart(form)
            .send()
            .await
            .context("image-to-video request failed")?;

        let body = ensure_success(resp, "image-to-video")
            .await?
            .json::<CreateJobResponse>()
            .await
            .context("failed to parse image-to-video response")?;
        job_id_from(body)
    }

    /// GET /video/{id}: poll job status.
    async fn fetch_job(&self, job_id: &str) -> Result<VideoStatusResponse> {
        let resp = self
            .http
            .get(self.url(&format!("video/{job_id}")))
            .send()
            .await
            .context("video status request failed")?;

        ensure_success(resp, "video status")
            .await?
            .json::<VideoStatusResponse>()
            .await
            .context("failed to parse video status response")
    }
}
