use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Style catalog
// GET {api}/styles
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StyleOption {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StylesResponse {
    #[serde(default)]
    pub text_to_video_styles: Vec<StyleOption>,
    #[serde(default)]
    pub image_to_video_styles: Vec<StyleOption>,
}

// ---------------------------------------------------------------------------
// Job submission: async job pattern
// POST {api}/generate-text-to-video   (JSON)      → job id
// POST {api}/generate-image-to-video  (multipart) → job id
// GET  {api}/video/{id}                           → status + result fields
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct TextToVideoPayload {
    pub prompt: String,
    pub style: String,
    pub duration: u32,
    pub nsfw_enabled: bool,
}

/// Multipart fields other than the file part, which is built from an
/// [`ImageUpload`](crate::request::ImageUpload).
#[derive(Debug, Clone)]
pub struct ImageToVideoFields {
    pub style: String,
    pub duration: u32,
    pub nsfw_enabled: bool,
}

#[derive(Debug, Deserialize)]
pub struct CreateJobResponse {
    pub id: Option<String>,
}

/// Raw body of `GET /video/{id}`. The backend also echoes request fields
/// (`created_at`, `nsfw_enabled`, `image_filename`) which are ignored here.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VideoStatusResponse {
    pub id: Option<String>,
    pub status: Option<String>, // generating | completed | failed
    pub video_url: Option<String>,
    pub thumbnail_url: Option<String>,
    pub duration: Option<u32>,
    pub style: Option<String>,
    pub prompt: Option<String>,
}

/// Closed view of the backend's free-form status string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Completed,
    Failed,
}

impl JobStatus {
    /// Only the exact strings "completed" and "failed" are terminal. Anything
    /// else, including a missing or unrecognised status, keeps the job pending.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            Some("completed") => Self::Completed,
            Some("failed") => Self::Failed,
            _ => Self::Pending,
        }
    }

    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// A tracked job. Result fields are only populated once `status` is
/// [`JobStatus::Completed`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoJob {
    pub id: String,
    pub status: JobStatus,
    pub video_url: Option<String>,
    pub thumbnail_url: Option<String>,
    pub duration: Option<u32>,
    pub style: Option<String>,
    pub prompt: Option<String>,
}

impl VideoJob {
    /// Build the client-side job from a poll response. `id` is the id issued
    /// at submission; the echoed id in the body is not trusted.
    pub fn from_status(id: &str, resp: VideoStatusResponse) -> Self {
        let status = JobStatus::parse(resp.status.as_deref());
        if status == JobStatus::Completed {
            Self {
                id: id.to_string(),
                status,
                video_url: resp.video_url,
                thumbnail_url: resp.thumbnail_url,
                duration: resp.duration,
                style: resp.style,
                prompt: resp.prompt,
            }
        } else {
            Self {
                id: id.to_string(),
                status,
                video_url: None,
                thumbnail_url: None,
                duration: None,
                style: None,
                prompt: None,
            }
        }
    }

    /// Image shown in the preview: the thumbnail, falling back to the video.
    pub fn preview_url(&self) -> Option<&str> {
        self.thumbnail_url.as_deref().or(self.video_url.as_deref())
    }
}

// ---------------------------------------------------------------------------
// Gallery
// GET {api}/videos
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GalleryEntry {
    pub id: String,
    pub video_url: Option<String>,
    pub thumbnail_url: Option<String>,
    pub duration: Option<u32>,
    pub style: Option<String>,
    pub prompt: Option<String>,
}

impl GalleryEntry {
    pub fn preview_url(&self) -> Option<&str> {
        self.thumbnail_url.as_deref().or(self.video_url.as_deref())
    }
}

#[derive(Debug, Deserialize)]
pub struct GalleryResponse {
    #[serde(default)]
    pub videos: Vec<GalleryEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_parse_maps_terminal_strings() {
        assert_eq!(JobStatus::parse(Some("completed")), JobStatus::Completed);
        assert_eq!(JobStatus::parse(Some("failed")), JobStatus::Failed);
    }

    #[test]
    fn status_parse_is_exact() {
        assert_eq!(JobStatus::parse(Some(" completed")), JobStatus::Pending);
        assert_eq!(JobStatus::parse(Some("Completed")), JobStatus::Pending);
        assert_eq!(JobStatus::parse(Some("FAILED")), JobStatus::Pending);
    }

    #[test]
    fn status_parse_falls_back_to_pending() {
        assert_eq!(JobStatus::parse(Some("generating")), JobStatus::Pending);
        assert_eq!(JobStatus::parse(Some("queued")), JobStatus::Pending);
        assert_eq!(JobStatus::parse(Some("cancelled")), JobStatus::Pending);
        assert_eq!(JobStatus::parse(None), JobStatus::Pending);
    }

    #[test]
    fn pending_job_drops_result_fields() {
        let resp: VideoStatusResponse = serde_json::from_str(
            r#"{"id":"x","status":"generating","style":"anime","duration":7,"prompt":"p"}"#,
        )
        .expect("deserialize");
        let job = VideoJob::from_status("abc123", resp);
        assert_eq!(job.id, "abc123");
        assert_eq!(job.status, JobStatus::Pending);
        assert!(job.style.is_none());
        assert!(job.duration.is_none());
    }

    #[test]
    fn completed_job_keeps_result_fields() {
        let resp: VideoStatusResponse = serde_json::from_str(
            r#"{"status":"completed","video_url":"u","duration":7,"style":"realistic",
                "created_at":"2024-01-01T00:00:00","nsfw_enabled":false}"#,
        )
        .expect("deserialize");
        let job = VideoJob::from_status("abc123", resp);
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.duration, Some(7));
        assert_eq!(job.style.as_deref(), Some("realistic"));
        assert_eq!(job.preview_url(), Some("u"));
    }

    #[test]
    fn preview_prefers_thumbnail() {
        let entry = GalleryEntry {
            id: "g1".into(),
            video_url: Some("video".into()),
            thumbnail_url: Some("thumb".into()),
            duration: Some(5),
            style: Some("anime".into()),
            prompt: None,
        };
        assert_eq!(entry.preview_url(), Some("thumb"));
    }

    #[test]
    fn styles_response_tolerates_missing_lists() {
        let resp: StylesResponse =
            serde_json::from_str(r#"{"text_to_video_styles":[{"id":"anime","name":"Anime"}]}"#)
                .expect("deserialize");
        assert_eq!(resp.text_to_video_styles.len(), 1);
        assert_eq!(resp.text_to_video_styles[0].description, "");
        assert!(resp.image_to_video_styles.is_empty());
    }
}
