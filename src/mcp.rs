use rmcp::{
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::*,
    tool, tool_handler, tool_router, ErrorData, ServerHandler,
};
use schemars::JsonSchema;
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;

use crate::request::{FormState, GenerationMode, ImageUpload};
use crate::session::GeneratorSession;

// ---------------------------------------------------------------------------
// Tool parameter schemas (derive JsonSchema for rmcp auto-schema)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, JsonSchema)]
pub struct GenerateTextVideoParams {
    /// Text prompt describing the video to generate.
    pub prompt: String,
    /// Text-to-video style id from list_styles. Defaults to "realistic".
    #[serde(default)]
    pub style: Option<String>,
    /// Duration in seconds (5-10). Defaults to 7.
    #[serde(default)]
    pub duration: Option<f64>,
    /// Informational flag passed through to the backend.
    #[serde(default)]
    pub nsfw_enabled: Option<bool>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct GenerateImageVideoParams {
    /// Local path of the image to animate (PNG, JPG, WEBP or GIF).
    pub image_path: String,
    /// Image-to-video style id from list_styles. Defaults to "character_animation".
    #[serde(default)]
    pub style: Option<String>,
    /// Duration in seconds (5-10). Defaults to 7.
    #[serde(default)]
    pub duration: Option<f64>,
    /// Informational flag passed through to the backend.
    #[serde(default)]
    pub nsfw_enabled: Option<bool>,
}

#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct ListGalleryParams {
    /// Re-fetch the gallery from the backend before listing.
    #[serde(default)]
    pub refresh: bool,
}

/// Overlay the optional tool arguments onto the session's current form.
fn overlay_form(
    mut form: FormState,
    mode: GenerationMode,
    style: Option<String>,
    duration: Option<f64>,
    nsfw_enabled: Option<bool>,
) -> FormState {
    if let Some(style) = style {
        match mode {
            GenerationMode::TextToVideo => form.text_style = style,
            GenerationMode::ImageToVideo => form.image_style = style,
        }
    }
    if let Some(duration) = duration {
        form.duration = duration;
    }
    if let Some(nsfw) = nsfw_enabled {
        form.nsfw_enabled = nsfw;
    }
    form
}

fn json_text<T: serde::Serialize>(value: &T) -> Result<CallToolResult, ErrorData> {
    let text = serde_json::to_string(value)
        .map_err(|e| ErrorData::internal_error(format!("Failed to serialize result: {e}"), None))?;
    Ok(CallToolResult::success(vec![Content::text(text)]))
}

// ---------------------------------------------------------------------------
// MCP Server
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct ReelgenMcp {
    session: Arc<GeneratorSession>,
    tool_router: ToolRouter<Self>,
}

impl ReelgenMcp {
    pub fn new(session: Arc<GeneratorSession>) -> Self {
        Self {
            session,
            tool_router: Self::tool_router(),
        }
    }

    fn submit(&self, mode: GenerationMode, form: FormState) -> CallToolResult {
        match self.session.submit_form(mode, form) {
            Ok(handle) => {
                let result = serde_json::json!({
                    "submissionId": handle.submission_id,
                    "status": "submitted",
                    "message": "Video generation started. Use generation_status to check progress."
                });
                CallToolResult::success(vec![Content::text(result.to_string())])
            }
            Err(e) => CallToolResult::error(vec![Content::text(format!(
                "Failed to submit {mode} job: {e}"
            ))]),
        }
    }
}

#[tool_router]
impl ReelgenMcp {
    #[tool(description = "List the available video styles, grouped by generation mode \
        (text_to_video and image_to_video). Style ids are passed as the `style` argument \
        of the generate tools.")]
    async fn list_styles(&self) -> Result<CallToolResult, ErrorData> {
        json_text(&self.session.catalog())
    }

    #[tool(description = "Generate a short video from a text prompt. \
        Returns a submission ID immediately; poll generation_status until it finishes. \
        Only one generation runs at a time. Duration: 5-10s (default 7).")]
    async fn generate_text_video(
        &self,
        Parameters(params): Parameters<GenerateTextVideoParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let mode = GenerationMode::TextToVideo;
        let mut form = overlay_form(
            self.session.form(),
            mode,
            params.style,
            params.duration,
            params.nsfw_enabled,
        );
        form.prompt = params.prompt;
        Ok(self.submit(mode, form))
    }

    #[tool(description = "Animate a local image into a short video. \
        Returns a submission ID immediately; poll generation_status until it finishes. \
        Only one generation runs at a time. Duration: 5-10s (default 7).")]
    async fn generate_image_video(
        &self,
        Parameters(params): Parameters<GenerateImageVideoParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let image = match ImageUpload::from_path(Path::new(&params.image_path)).await {
            Ok(image) => image,
            Err(e) => {
                return Ok(CallToolResult::error(vec![Content::text(format!("{e:#}"))]));
            }
        };
        let mode = GenerationMode::ImageToVideo;
        let mut form = overlay_form(
            self.session.form(),
            mode,
            params.style,
            params.duration,
            params.nsfw_enabled,
        );
        form.image = Some(image);
        Ok(self.submit(mode, form))
    }

    #[tool(description = "Report the current generation: whether a job is in flight, \
        its state (submitting/polling/finished), the last outcome and any failure notice, \
        and the video currently on display.")]
    async fn generation_status(&self) -> Result<CallToolResult, ErrorData> {
        json_text(&self.session.snapshot())
    }

    #[tool(description = "Cancel the in-flight generation. No further status checks are made for it.")]
    async fn cancel_generation(&self) -> Result<CallToolResult, ErrorData> {
        let cancelled = self.session.cancel();
        Ok(CallToolResult::success(vec![Content::text(
            serde_json::json!({ "cancelled": cancelled }).to_string(),
        )]))
    }

    #[tool(description = "List previously generated videos, newest first as returned by the backend.")]
    async fn list_gallery(
        &self,
        Parameters(params): Parameters<ListGalleryParams>,
    ) -> Result<CallToolResult, ErrorData> {
        if params.refresh {
            if let Err(e) = self.session.refresh_gallery().await {
                return Ok(CallToolResult::error(vec![Content::text(format!(
                    "Failed to load gallery: {e:#}"
                ))]));
            }
        }
        let videos = self.session.gallery();
        json_text(&serde_json::json!({
            "count": videos.len(),
            "videos": videos,
        }))
    }
}

#[tool_handler]
impl ServerHandler for ReelgenMcp {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(SERVER_INSTRUCTIONS.into()),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}

const SERVER_INSTRUCTIONS: &str = "\
Reelgen MCP server: short video generation from text prompts or images.

# Workflow

1. Call list_styles to see which styles each mode accepts.
2. Start a job with generate_text_video (prompt) or generate_image_video (image_path).
3. Call generation_status until is_generating is false. The backend is polled every 2s.
4. On success the finished video is in `displayed` and the gallery is refreshed.
   On failure `notice` explains what happened; the previous video stays on display.

Only one job runs at a time. Submitting while a job is in flight is refused;
use cancel_generation to abandon it first.
";
