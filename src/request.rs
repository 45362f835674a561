use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::warn;

// ---------------------------------------------------------------------------
// Valid values: form defaults, aligned with the backend's request models
// ---------------------------------------------------------------------------

pub const MIN_DURATION_SECS: u32 = 5;
pub const MAX_DURATION_SECS: u32 = 10;
pub const DEFAULT_DURATION_SECS: u32 = 7;
pub const DEFAULT_TEXT_STYLE: &str = "realistic";
pub const DEFAULT_IMAGE_STYLE: &str = "character_animation";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationMode {
    TextToVideo,
    ImageToVideo,
}

impl std::fmt::Display for GenerationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TextToVideo => write!(f, "text-to-video"),
            Self::ImageToVideo => write!(f, "image-to-video"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("prompt must not be empty")]
    MissingPrompt,
    #[error("an image file is required")]
    MissingImage,
    #[error("a style must be selected")]
    MissingStyle,
    #[error("style \"{style}\" is not available for {mode}")]
    UnknownStyle { mode: GenerationMode, style: String },
    #[error("duration must be a whole number of seconds, got {0}")]
    InvalidDuration(f64),
}

/// An image chosen for image-to-video generation.
#[derive(Clone, PartialEq, Eq)]
pub struct ImageUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl std::fmt::Debug for ImageUpload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageUpload")
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

impl ImageUpload {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let file_name = file_name.into();
        let content_type = content_type_for(&file_name).to_string();
        Self {
            file_name,
            content_type,
            bytes,
        }
    }

    /// Read an image from disk.
    pub async fn from_path(path: &Path) -> Result<Self> {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("failed to read image {}", path.display()))?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload.jpg")
            .to_string();
        Ok(Self::new(file_name, bytes))
    }
}

fn content_type_for(file_name: &str) -> &'static str {
    let ext = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "webp" => "image/webp",
        "gif" => "image/gif",
        _ => "application/octet-stream",
    }
}

/// Raw form fields as the user left them. Each mode keeps its own style
/// selection, so switching tabs does not lose it.
#[derive(Debug, Clone)]
pub struct FormState {
    pub prompt: String,
    pub text_style: String,
    pub image_style: String,
    pub image: Option<ImageUpload>,
    /// Slider value. Kept as a float so stray non-integer input can be caught.
    pub duration: f64,
    pub nsfw_enabled: bool,
}

impl Default for FormState {
    fn default() -> Self {
        Self {
            prompt: String::new(),
            text_style: DEFAULT_TEXT_STYLE.into(),
            image_style: DEFAULT_IMAGE_STYLE.into(),
            image: None,
            duration: f64::from(DEFAULT_DURATION_SECS),
            nsfw_enabled: false,
        }
    }
}

impl FormState {
    pub fn style_for(&self, mode: GenerationMode) -> &str {
        match mode {
            GenerationMode::TextToVideo => &self.text_style,
            GenerationMode::ImageToVideo => &self.image_style,
        }
    }

    /// Whether the field required by `mode` is filled in.
    pub fn has_required_input(&self, mode: GenerationMode) -> bool {
        match mode {
            GenerationMode::TextToVideo => !self.prompt.trim().is_empty(),
            GenerationMode::ImageToVideo => self.image.is_some(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum GenerationInput {
    Text { prompt: String },
    Image(ImageUpload),
}

/// A validated submission, ready to hand to the job engine.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub input: GenerationInput,
    pub style: String,
    pub duration: u32,
    pub nsfw_enabled: bool,
}

impl GenerationRequest {
    pub fn mode(&self) -> GenerationMode {
        match self.input {
            GenerationInput::Text { .. } => GenerationMode::TextToVideo,
            GenerationInput::Image(_) => GenerationMode::ImageToVideo,
        }
    }
}

/// Validate the form for `mode` and produce a submission. Pure; no I/O.
pub fn build(mode: GenerationMode, form: &FormState) -> Result<GenerationRequest, ValidationError> {
    let input = match mode {
        GenerationMode::TextToVideo => {
            let prompt = form.prompt.trim();
            if prompt.is_empty() {
                return Err(ValidationError::MissingPrompt);
            }
            GenerationInput::Text {
                prompt: prompt.to_string(),
            }
        }
        GenerationMode::ImageToVideo => {
            let image = form.image.clone().ok_or(ValidationError::MissingImage)?;
            GenerationInput::Image(image)
        }
    };

    let style = form.style_for(mode).trim();
    if style.is_empty() {
        return Err(ValidationError::MissingStyle);
    }

    Ok(GenerationRequest {
        input,
        style: style.to_string(),
        duration: normalize_duration(form.duration)?,
        nsfw_enabled: form.nsfw_enabled,
    })
}

fn normalize_duration(raw: f64) -> Result<u32, ValidationError> {
    if !raw.is_finite() || raw.fract() != 0.0 {
        return Err(ValidationError::InvalidDuration(raw));
    }
    let clamped = raw.clamp(f64::from(MIN_DURATION_SECS), f64::from(MAX_DURATION_SECS));
    if clamped != raw {
        warn!(requested = raw, clamped, "duration out of range, clamping");
    }
    Ok(clamped as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_form(prompt: &str) -> FormState {
        FormState {
            prompt: prompt.into(),
            ..Default::default()
        }
    }

    fn png() -> ImageUpload {
        ImageUpload::new("cat.png", vec![0x89, b'P', b'N', b'G'])
    }

    #[test]
    fn text_request_uses_trimmed_prompt_and_text_style() {
        let req = build(GenerationMode::TextToVideo, &text_form("  a dragon  ")).unwrap();
        assert_eq!(
            req.input,
            GenerationInput::Text {
                prompt: "a dragon".into()
            }
        );
        assert_eq!(req.style, DEFAULT_TEXT_STYLE);
        assert_eq!(req.duration, DEFAULT_DURATION_SECS);
        assert!(!req.nsfw_enabled);
        assert_eq!(req.mode(), GenerationMode::TextToVideo);
    }

    #[test]
    fn blank_prompt_is_missing_regardless_of_other_fields() {
        for prompt in ["", "   ", "\n\t"] {
            let mut form = text_form(prompt);
            form.image = Some(png());
            form.duration = 9.0;
            form.nsfw_enabled = true;
            assert_eq!(
                build(GenerationMode::TextToVideo, &form),
                Err(ValidationError::MissingPrompt)
            );
        }
    }

    #[test]
    fn image_mode_requires_a_file() {
        let form = text_form("ignored prompt");
        assert_eq!(
            build(GenerationMode::ImageToVideo, &form),
            Err(ValidationError::MissingImage)
        );
    }

    #[test]
    fn image_mode_ignores_empty_prompt() {
        let form = FormState {
            image: Some(png()),
            ..Default::default()
        };
        let req = build(GenerationMode::ImageToVideo, &form).unwrap();
        assert_eq!(req.style, DEFAULT_IMAGE_STYLE);
        assert_eq!(req.mode(), GenerationMode::ImageToVideo);
    }

    #[test]
    fn empty_style_is_rejected() {
        let mut form = text_form("a dragon");
        form.text_style = " ".into();
        assert_eq!(
            build(GenerationMode::TextToVideo, &form),
            Err(ValidationError::MissingStyle)
        );
    }

    #[test]
    fn out_of_range_duration_is_clamped() {
        let mut form = text_form("a dragon");
        form.duration = 11.0;
        assert_eq!(build(GenerationMode::TextToVideo, &form).unwrap().duration, 10);
        form.duration = 0.0;
        assert_eq!(build(GenerationMode::TextToVideo, &form).unwrap().duration, 5);
    }

    #[test]
    fn non_integer_duration_is_rejected() {
        let mut form = text_form("a dragon");
        form.duration = 6.5;
        assert_eq!(
            build(GenerationMode::TextToVideo, &form),
            Err(ValidationError::InvalidDuration(6.5))
        );
        form.duration = f64::NAN;
        assert!(matches!(
            build(GenerationMode::TextToVideo, &form),
            Err(ValidationError::InvalidDuration(_))
        ));
    }

    #[test]
    fn content_type_follows_extension() {
        assert_eq!(ImageUpload::new("a.JPG", vec![]).content_type, "image/jpeg");
        assert_eq!(ImageUpload::new("a.webp", vec![]).content_type, "image/webp");
        assert_eq!(
            ImageUpload::new("noext", vec![]).content_type,
            "application/octet-stream"
        );
    }

    #[tokio::test]
    async fn upload_from_path_reads_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame.png");
        std::fs::write(&path, b"png-bytes").unwrap();

        let upload = ImageUpload::from_path(&path).await.unwrap();
        assert_eq!(upload.file_name, "frame.png");
        assert_eq!(upload.content_type, "image/png");
        assert_eq!(upload.bytes, b"png-bytes");
    }

    #[tokio::test]
    async fn upload_from_missing_path_errors() {
        let dir = tempfile::tempdir().unwrap();
        let err = ImageUpload::from_path(&dir.path().join("nope.png"))
            .await
            .unwrap_err();
        assert!(format!("{err:#}").contains("failed to read image"));
    }
}
