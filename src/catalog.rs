use anyhow::Result;
use serde::Serialize;
use tracing::{error, info};

use crate::backend::types::StyleOption;
use crate::backend::VideoBackend;
use crate::request::{GenerationMode, ValidationError};

/// Styles offered for each generation mode. Loaded once, never mutated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StyleCatalog {
    pub text_to_video: Vec<StyleOption>,
    pub image_to_video: Vec<StyleOption>,
}

impl StyleCatalog {
    pub async fn load(backend: &dyn VideoBackend) -> Result<Self> {
        let resp = backend.fetch_styles().await?;
        let catalog = Self {
            text_to_video: resp.text_to_video_styles,
            image_to_video: resp.image_to_video_styles,
        };
        info!(
            text = catalog.text_to_video.len(),
            image = catalog.image_to_video.len(),
            "loaded style catalog"
        );
        Ok(catalog)
    }

    /// Load, degrading to an empty catalog on failure.
    pub async fn load_or_empty(backend: &dyn VideoBackend) -> Self {
        match Self::load(backend).await {
            Ok(catalog) => catalog,
            Err(e) => {
                error!("failed to load styles: {e:#}");
                Self::default()
            }
        }
    }

    pub fn styles(&self, mode: GenerationMode) -> &[StyleOption] {
        match mode {
            GenerationMode::TextToVideo => &self.text_to_video,
            GenerationMode::ImageToVideo => &self.image_to_video,
        }
    }

    pub fn find(&self, mode: GenerationMode, style_id: &str) -> Option<&StyleOption> {
        self.styles(mode).iter().find(|s| s.id == style_id)
    }

    /// A style must belong to the mode's list. When that list is empty the
    /// catalog failed to load and any non-empty id is let through.
    pub fn check(&self, mode: GenerationMode, style_id: &str) -> Result<(), ValidationError> {
        if self.styles(mode).is_empty() || self.find(mode, style_id).is_some() {
            return Ok(());
        }
        Err(ValidationError::UnknownStyle {
            mode,
            style: style_id.to_string(),
        })
    }
}
