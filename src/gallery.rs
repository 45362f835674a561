use anyhow::Result;
use std::sync::{Arc, RwLock};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::backend::types::GalleryEntry;
use crate::backend::VideoBackend;

/// Holds the list of finished videos exactly as the backend returned it.
pub struct GalleryStore {
    backend: Arc<dyn VideoBackend>,
    entries: RwLock<Vec<GalleryEntry>>,
    // Held across fetch + store so a slower, older fetch never lands last.
    refreshing: Mutex<()>,
}

impl GalleryStore {
    pub fn new(backend: Arc<dyn VideoBackend>) -> Self {
        Self {
            backend,
            entries: RwLock::new(Vec::new()),
            refreshing: Mutex::new(()),
        }
    }

    /// Re-fetch the whole list and replace what is held. On failure the
    /// previous list is kept.
    pub async fn refresh(&self) -> Result<Vec<GalleryEntry>> {
        let _refreshing = self.refreshing.lock().await;
        let videos = self.backend.fetch_gallery().await?;
        info!(count = videos.len(), "gallery refreshed");
        let mut guard = self.entries.write().unwrap_or_else(|e| e.into_inner());
        *guard = videos.clone();
        Ok(videos)
    }

    /// Startup variant: a failure is logged and the gallery stays as it was.
    pub async fn refresh_or_keep(&self) {
        if let Err(e) = self.refresh().await {
            warn!("failed to load gallery: {e:#}");
        }
    }

    pub fn entries(&self) -> Vec<GalleryEntry> {
        self.entries
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
