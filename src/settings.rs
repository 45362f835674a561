use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

use crate::jobs::PollPolicy;

pub const ENV_BACKEND_URL: &str = "REELGEN_BACKEND_URL";
pub const ENV_MAX_WAIT_SECS: &str = "REELGEN_MAX_WAIT_SECS";

// ---------------------------------------------------------------------------
// Settings: read from {dataDir}/reelgen/settings.json, then the environment
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default = "default_backend_url")]
    #[serde(alias = "backendURL")]
    pub backend_url: String,
    #[serde(default = "default_api_prefix")]
    pub api_prefix: String,
    #[serde(default = "default_initial_poll_delay_ms")]
    pub initial_poll_delay_ms: u64,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// 0 disables the cap.
    #[serde(default = "default_max_wait_secs")]
    pub max_wait_secs: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_backend_url() -> String {
    "http://localhost:8001".to_string()
}

fn default_api_prefix() -> String {
    "/api".to_string()
}

fn default_initial_poll_delay_ms() -> u64 {
    1_000
}

fn default_poll_interval_ms() -> u64 {
    2_000
}

fn default_max_wait_secs() -> u64 {
    600
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            backend_url: default_backend_url(),
            api_prefix: default_api_prefix(),
            initial_poll_delay_ms: default_initial_poll_delay_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            max_wait_secs: default_max_wait_secs(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl Settings {
    /// Defaults, overlaid by `settings.json` in `data_dir`, overlaid by the
    /// process environment.
    pub fn load(data_dir: &Path) -> Self {
        let mut settings = Self::from_file(&data_dir.join("settings.json"));
        settings.apply_env(|key| std::env::var(key).ok());
        settings
    }

    /// A missing or malformed file yields the defaults.
    pub fn from_file(path: &Path) -> Self {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(_) => return Self::default(),
        };
        match serde_json::from_str(&contents) {
            Ok(settings) => settings,
            Err(e) => {
                warn!(path = %path.display(), "ignoring malformed settings file: {e}");
                Self::default()
            }
        }
    }

    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(url) = var(ENV_BACKEND_URL).filter(|v| !v.trim().is_empty()) {
            self.backend_url = url.trim().to_string();
        }
        if let Some(raw) = var(ENV_MAX_WAIT_SECS) {
            match raw.trim().parse() {
                Ok(secs) => self.max_wait_secs = secs,
                Err(_) => warn!(value = %raw, "ignoring invalid {ENV_MAX_WAIT_SECS}"),
            }
        }
    }

    /// Backend URL joined with the route prefix, without a trailing slash.
    pub fn api_base(&self) -> String {
        let base = self.backend_url.trim_end_matches('/');
        let prefix = self.api_prefix.trim_matches('/');
        if prefix.is_empty() {
            base.to_string()
        } else {
            format!("{base}/{prefix}")
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn poll_policy(&self) -> PollPolicy {
        PollPolicy {
            initial_delay: Duration::from_millis(self.initial_poll_delay_ms),
            interval: Duration::from_millis(self.poll_interval_ms),
            max_wait: (self.max_wait_secs > 0).then(|| Duration::from_secs(self.max_wait_secs)),
        }
    }
}

/// Resolve the per-user data directory.
pub fn resolve_data_dir() -> Result<PathBuf> {
    let data = dirs::data_dir().context("could not determine data directory")?;
    Ok(data.join("reelgen"))
}
