use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

pub const BASE_URL_ENV: &str = "ASSET_REPO_API_BASE_URL";
pub const COOKIE_PATH_ENV: &str = "ASSET_REPO_COOKIE_PATH";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ClientConfig {
    /// Origin of the remote API; requests go to `{api_base_url}/api/v1/...`
    pub api_base_url: String,

    /// Where the session cookie is kept. Defaults to the user data directory.
    pub cookie_path: Option<PathBuf>,

    /// Per-request timeout. `None` leaves the transport default in place.
    pub request_timeout_secs: Option<u64>,

    /// How long a notification stays visible
    pub notification_duration_ms: u64,

    /// Granularity of upload progress events
    pub upload_chunk_bytes: usize,

    /// Sent with registrations when set
    pub company_name: Option<String>,
    pub company_domain: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8000".to_string(),
            cookie_path: None,
            request_timeout_secs: None,
            notification_duration_ms: 5000,
            upload_chunk_bytes: 64 * 1024,
            company_name: None,
            company_domain: None,
        }
    }
}

impl ClientConfig {
    /// Load configuration from the default location, creating it when missing,
    /// then apply environment overrides.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&Self::config_path()?)?;
        config.apply_env();
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config {}", path.display()))?;
            let config: Self = toml::from_str(&content)
                .with_context(|| format!("Invalid config file {}", path.display()))?;
            Ok(config)
        } else {
            let default_config = Self::default();
            default_config.save_to(path)?;
            Ok(default_config)
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        info!(path = ?path, "Configuration saved");
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("asset-repo").join("config.toml"))
    }

    pub fn apply_env(&mut self) {
        if let Ok(url) = std::env::var(BASE_URL_ENV) {
            if !url.trim().is_empty() {
                self.api_base_url = url.trim().to_string();
            }
        }
        if let Ok(path) = std::env::var(COOKIE_PATH_ENV) {
            if !path.trim().is_empty() {
                self.cookie_path = Some(PathBuf::from(path.trim()));
            }
        }
    }

    /// Configured cookie path, or `<data_dir>/asset-repo/session.cookie`.
    pub fn resolved_cookie_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.cookie_path {
            return Ok(path.clone());
        }
        let data_dir = dirs::data_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?;
        Ok(data_dir.join("asset-repo").join("session.cookie"))
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }

    pub fn notification_duration(&self) -> Duration {
        Duration::from_millis(self.notification_duration_ms)
    }
}
