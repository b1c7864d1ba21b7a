//! Configuration management

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Environment variable prefix, `DEEPL_API_KEY` maps to `api_key`
const ENV_PREFIX: &str = "DEEPL";

/// Configuration for the gateway, built once at startup
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Default credential used when a request carries none
    pub api_key: Option<String>,
    /// Overrides the vendor endpoint chosen from the key
    pub server_url: Option<String>,
    /// Where uploads and translated documents live while a request runs
    pub scratch_dir: PathBuf,
    /// Timeout for a single vendor HTTP call
    pub request_timeout_ms: u64,
    /// Shortest wait between document status polls
    pub poll_interval_ms: u64,
    /// Upper bound for one document translation, polling included
    pub document_timeout_ms: u64,
    /// Largest request body accepted on the document endpoints
    pub max_upload_bytes: usize,
    /// Sample uploaded text documents to reject identical source/target languages
    pub auto_detect_language: bool,
    /// Attach a usage snapshot to text translation responses
    pub include_usage: bool,
    /// Limit reported by `/api-usage` when the vendor cannot be reached
    pub fallback_character_limit: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            server_url: None,
            scratch_dir: PathBuf::from("uploads"),
            request_timeout_ms: 30_000,
            poll_interval_ms: 1_000,
            document_timeout_ms: 300_000,
            max_upload_bytes: 20 * 1024 * 1024,
            auto_detect_language: true,
            include_usage: true,
            fallback_character_limit: 500_000,
        }
    }
}

impl GatewayConfig {
    /// Load configuration from an optional file, then `DEEPL_*` environment variables
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            info!("Loading configuration from {}", path.display());
            builder = builder.add_source(config::File::from(path).required(true));
        }

        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .try_parsing(true),
        );

        let mut config: Self = builder.build()?.try_deserialize()?;
        config.normalize();
        config.validate()?;

        if config.api_key.is_none() {
            warn!("No default API key configured, requests must supply their own");
        }

        Ok(config)
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> anyhow::Result<Self> {
        Self::load(None)
    }

    /// Load from JSON file, without consulting the environment
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = serde_json::from_str(&content)?;
        config.normalize();
        Ok(config)
    }

    /// Blank keys and URLs count as unset
    fn normalize(&mut self) {
        for value in [&mut self.api_key, &mut self.server_url] {
            if value.as_deref().map(str::trim).is_some_and(str::is_empty) {
                *value = None;
            }
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.scratch_dir.as_os_str().is_empty() {
            return Err(anyhow::anyhow!("scratch_dir is required"));
        }

        if self.request_timeout_ms == 0 {
            return Err(anyhow::anyhow!("request_timeout_ms must be greater than 0"));
        }

        if self.poll_interval_ms == 0 {
            return Err(anyhow::anyhow!("poll_interval_ms must be greater than 0"));
        }

        if self.document_timeout_ms < self.poll_interval_ms {
            return Err(anyhow::anyhow!(
                "document_timeout_ms must not be shorter than poll_interval_ms"
            ));
        }

        if self.max_upload_bytes == 0 {
            return Err(anyhow::anyhow!("max_upload_bytes must be greater than 0"));
        }

        Ok(())
    }

    /// `request_timeout_ms` as a [`Duration`]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// `poll_interval_ms` as a [`Duration`]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// `document_timeout_ms` as a [`Duration`]
    pub fn document_timeout(&self) -> Duration {
        Duration::from_millis(self.document_timeout_ms)
    }
}
