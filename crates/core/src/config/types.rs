use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::recorder::{CaptureConfig, RecorderConfig, TranscodeConfig};

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub recorder: RecorderConfig,
    #[serde(default)]
    pub capture: CaptureConfig,
    #[serde(default)]
    pub transcode: TranscodeConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Remote catalog configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CatalogConfig {
    /// URL returning the JSON list of available items
    pub url: String,
    /// Form login endpoint. When unset, credentials are sent as basic auth.
    #[serde(default)]
    pub login_url: Option<String>,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    /// Request timeout in seconds (default: 4)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// Retries for transient failures (default: 4)
    #[serde(default = "default_retries")]
    pub retries: u32,
    /// Base backoff between retries in milliseconds, doubled per attempt (default: 400)
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,
}

impl CatalogConfig {
    /// Catalog config pointing at `url` with defaults for everything else.
    pub fn with_url(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            login_url: None,
            username: String::new(),
            password: String::new(),
            timeout_secs: default_timeout(),
            retries: default_retries(),
            backoff_ms: default_backoff_ms(),
        }
    }

    pub fn has_credentials(&self) -> bool {
        !self.username.is_empty()
    }
}

fn default_timeout() -> u64 {
    4
}

fn default_retries() -> u32 {
    4
}

fn default_backoff_ms() -> u64 {
    400
}

/// Log output configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Root directory for per-run log files. `None` disables file logging.
    #[serde(default = "default_log_dir")]
    pub directory: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: default_log_dir(),
        }
    }
}

fn default_log_dir() -> Option<PathBuf> {
    Some(PathBuf::from("logs"))
}

/// Sanitized config for logging (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub catalog: SanitizedCatalogConfig,
    pub recorder: RecorderConfig,
    pub capture: CaptureConfig,
    pub transcode: TranscodeConfig,
    pub logging: LoggingConfig,
}

/// Sanitized catalog config (password hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedCatalogConfig {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub login_url: Option<String>,
    pub username: String,
    pub password_configured: bool,
    pub timeout_secs: u64,
    pub retries: u32,
    pub backoff_ms: u64,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            catalog: SanitizedCatalogConfig {
                url: config.catalog.url.clone(),
                login_url: config.catalog.login_url.clone(),
                username: config.catalog.username.clone(),
                password_configured: !config.catalog.password.is_empty(),
                timeout_secs: config.catalog.timeout_secs,
                retries: config.catalog.retries,
                backoff_ms: config.catalog.backoff_ms,
            },
            recorder: config.recorder.clone(),
            capture: config.capture.clone(),
            transcode: config.transcode.clone(),
            logging: config.logging.clone(),
        }
    }
}
