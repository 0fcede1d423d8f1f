//! Recorder configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::config::Config;

/// Cycle timing and output location.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecorderConfig {
    /// Seconds between cycles (30..=86400).
    #[serde(default = "default_interval")]
    pub interval_secs: u64,

    /// How long a freshly launched process must survive to count as started.
    #[serde(default = "default_grace_period")]
    pub grace_period_secs: u64,

    /// Captures land in `<output_root>/<item>/<YYYY-MM-DD>/`.
    #[serde(default = "default_output_root")]
    pub output_root: PathBuf,
}

impl RecorderConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn grace_period(&self) -> Duration {
        Duration::from_secs(self.grace_period_secs)
    }
}

fn default_interval() -> u64 {
    60
}

fn default_grace_period() -> u64 {
    4
}

fn default_output_root() -> PathBuf {
    PathBuf::from("Recordings")
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval(),
            grace_period_secs: default_grace_period(),
            output_root: default_output_root(),
        }
    }
}

/// The capture program and how to invoke it.
///
/// `args` may use `{url}`, `{item}`, `{quality}` and `{output}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureConfig {
    #[serde(default = "default_capture_program")]
    pub program: PathBuf,

    /// Argument used to check the program is installed.
    #[serde(default = "default_capture_version_arg")]
    pub version_arg: String,

    /// Item page URL; `{item}` is replaced by the item id.
    #[serde(default = "default_url_template")]
    pub url_template: String,

    #[serde(default = "default_quality")]
    pub quality: String,

    /// Extension of capture files, without the dot.
    #[serde(default = "default_capture_extension")]
    pub extension: String,

    #[serde(default = "default_capture_args")]
    pub args: Vec<String>,
}

fn default_capture_program() -> PathBuf {
    PathBuf::from("streamlink")
}

fn default_capture_version_arg() -> String {
    "--version".to_string()
}

fn default_url_template() -> String {
    "https://catalog.example/{item}".to_string()
}

fn default_quality() -> String {
    "best".to_string()
}

fn default_capture_extension() -> String {
    "ts".to_string()
}

fn default_capture_args() -> Vec<String> {
    ["{url}", "{quality}", "--quiet", "--output", "{output}", "--force"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            program: default_capture_program(),
            version_arg: default_capture_version_arg(),
            url_template: default_url_template(),
            quality: default_quality(),
            extension: default_capture_extension(),
            args: default_capture_args(),
        }
    }
}

/// Optional conversion of finished captures.
///
/// `args` may use `{input}` and `{output}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscodeConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_transcode_program")]
    pub program: PathBuf,

    #[serde(default = "default_transcode_version_arg")]
    pub version_arg: String,

    /// Target extension, without the dot.
    #[serde(default = "default_transcode_extension")]
    pub extension: String,

    #[serde(default = "default_transcode_args")]
    pub args: Vec<String>,
}

fn default_transcode_program() -> PathBuf {
    PathBuf::from("ffmpeg")
}

fn default_transcode_version_arg() -> String {
    "-version".to_string()
}

fn default_transcode_extension() -> String {
    "mp4".to_string()
}

fn default_transcode_args() -> Vec<String> {
    [
        "-hide_banner",
        "-loglevel",
        "error",
        "-y",
        "-i",
        "{input}",
        "-c",
        "copy",
        "{output}",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

impl Default for TranscodeConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            program: default_transcode_program(),
            version_arg: default_transcode_version_arg(),
            extension: default_transcode_extension(),
            args: default_transcode_args(),
        }
    }
}

/// Everything the recorder needs from the configuration file.
#[derive(Debug, Clone, Default)]
pub struct RecorderSettings {
    pub recorder: RecorderConfig,
    pub capture: CaptureConfig,
    pub transcode: TranscodeConfig,
}

impl From<&Config> for RecorderSettings {
    fn from(config: &Config) -> Self {
        Self {
            recorder: config.recorder.clone(),
            capture: config.capture.clone(),
            transcode: config.transcode.clone(),
        }
    }
}
