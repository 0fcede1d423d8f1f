use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use std::path::Path;

use super::{types::Config, ConfigError};

/// Template written on first run, before any credentials are known.
pub const DEFAULT_CONFIG_TEMPLATE: &str = r#"# recwatch configuration

[catalog]
# URL returning a JSON array of available item identifiers
url = ""
# Optional form login endpoint; without it credentials are sent as basic auth
# login_url = ""
username = ""
password = ""

[recorder]
# Cycle repeat timer in seconds (minimum: 30, maximum: 86400)
interval_secs = 60
# Seconds a capture must survive before it counts as started
grace_period_secs = 4
output_root = "Recordings"

[capture]
program = "streamlink"
url_template = "https://catalog.example/{item}"
quality = "best"
extension = "ts"

[transcode]
enabled = false
program = "ffmpeg"
extension = "mp4"

[logging]
directory = "logs"
"#;

/// Load configuration from file with environment variable overrides
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.display().to_string()));
    }

    let config: Config = Figment::new()
        .merge(Toml::file(path))
        .merge(Env::prefixed("RECWATCH_").split("__"))
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))?;

    Ok(config)
}

/// Load configuration from TOML string (useful for testing)
pub fn load_config_from_str(toml_str: &str) -> Result<Config, ConfigError> {
    toml::from_str(toml_str).map_err(|e| ConfigError::ParseError(e.to_string()))
}

/// Write the first-run template, creating parent directories as needed.
pub fn write_default_config(path: &Path) -> Result<(), ConfigError> {
    let write_failed = |source| ConfigError::WriteFailed {
        path: path.display().to_string(),
        source,
    };

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(write_failed)?;
        }
    }
    std::fs::write(path, DEFAULT_CONFIG_TEMPLATE).map_err(write_failed)
}
