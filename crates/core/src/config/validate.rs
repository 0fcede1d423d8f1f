use super::{types::Config, ConfigError};

const MIN_INTERVAL_SECS: u64 = 30;
const MAX_INTERVAL_SECS: u64 = 86_400;

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError(message.into())
}

/// File extensions are given without the dot, e.g. `ts`.
fn check_extension(field: &str, extension: &str) -> Result<(), ConfigError> {
    if extension.is_empty() {
        return Err(invalid(format!("{} cannot be empty", field)));
    }
    if extension.starts_with('.') {
        return Err(invalid(format!(
            "{} must not start with '.', got {:?}",
            field, extension
        )));
    }
    if extension.contains(['/', '\\']) {
        return Err(invalid(format!(
            "{} must not contain a path separator, got {:?}",
            field, extension
        )));
    }
    Ok(())
}

/// Validate configuration
/// Currently validates:
/// - Catalog section exists (enforced by serde) and has a URL
/// - Cycle interval and grace period are in range
/// - Capture and transcode argument templates carry their placeholders
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.catalog.url.trim().is_empty() {
        return Err(invalid("catalog.url cannot be empty"));
    }

    let recorder = &config.recorder;
    if !(MIN_INTERVAL_SECS..=MAX_INTERVAL_SECS).contains(&recorder.interval_secs) {
        return Err(invalid(format!(
            "recorder.interval_secs must be between {} and {}, got {}",
            MIN_INTERVAL_SECS, MAX_INTERVAL_SECS, recorder.interval_secs
        )));
    }
    if recorder.grace_period_secs == 0 {
        return Err(invalid("recorder.grace_period_secs cannot be 0"));
    }

    let capture = &config.capture;
    if capture.program.as_os_str().is_empty() {
        return Err(invalid("capture.program cannot be empty"));
    }
    check_extension("capture.extension", &capture.extension)?;
    if !capture.url_template.contains("{item}") {
        return Err(invalid("capture.url_template must contain {item}"));
    }
    if !capture.args.iter().any(|a| a.contains("{output}")) {
        return Err(invalid("capture.args must contain {output}"));
    }

    let transcode = &config.transcode;
    if transcode.enabled {
        if transcode.program.as_os_str().is_empty() {
            return Err(invalid("transcode.program cannot be empty"));
        }
        check_extension("transcode.extension", &transcode.extension)?;
        if transcode.extension == capture.extension {
            return Err(invalid(
                "transcode.extension must differ from capture.extension",
            ));
        }
        for placeholder in ["{input}", "{output}"] {
            if !transcode.args.iter().any(|a| a.contains(placeholder)) {
                return Err(invalid(format!(
                    "transcode.args must contain {}",
                    placeholder
                )));
            }
        }
    }

    Ok(())
}
