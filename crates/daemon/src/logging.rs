//! Log output: console plus an optional per-run log file.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use anyhow::{Context, Result};
use chrono::Local;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Log file name inside the per-run directory.
const LOG_FILE_NAME: &str = "recwatch.log";

/// Filter for the file layer: everything of ours at debug, dependencies at info.
const FILE_FILTER: &str = "info,recwatch=debug,recwatch_core=debug";

static INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Whether [`init`] has installed the subscriber.
pub fn is_initialized() -> bool {
    INITIALIZED.load(Ordering::SeqCst)
}

/// Installs the global subscriber.
///
/// The console honours `RUST_LOG` (default `info`). With a `directory`, a
/// plain-text debug log is also written to
/// `<directory>/<YYYY-MM-DD_HH-MM-SS>/recwatch.log`, whose path is returned.
pub fn init(directory: Option<&Path>) -> Result<Option<PathBuf>> {
    let console = tracing_subscriber::fmt::layer().with_filter(
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    );

    let (file_layer, log_path) = match directory {
        Some(directory) => {
            let (file, path) = create_run_log(directory)?;
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .with_filter(EnvFilter::new(FILE_FILTER));
            (Some(layer), Some(path))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(console)
        .with(file_layer)
        .try_init()
        .context("Failed to install log subscriber")?;
    INITIALIZED.store(true, Ordering::SeqCst);

    Ok(log_path)
}

fn create_run_log(directory: &Path) -> Result<(File, PathBuf)> {
    let run_dir = directory.join(Local::now().format("%Y-%m-%d_%H-%M-%S").to_string());
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("Failed to create log directory {:?}", run_dir))?;

    let path = run_dir.join(LOG_FILE_NAME);
    let file =
        File::create(&path).with_context(|| format!("Failed to create log file {:?}", path))?;
    Ok((file, path))
}
