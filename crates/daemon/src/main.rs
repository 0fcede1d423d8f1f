mod logging;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{debug, error, info};

use recwatch_core::{
    load_config, validate_config, write_default_config, CatalogSource, HttpCatalogSource,
    LocalFileProbe, ProcessLauncher, Recorder, RecorderSettings, SanitizedConfig,
    TokioProcessLauncher,
};

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Used when `RECWATCH_CONFIG` is not set
const DEFAULT_CONFIG_PATH: &str = "config/recwatch.toml";

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        // Logging is not up yet when the config itself is broken
        if logging::is_initialized() {
            error!("Fatal error: {:#}", e);
        } else {
            eprintln!("Fatal error: {:#}", e);
        }
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Determine config path
    let config_path = std::env::var("RECWATCH_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));

    if !config_path.exists() {
        write_default_config(&config_path).context("Failed to write configuration template")?;
        println!(
            "No configuration found. A template was written to {}; fill in the [catalog] section and start recwatch again.",
            config_path.display()
        );
        return Ok(());
    }

    // Load configuration
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    // Validate configuration
    validate_config(&config).with_context(|| format!("Invalid configuration in {:?}", config_path))?;

    let log_path = logging::init(config.logging.directory.as_deref())?;

    info!("recwatch {} starting", VERSION);
    info!("Configuration loaded from {:?}", config_path);
    if let Some(path) = &log_path {
        info!("Writing log to {:?}", path);
    }
    debug!(
        "Effective configuration: {}",
        serde_json::to_string(&SanitizedConfig::from(&config)).unwrap_or_default()
    );

    // Check the external programs before anything is launched
    let launcher: Arc<dyn ProcessLauncher> = Arc::new(TokioProcessLauncher::new());
    launcher
        .validate(&config.capture.program, &config.capture.version_arg)
        .await
        .with_context(|| format!("Capture program {:?} is not usable", config.capture.program))?;
    if config.transcode.enabled {
        launcher
            .validate(&config.transcode.program, &config.transcode.version_arg)
            .await
            .with_context(|| {
                format!(
                    "Transcode program {:?} is not usable",
                    config.transcode.program
                )
            })?;
    } else {
        info!("Transcoding disabled");
    }

    let catalog: Arc<dyn CatalogSource> = Arc::new(
        HttpCatalogSource::new(config.catalog.clone()).context("Failed to create catalog client")?,
    );

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    let checked = tokio::select! {
        result = catalog.validate() => Some(result),
        _ = &mut shutdown => None,
    };
    match checked {
        Some(result) => result.context("Catalog check failed")?,
        None => {
            info!("Shutdown requested before the first cycle");
            return Ok(());
        }
    }

    let mut recorder = Recorder::new(
        RecorderSettings::from(&config),
        catalog,
        launcher,
        Arc::new(LocalFileProbe::new()),
    );
    info!(
        "Recording to {:?}, checking every {}s",
        config.recorder.output_root, config.recorder.interval_secs
    );

    let mut stopping = false;
    let outcome = loop {
        // A started cycle always runs to completion so every launched
        // process ends up tracked and reachable by terminate_all.
        let result = {
            let cycle = recorder.run_cycle();
            tokio::pin!(cycle);
            let early = tokio::select! {
                result = &mut cycle => Some(result),
                _ = &mut shutdown => None,
            };
            match early {
                Some(result) => result,
                None => {
                    info!("Shutdown requested, finishing the current cycle");
                    stopping = true;
                    cycle.await
                }
            }
        };

        match result {
            Ok(report) => {
                let status = recorder.status();
                info!(
                    "Cycle {}: {} capturing, {} transcoding",
                    report.cycle, status.active_captures, status.active_transcodes
                );
            }
            Err(e) => break Err(e),
        }
        if stopping {
            break Ok(());
        }

        let interrupted = tokio::select! {
            _ = tokio::time::sleep(recorder.interval()) => false,
            _ = &mut shutdown => true,
        };
        if interrupted {
            break Ok(());
        }
    };

    let signalled = recorder.terminate_all();
    info!("Sent terminate to {} process(es), shutting down", signalled);

    outcome.context("Recorder stopped")
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
