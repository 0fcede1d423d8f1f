//! Testing utilities and mock implementations.
//!
//! This module provides mock implementations of the collaborator traits,
//! allowing whole recorder cycles to run without real programs or a real
//! catalog.
//!
//! # Example
//!
//! ```rust,ignore
//! use recwatch_core::testing::{fixtures, MockCatalogSource, MockProcessLauncher};
//!
//! let launcher = MockProcessLauncher::new();
//! let catalog = MockCatalogSource::with_items(["alice", "bob"]);
//!
//! let mut recorder = fixtures::recorder(dir.path(), &catalog, &launcher);
//! recorder.run_cycle().await?;
//! assert_eq!(launcher.launch_count(), 2);
//! ```

mod mock_catalog;
mod mock_process;

pub use mock_catalog::MockCatalogSource;
pub use mock_process::{
    LaunchBehavior, MockProcessHandle, MockProcessLauncher, RecordedLaunch, MOCK_SIGTERM,
};

/// Test fixtures and helper functions.
pub mod fixtures {
    use std::path::{Path, PathBuf};
    use std::sync::Arc;

    use super::{MockCatalogSource, MockProcessLauncher};
    use crate::config::{CatalogConfig, Config, LoggingConfig};
    use crate::probe::LocalFileProbe;
    use crate::recorder::{Recorder, RecorderSettings};

    /// Recorder settings writing under `output_root`, transcoding disabled.
    pub fn settings(output_root: &Path) -> RecorderSettings {
        let mut settings = RecorderSettings::default();
        settings.recorder.output_root = output_root.to_path_buf();
        settings
    }

    /// Same as [`settings`] with transcoding enabled.
    pub fn transcoding_settings(output_root: &Path) -> RecorderSettings {
        let mut settings = settings(output_root);
        settings.transcode.enabled = true;
        settings
    }

    /// A recorder over the mocks and the local filesystem.
    pub fn recorder_with(
        settings: RecorderSettings,
        catalog: &MockCatalogSource,
        launcher: &MockProcessLauncher,
    ) -> Recorder {
        Recorder::new(
            settings,
            Arc::new(catalog.clone()),
            Arc::new(launcher.clone()),
            Arc::new(LocalFileProbe::new()),
        )
    }

    /// A recorder with default settings writing under `output_root`.
    pub fn recorder(
        output_root: &Path,
        catalog: &MockCatalogSource,
        launcher: &MockProcessLauncher,
    ) -> Recorder {
        recorder_with(settings(output_root), catalog, launcher)
    }

    /// A valid configuration pointing at `catalog_url`.
    pub fn config(catalog_url: &str, output_root: &Path) -> Config {
        let settings = settings(output_root);
        Config {
            catalog: CatalogConfig::with_url(catalog_url),
            recorder: settings.recorder,
            capture: settings.capture,
            transcode: settings.transcode,
            logging: LoggingConfig { directory: None },
        }
    }

    /// Writes `size` bytes to `path`, creating parent directories.
    pub fn write_bytes(path: &Path, size: usize) -> PathBuf {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create fixture directory");
        }
        std::fs::write(path, vec![0u8; size]).expect("write fixture file");
        path.to_path_buf()
    }
}
