//! Recorder - the cycle controller that keeps one capture running per
//! available catalog item.
//!
//! Each cycle:
//! - **Reap**: collect exited processes; on even cycles terminate captures
//!   whose file stopped growing
//! - **Follow up**: delete empty captures, chain a transcode for finished ones,
//!   delete the capture once its transcode succeeded
//! - **Discover**: start a capture for every listed item not already recorded
//!
//! # Example
//!
//! ```rust,ignore
//! use recwatch_core::recorder::{Recorder, RecorderSettings};
//!
//! let mut recorder = Recorder::new(
//!     RecorderSettings::from(&config),
//!     catalog,
//!     launcher,
//!     probe,
//! );
//! loop {
//!     let report = recorder.run_cycle().await?;
//!     tokio::time::sleep(recorder.interval()).await;
//! }
//! ```

mod chain;
mod config;
mod controller;
mod launch;
mod types;

pub use config::{CaptureConfig, RecorderConfig, RecorderSettings, TranscodeConfig};
pub use controller::Recorder;
pub use types::{CycleReport, RecorderError, RecorderStatus};
