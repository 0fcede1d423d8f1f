//! Types for the recorder.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that end the recorder. Per-task failures never surface here.
#[derive(Debug, Error)]
pub enum RecorderError {
    /// Catalog source error.
    #[error("catalog error: {0}")]
    Catalog(#[from] crate::catalog::CatalogError),

    /// An external program is missing.
    #[error("launcher error: {0}")]
    Launcher(#[from] crate::process::ProcessError),
}

/// What one cycle did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleReport {
    pub cycle: u64,
    /// Pids reaped because their process exited (or could not be polled).
    pub ended: Vec<u32>,
    /// Pids of captures terminated for not growing.
    pub stalled: Vec<u32>,
    /// Items whose capture was registered.
    pub captures_started: Vec<String>,
    /// Items whose capture exited within the grace period or failed to spawn.
    pub captures_failed: Vec<String>,
    /// Source files a transcode was registered for.
    pub transcodes_started: usize,
}

impl CycleReport {
    pub(super) fn new(cycle: u64) -> Self {
        Self {
            cycle,
            ..Default::default()
        }
    }
}

/// Current status of the recorder.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecorderStatus {
    pub cycle_count: u64,
    pub active_captures: usize,
    pub active_transcodes: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CatalogError;

    #[test]
    fn test_error_display() {
        let err = RecorderError::from(CatalogError::Http { status: 500 });
        assert_eq!(err.to_string(), "catalog error: catalog returned HTTP 500");
    }

    #[test]
    fn test_status_serialization() {
        let status = RecorderStatus {
            cycle_count: 7,
            active_captures: 2,
            active_transcodes: 1,
        };
        let json = serde_json::to_string(&status).unwrap();
        assert_eq!(
            json,
            r#"{"cycle_count":7,"active_captures":2,"active_transcodes":1}"#
        );
    }
}
