//! Error types for the process module.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while launching or supervising a process.
#[derive(Debug, Error)]
pub enum ProcessError {
    /// Program binary not found.
    #[error("Program not found: {path}")]
    ProgramNotFound { path: PathBuf },

    /// The program exists but could not be started.
    #[error("Failed to spawn {program}: {source}")]
    SpawnFailed {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The program started but reported no process id.
    #[error("Spawned {program} has no process id")]
    MissingPid { program: PathBuf },

    /// Sending a signal to the process failed.
    #[error("Failed to signal process {pid}: {reason}")]
    SignalFailed { pid: u32, reason: String },

    /// I/O error while polling or waiting.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProcessError {
    /// Maps a spawn error, singling out a missing binary.
    pub fn from_spawn(program: &std::path::Path, error: std::io::Error) -> Self {
        if error.kind() == std::io::ErrorKind::NotFound {
            Self::ProgramNotFound {
                path: program.to_path_buf(),
            }
        } else {
            Self::SpawnFailed {
                program: program.to_path_buf(),
                source: error,
            }
        }
    }

    /// Whether this error affects every launch rather than a single task.
    pub fn is_systemic(&self) -> bool {
        matches!(self, Self::ProgramNotFound { .. })
    }
}
