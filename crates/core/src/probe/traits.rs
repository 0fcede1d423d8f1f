//! Trait definitions for the probe module.

use async_trait::async_trait;
use std::path::Path;

use super::error::ProbeError;

/// Filesystem operations the recorder depends on.
#[async_trait]
pub trait FileProbe: Send + Sync {
    /// Whether `path` exists.
    async fn exists(&self, path: &Path) -> bool;

    /// Size of the file at `path` in bytes.
    async fn size(&self, path: &Path) -> Result<u64, ProbeError>;

    /// Deletes the file at `path`.
    async fn remove(&self, path: &Path) -> Result<(), ProbeError>;

    /// Creates `path` and its parents if missing.
    async fn ensure_dir(&self, path: &Path) -> Result<(), ProbeError>;
}
