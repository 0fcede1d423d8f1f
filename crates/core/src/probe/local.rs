//! Local filesystem probe.

use async_trait::async_trait;
use std::path::Path;
use tokio::fs;
use tracing::debug;

use super::error::ProbeError;
use super::traits::FileProbe;

/// [`FileProbe`] over the local filesystem via `tokio::fs`.
#[derive(Debug, Default, Clone)]
pub struct LocalFileProbe;

impl LocalFileProbe {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl FileProbe for LocalFileProbe {
    async fn exists(&self, path: &Path) -> bool {
        fs::try_exists(path).await.unwrap_or(false)
    }

    async fn size(&self, path: &Path) -> Result<u64, ProbeError> {
        let meta = fs::metadata(path)
            .await
            .map_err(|e| ProbeError::from_io(path, e))?;
        Ok(meta.len())
    }

    async fn remove(&self, path: &Path) -> Result<(), ProbeError> {
        fs::remove_file(path)
            .await
            .map_err(|e| ProbeError::from_io(path, e))
    }

    async fn ensure_dir(&self, path: &Path) -> Result<(), ProbeError> {
        if fs::try_exists(path).await.unwrap_or(false) {
            return Ok(());
        }
        fs::create_dir_all(path)
            .await
            .map_err(|e| ProbeError::from_io(path, e))?;
        debug!("Directory created: {}", path.display());
        Ok(())
    }
}
