//! Error types for the catalog module.

use thiserror::Error;

/// Errors from a catalog source. Every variant is fatal to the recorder.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Transient failures persisted through every retry.
    #[error("catalog unreachable after {attempts} attempts: {reason}")]
    Unreachable { attempts: u32, reason: String },

    #[error("catalog authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("malformed catalog response: {0}")]
    MalformedResponse(String),

    #[error("catalog returned HTTP {status}")]
    Http { status: u16 },

    #[error("catalog configuration error: {0}")]
    Configuration(String),
}
