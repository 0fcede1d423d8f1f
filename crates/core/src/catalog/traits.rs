//! Trait definitions for the catalog module.

use async_trait::async_trait;

use super::error::CatalogError;

/// Supplies the identifiers of items that can be captured right now.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Returns the name of this catalog implementation.
    fn name(&self) -> &str;

    /// Checks that the catalog is reachable and accepts our credentials.
    async fn validate(&self) -> Result<(), CatalogError>;

    /// Current available item identifiers, in catalog order.
    ///
    /// Identifiers are safe to use as directory names. The list may contain
    /// duplicates; callers deduplicate.
    async fn available_items(&self) -> Result<Vec<String>, CatalogError>;
}
