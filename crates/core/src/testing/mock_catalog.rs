//! Mock catalog source for testing.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::catalog::{CatalogError, CatalogSource};

/// Mock implementation of the CatalogSource trait.
///
/// Returns whatever list was set last, counting the requests it serves.
///
/// # Example
///
/// ```rust,ignore
/// let catalog = MockCatalogSource::new();
/// catalog.set_items(["alice", "bob"]).await;
///
/// let items = catalog.available_items().await?;
/// assert_eq!(items, vec!["alice", "bob"]);
///
/// // Simulate an outage on the next request
/// catalog.set_next_error(CatalogError::Http { status: 500 }).await;
/// ```
#[derive(Debug, Clone, Default)]
pub struct MockCatalogSource {
    items: Arc<RwLock<Vec<String>>>,
    /// If set, the next request will fail with this error.
    next_error: Arc<RwLock<Option<CatalogError>>>,
    requests: Arc<RwLock<u32>>,
}

impl MockCatalogSource {
    /// Create a new mock catalog with no available items.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock catalog listing `items`.
    pub fn with_items<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            items: Arc::new(RwLock::new(items.into_iter().map(Into::into).collect())),
            ..Self::default()
        }
    }

    /// Replace the available items.
    pub async fn set_items<I, S>(&self, items: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        *self.items.write().await = items.into_iter().map(Into::into).collect();
    }

    /// Make the next request fail.
    pub async fn set_next_error(&self, error: CatalogError) {
        *self.next_error.write().await = Some(error);
    }

    /// Number of `available_items` calls served so far.
    pub async fn request_count(&self) -> u32 {
        *self.requests.read().await
    }
}

#[async_trait]
impl CatalogSource for MockCatalogSource {
    fn name(&self) -> &str {
        "mock"
    }

    async fn validate(&self) -> Result<(), CatalogError> {
        match self.next_error.write().await.take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    async fn available_items(&self) -> Result<Vec<String>, CatalogError> {
        *self.requests.write().await += 1;

        if let Some(error) = self.next_error.write().await.take() {
            return Err(error);
        }
        Ok(self.items.read().await.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_items_and_error() {
        let catalog = MockCatalogSource::with_items(["alice"]);
        assert_eq!(catalog.available_items().await.unwrap(), vec!["alice"]);

        catalog.set_items(["bob", "carol"]).await;
        catalog
            .set_next_error(CatalogError::Unreachable {
                attempts: 5,
                reason: "connection refused".to_string(),
            })
            .await;

        assert!(catalog.available_items().await.is_err());
        assert_eq!(catalog.available_items().await.unwrap(), vec!["bob", "carol"]);
        assert_eq!(catalog.request_count().await, 3);
    }
}
