//! Catalog source - the remote list of items currently available for capture.
//!
//! The recorder asks the catalog once per cycle which items are live and
//! starts a capture for every one it is not already recording.
//!
//! # Example
//!
//! ```rust,ignore
//! use recwatch_core::catalog::{CatalogSource, HttpCatalogSource};
//!
//! let catalog = HttpCatalogSource::new(config.catalog.clone())?;
//! catalog.validate().await?;
//! for item in catalog.available_items().await? {
//!     println!("{}", item);
//! }
//! ```

mod error;
mod http;
mod traits;
mod types;

pub use error::CatalogError;
pub use http::HttpCatalogSource;
pub use traits::CatalogSource;
pub use types::{is_valid_item_id, parse_catalog, CatalogEntry, ItemStatus};
