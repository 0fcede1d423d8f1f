//! Active task records and the in-memory task store.

mod store;
mod types;

pub use store::{TaskStore, TaskStoreError};
pub use types::{Task, TaskKind};
