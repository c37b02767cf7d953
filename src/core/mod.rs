pub mod error;
pub mod types;

pub use error::{ErrorCategory, Result, SyncError};
pub use types::{CatalogKind, EntityId, EntityKind, Version};
