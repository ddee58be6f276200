//! Versioned document store for Mercato.
//!
//! Documents are stored as JSON under string keys. Each document carries a
//! version token that is bumped on every write, so read-modify-write cycles
//! can detect concurrent writers through `compare_and_swap`.
//!
//! # Example
//!
//! ```rust,ignore
//! use mercato_store::{Collection, MemoryStore};
//! use std::sync::Arc;
//!
//! let store = Arc::new(MemoryStore::new());
//! let carts: Collection<Cart> = Collection::new(store, "cart");
//!
//! let current = carts.get("user123").await?;
//! let version = current.as_ref().map(|c| c.version).unwrap_or(mercato_store::ABSENT);
//! carts.compare_and_swap("user123", version, &updated).await?;
//! ```

mod collection;
mod error;
mod memory;

pub use collection::Collection;
pub use error::StoreError;
pub use memory::{MemoryStore, Versioned, ABSENT};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::{store_key, Collection, MemoryStore, StoreError, Versioned, ABSENT};
}
