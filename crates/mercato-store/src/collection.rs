//! Typed, namespaced view over a [`MemoryStore`].

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use serde::{de::DeserializeOwned, Serialize};

use crate::{MemoryStore, StoreError, Versioned};

/// A collection of documents of one type sharing a key namespace.
///
/// Keys are built as `{namespace}:{id}`.
pub struct Collection<T> {
    store: Arc<MemoryStore>,
    namespace: &'static str,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for Collection<T> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            namespace: self.namespace,
            _marker: PhantomData,
        }
    }
}

impl<T> fmt::Debug for Collection<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collection")
            .field("namespace", &self.namespace)
            .finish()
    }
}

impl<T: Serialize + DeserializeOwned> Collection<T> {
    /// Open a collection on a shared store.
    pub fn new(store: Arc<MemoryStore>, namespace: &'static str) -> Self {
        Self {
            store,
            namespace,
            _marker: PhantomData,
        }
    }

    fn key(&self, id: &str) -> String {
        crate::store_key!(self.namespace, id)
    }

    /// Get a document by id.
    pub async fn get(&self, id: &str) -> Result<Option<Versioned<T>>, StoreError> {
        self.store.get(&self.key(id)).await
    }

    /// Insert a document that must not exist yet.
    pub async fn insert(&self, id: &str, value: &T) -> Result<u64, StoreError> {
        self.store.insert(&self.key(id), value).await
    }

    /// Replace a document if it is still at `expected`.
    pub async fn compare_and_swap(
        &self,
        id: &str,
        expected: u64,
        value: &T,
    ) -> Result<u64, StoreError> {
        self.store
            .compare_and_swap(&self.key(id), expected, value)
            .await
    }

    /// All documents in the collection, in key order.
    pub async fn all(&self) -> Result<Vec<Versioned<T>>, StoreError> {
        let prefix = format!("{}:", self.namespace);
        self.store.scan(&prefix).await
    }
}
