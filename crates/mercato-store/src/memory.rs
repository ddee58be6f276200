//! In-memory document store with per-document version tokens.

use std::collections::HashMap;

use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::RwLock;

use crate::StoreError;

/// Version assigned to a key that has never been written.
pub const ABSENT: u64 = 0;

/// A document together with the version it was read at.
#[derive(Debug, Clone, PartialEq)]
pub struct Versioned<T> {
    /// Version token to hand back to `compare_and_swap`.
    pub version: u64,
    /// The decoded document.
    pub value: T,
}

#[derive(Debug)]
struct Document {
    version: u64,
    bytes: Vec<u8>,
}

/// Document store keeping JSON-encoded values in memory.
///
/// Every write bumps the document's version. Writers that read a document
/// and want to replace it use `compare_and_swap` with the version they saw;
/// a concurrent writer that got there first makes the swap fail with
/// [`StoreError::VersionConflict`] instead of being silently overwritten.
#[derive(Debug, Default)]
pub struct MemoryStore {
    documents: RwLock<HashMap<String, Document>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a document.
    ///
    /// Returns `None` if the key doesn't exist.
    pub async fn get<T: DeserializeOwned>(
        &self,
        key: &str,
    ) -> Result<Option<Versioned<T>>, StoreError> {
        let documents = self.documents.read().await;
        match documents.get(key) {
            Some(doc) => Ok(Some(Versioned {
                version: doc.version,
                value: serde_json::from_slice(&doc.bytes)?,
            })),
            None => Ok(None),
        }
    }

    /// Insert a new document.
    ///
    /// Fails with [`StoreError::AlreadyExists`] if the key is taken, which
    /// makes the key usable as a unique constraint.
    pub async fn insert<T: Serialize>(&self, key: &str, value: &T) -> Result<u64, StoreError> {
        self.compare_and_swap(key, ABSENT, value)
            .await
            .map_err(|e| match e {
                StoreError::VersionConflict { key, .. } => StoreError::AlreadyExists(key),
                other => other,
            })
    }

    /// Replace a document if its version still matches `expected`.
    ///
    /// `expected == ABSENT` creates the document and fails if it exists.
    /// Returns the new version.
    pub async fn compare_and_swap<T: Serialize>(
        &self,
        key: &str,
        expected: u64,
        value: &T,
    ) -> Result<u64, StoreError> {
        let bytes = serde_json::to_vec(value)?;
        let mut documents = self.documents.write().await;

        let actual = documents.get(key).map(|d| d.version).unwrap_or(ABSENT);
        if actual != expected {
            return Err(StoreError::VersionConflict {
                key: key.to_string(),
                expected,
                actual,
            });
        }

        let version = actual + 1;
        documents.insert(key.to_string(), Document { version, bytes });
        Ok(version)
    }

    /// Decode every document whose key starts with `prefix`, in key order.
    pub async fn scan<T: DeserializeOwned>(
        &self,
        prefix: &str,
    ) -> Result<Vec<Versioned<T>>, StoreError> {
        let documents = self.documents.read().await;
        let mut entries: Vec<(&String, &Document)> = documents
            .iter()
            .filter(|(k, _)| k.starts_with(prefix))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));

        entries
            .into_iter()
            .map(|(_, doc)| {
                Ok(Versioned {
                    version: doc.version,
                    value: serde_json::from_slice(&doc.bytes)?,
                })
            })
            .collect()
    }
}

/// Helper to build store keys with namespacing.
///
/// # Example
///
/// ```rust
/// use mercato_store::store_key;
/// let key = store_key!("cart", "user123");
/// assert_eq!(key, "cart:user123");
/// ```
#[macro_export]
macro_rules! store_key {
    ($prefix:expr, $($part:expr),+) => {{
        let mut key = String::from($prefix);
        $(
            key.push(':');
            key.push_str(&$part.to_string());
        )+
        key
    }};
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Counter {
        hits: u32,
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let store = MemoryStore::new();
        let version = store.insert("c:1", &Counter { hits: 1 }).await.unwrap();
        assert_eq!(version, 1);

        let doc: Versioned<Counter> = store.get("c:1").await.unwrap().unwrap();
        assert_eq!(doc.version, 1);
        assert_eq!(doc.value.hits, 1);
    }

    #[tokio::test]
    async fn test_get_missing() {
        let store = MemoryStore::new();
        let doc: Option<Versioned<Counter>> = store.get("c:missing").await.unwrap();
        assert!(doc.is_none());
    }

    #[tokio::test]
    async fn test_insert_duplicate_rejected() {
        let store = MemoryStore::new();
        store.insert("c:1", &Counter { hits: 1 }).await.unwrap();
        let err = store.insert("c:1", &Counter { hits: 2 }).await.unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists(ref k) if k == "c:1"));
    }

    #[tokio::test]
    async fn test_compare_and_swap_bumps_version() {
        let store = MemoryStore::new();
        store.insert("c:1", &Counter { hits: 1 }).await.unwrap();
        let v = store
            .compare_and_swap("c:1", 1, &Counter { hits: 2 })
            .await
            .unwrap();
        assert_eq!(v, 2);
    }

    #[tokio::test]
    async fn test_stale_version_conflicts() {
        let store = MemoryStore::new();
        store.insert("c:1", &Counter { hits: 1 }).await.unwrap();
        store
            .compare_and_swap("c:1", 1, &Counter { hits: 2 })
            .await
            .unwrap();

        let err = store
            .compare_and_swap("c:1", 1, &Counter { hits: 3 })
            .await
            .unwrap_err();
        assert!(err.is_conflict());

        let doc: Versioned<Counter> = store.get("c:1").await.unwrap().unwrap();
        assert_eq!(doc.value.hits, 2);
    }

    #[tokio::test]
    async fn test_swap_from_absent_creates() {
        let store = MemoryStore::new();
        let v = store
            .compare_and_swap("c:new", ABSENT, &Counter { hits: 0 })
            .await
            .unwrap();
        assert_eq!(v, 1);
        let doc: Option<Versioned<Counter>> = store.get("c:new").await.unwrap();
        assert_eq!(doc.map(|d| d.value.hits), Some(0));
    }

    #[tokio::test]
    async fn test_scan_by_prefix() {
        let store = MemoryStore::new();
        store.insert("c:2", &Counter { hits: 2 }).await.unwrap();
        store.insert("c:1", &Counter { hits: 1 }).await.unwrap();
        store.insert("other:1", &Counter { hits: 9 }).await.unwrap();

        let docs: Vec<Versioned<Counter>> = store.scan("c:").await.unwrap();
        let hits: Vec<u32> = docs.iter().map(|d| d.value.hits).collect();
        assert_eq!(hits, vec![1, 2]);
    }

    #[test]
    fn test_store_key() {
        assert_eq!(store_key!("order", "ORD1"), "order:ORD1");
        assert_eq!(store_key!("a", 1, "b"), "a:1:b");
    }
}
