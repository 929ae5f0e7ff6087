//! Blob storage for attachment content.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;

/// Content-addressed byte storage for attachment blobs.
///
/// Implementations must be thread-safe (`Send + Sync`) as they are
/// shared across concurrent dispatches.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Fetch a blob by key, `None` when absent.
    async fn get(&self, key: &str) -> Option<Vec<u8>>;

    /// Store a blob under the given key, replacing any previous content.
    async fn put(&self, key: &str, bytes: Vec<u8>);

    /// Remove a blob. Returns whether it existed.
    async fn remove(&self, key: &str) -> bool;
}

/// In-memory blob store backed by a `DashMap`.
#[derive(Default)]
pub struct MemoryBlobStore {
    blobs: DashMap<String, Vec<u8>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.blobs.get(key).map(|b| b.clone())
    }

    async fn put(&self, key: &str, bytes: Vec<u8>) {
        self.blobs.insert(key.to_string(), bytes);
    }

    async fn remove(&self, key: &str) -> bool {
        self.blobs.remove(key).is_some()
    }
}

/// Create an Arc-wrapped in-memory blob store
pub fn create_blob_store() -> Arc<dyn BlobStore> {
    Arc::new(MemoryBlobStore::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_get_remove() {
        let store = MemoryBlobStore::new();
        store.put("terms", b"pdf bytes".to_vec()).await;

        assert_eq!(store.get("terms").await.as_deref(), Some(&b"pdf bytes"[..]));
        assert!(store.remove("terms").await);
        assert!(store.get("terms").await.is_none());
        assert!(!store.remove("terms").await);
    }
}
