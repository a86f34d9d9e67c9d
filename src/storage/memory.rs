//! In-memory object store for development mode and tests

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

use super::{ObjectStore, ObjectStoreError};

/// A stored blob and the content type it was written with
#[derive(Debug, Clone)]
pub struct MemoryObject {
    pub data: Bytes,
    pub content_type: String,
}

#[derive(Default)]
pub struct InMemoryObjectStore {
    objects: RwLock<HashMap<String, MemoryObject>>,
    fail_puts: AtomicBool,
    fail_deletes: AtomicBool,
}

impl InMemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn set_fail_puts(&self, fail: bool) {
        self.fail_puts.store(fail, Ordering::SeqCst);
    }

    #[cfg(test)]
    pub fn set_fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }

    #[cfg(test)]
    pub fn get(&self, key: &str) -> Option<MemoryObject> {
        self.objects.read().get(key).cloned()
    }

    #[cfg(test)]
    pub fn keys(&self) -> Vec<String> {
        self.objects.read().keys().cloned().collect()
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn put(
        &self,
        key: &str,
        data: Bytes,
        content_type: &str,
        content_length: u64,
    ) -> Result<(), ObjectStoreError> {
        if self.fail_puts.load(Ordering::SeqCst) {
            return Err(ObjectStoreError::UploadFailed(format!("simulated failure for {}", key)));
        }
        if data.len() as u64 != content_length {
            return Err(ObjectStoreError::UploadFailed(format!(
                "content length {} does not match body of {} bytes",
                content_length,
                data.len()
            )));
        }

        debug!(key = %key, size = content_length, "Stored object in memory");
        self.objects.write().insert(
            key.to_string(),
            MemoryObject { data, content_type: content_type.to_string() },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), ObjectStoreError> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(ObjectStoreError::DeleteFailed(format!("simulated failure for {}", key)));
        }
        // S3 semantics: deleting a missing key succeeds
        self.objects.write().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_and_delete() {
        let store = InMemoryObjectStore::new();
        store.put("u/a.png", Bytes::from_static(b"abc"), "image/png", 3).await.unwrap();

        let object = store.get("u/a.png").unwrap();
        assert_eq!(object.data.as_ref(), b"abc");
        assert_eq!(object.content_type, "image/png");

        store.delete("u/a.png").await.unwrap();
        assert!(store.get("u/a.png").is_none());
        store.delete("u/a.png").await.unwrap();
    }

    #[tokio::test]
    async fn test_length_mismatch_rejected() {
        let store = InMemoryObjectStore::new();
        let result = store.put("u/a", Bytes::from_static(b"abc"), "text/plain", 4).await;
        assert!(matches!(result, Err(ObjectStoreError::UploadFailed(_))));
        assert!(store.keys().is_empty());
    }
}
