use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use tracing::debug;

use crate::gateway::{ObjectHead, StoreError, StoredObject, StoreGateway};

type Bucket = HashMap<String, StoredObject>;

/// In-process [`StoreGateway`] holding objects in memory.
///
/// Only the buckets given at construction exist; any call against another
/// bucket fails as unavailable, like a store without that bucket would.
#[derive(Debug, Default)]
pub struct MemoryGateway {
    buckets: RwLock<HashMap<String, Bucket>>,
    calls: AtomicUsize,
}

impl MemoryGateway {
    pub fn new<I, S>(buckets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let buckets = buckets
            .into_iter()
            .map(|name| (name.into(), Bucket::new()))
            .collect();
        Self {
            buckets: RwLock::new(buckets),
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of put/get/head calls received so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Number of objects stored in `bucket`.
    pub fn object_count(&self, bucket: &str) -> usize {
        self.buckets
            .read()
            .map(|buckets| buckets.get(bucket).map_or(0, Bucket::len))
            .unwrap_or(0)
    }

    fn lookup(&self, bucket: &str, key: &str) -> Result<StoredObject, StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let buckets = self
            .buckets
            .read()
            .map_err(|_| StoreError::unavailable(anyhow::anyhow!("memory store lock poisoned")))?;
        let objects = buckets
            .get(bucket)
            .ok_or_else(|| StoreError::unavailable(anyhow::anyhow!("no such bucket: {}", bucket)))?;
        objects
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::not_found(bucket, key))
    }
}

#[async_trait]
impl StoreGateway for MemoryGateway {
    async fn put(
        &self,
        bucket: &str,
        key: &str,
        body: Bytes,
        content_type: &str,
        metadata: HashMap<String, String>,
    ) -> Result<(), StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut buckets = self
            .buckets
            .write()
            .map_err(|_| StoreError::unavailable(anyhow::anyhow!("memory store lock poisoned")))?;
        let objects = buckets
            .get_mut(bucket)
            .ok_or_else(|| StoreError::unavailable(anyhow::anyhow!("no such bucket: {}", bucket)))?;

        debug!(bucket, key, size = body.len(), "Storing object in memory");
        let head = ObjectHead {
            content_type: Some(content_type.to_string()),
            content_length: Some(body.len() as u64),
            last_modified: Some(Utc::now()),
            metadata,
        };
        objects.insert(key.to_string(), StoredObject { body, head });
        Ok(())
    }

    async fn get(&self, bucket: &str, key: &str) -> Result<StoredObject, StoreError> {
        self.lookup(bucket, key)
    }

    async fn head(&self, bucket: &str, key: &str) -> Result<ObjectHead, StoreError> {
        self.lookup(bucket, key).map(|object| object.head)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_get_head() {
        let store = MemoryGateway::new(["b0"]);
        let mut metadata = HashMap::new();
        metadata.insert("k".to_string(), "v".to_string());

        store
            .put("b0", "a/b", Bytes::from_static(b"data"), "text/plain", metadata.clone())
            .await
            .unwrap();

        let object = store.get("b0", "a/b").await.unwrap();
        assert_eq!(object.body, Bytes::from_static(b"data"));
        let head = store.head("b0", "a/b").await.unwrap();
        assert_eq!(head.content_type.as_deref(), Some("text/plain"));
        assert_eq!(head.content_length, Some(4));
        assert_eq!(head.metadata, metadata);
        assert_eq!(store.object_count("b0"), 1);
        assert_eq!(store.calls(), 3);
    }

    #[tokio::test]
    async fn test_missing_key_is_not_found() {
        let store = MemoryGateway::new(["b0"]);
        let err = store.get("b0", "nope").await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_unknown_bucket_is_unavailable() {
        let store = MemoryGateway::new(["b0"]);
        let err = store.head("other", "k").await.unwrap_err();
        assert!(matches!(err, StoreError::Unavailable { .. }));

        let err = store
            .put("other", "k", Bytes::new(), "text/plain", HashMap::new())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Unavailable { .. }));
    }
}
