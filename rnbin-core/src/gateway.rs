use std::collections::HashMap;
use std::fmt;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};

/// Failure vocabulary of a [`StoreGateway`].
///
/// Implementations must report a missing object as [`StoreError::NotFound`]
/// from the store's status signal (status code or typed error), never by
/// matching on message text.
#[derive(Debug)]
pub enum StoreError {
    NotFound { bucket: String, key: String },
    /// Timeouts, permission errors, transient service errors, ...
    Unavailable { source: anyhow::Error },
}

impl StoreError {
    pub fn not_found(bucket: &str, key: &str) -> Self {
        StoreError::NotFound {
            bucket: bucket.to_string(),
            key: key.to_string(),
        }
    }

    pub fn unavailable(source: impl Into<anyhow::Error>) -> Self {
        StoreError::Unavailable {
            source: source.into(),
        }
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::NotFound { bucket, key } => write!(f, "No such key: {}/{}", bucket, key),
            StoreError::Unavailable { source } => write!(f, "Store unavailable: {}", source),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::Unavailable { source } => Some(source.as_ref()),
            StoreError::NotFound { .. } => None,
        }
    }
}

/// What the store reports about an object, as returned by a head or get call.
///
/// Every field is optional at the source. `metadata` is the raw per-object
/// user metadata; decoding it is left to [`crate::meta`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectHead {
    pub content_type: Option<String>,
    pub content_length: Option<u64>,
    pub last_modified: Option<DateTime<Utc>>,
    pub metadata: HashMap<String, String>,
}

/// Content and head of an object.
#[derive(Debug, Clone)]
pub struct StoredObject {
    pub body: Bytes,
    pub head: ObjectHead,
}

/// Remote object store client.
///
/// Timeouts and retries belong to the implementation. Callers cancel an
/// operation by dropping its future.
#[async_trait]
pub trait StoreGateway: Send + Sync + 'static {
    async fn put(
        &self,
        bucket: &str,
        key: &str,
        body: Bytes,
        content_type: &str,
        metadata: HashMap<String, String>,
    ) -> Result<(), StoreError>;

    async fn get(&self, bucket: &str, key: &str) -> Result<StoredObject, StoreError>;

    async fn head(&self, bucket: &str, key: &str) -> Result<ObjectHead, StoreError>;
}
