use std::sync::Arc;

use bytes::Bytes;
use tracing::{debug, info, warn};

use crate::config::ShardConfig;
use crate::error::DomainError;
use crate::gateway::StoreGateway;
use crate::hasher::Digest;
use crate::input::BlobInput;
use crate::key::{KeyCodec, OpaqueKey, StoragePath};
use crate::meta::{self, Meta};
use crate::metrics::SharedMetrics;
use crate::shard::ShardIndex;

/// A decoded key together with the bucket it resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedKey {
    pub path: StoragePath,
    pub shard: ShardIndex,
    pub bucket: String,
}

/// Stores blobs under content-derived paths spread over the configured buckets,
/// and reads them back by opaque key.
///
/// The service holds no per-request state; it can be shared between tasks
/// behind an `Arc` without further synchronization.
pub struct BlobService {
    config: Arc<ShardConfig>,
    codec: KeyCodec,
    gateway: Arc<dyn StoreGateway>,
    metrics: SharedMetrics,
}

impl BlobService {
    pub fn new(config: Arc<ShardConfig>, gateway: Arc<dyn StoreGateway>) -> Self {
        Self::with_metrics(config, gateway, SharedMetrics::default())
    }

    pub fn with_metrics(
        config: Arc<ShardConfig>,
        gateway: Arc<dyn StoreGateway>,
        metrics: SharedMetrics,
    ) -> Self {
        let codec = KeyCodec::new(config.prefix_len());
        Self {
            config,
            codec,
            gateway,
            metrics,
        }
    }

    /// Stores a blob and returns the key to fetch it back.
    ///
    /// Not idempotent: storing the same content twice yields two keys.
    #[tracing::instrument(skip_all, fields(namespace = %input.namespace, size = input.content.len()))]
    pub async fn put(&self, input: BlobInput) -> Result<OpaqueKey, DomainError> {
        let result = self.put_inner(input).await;
        self.observe(result)
    }

    async fn put_inner(&self, input: BlobInput) -> Result<OpaqueKey, DomainError> {
        input.validate()?;

        let digest = Digest::of(&input.content);
        let shard = self.config.route(&digest);
        let bucket = self.config.bucket(shard)?;
        let path = self.codec.build_path(&digest, &input.namespace);
        let metadata = input.store_metadata();
        let size = input.content.len();

        debug!(%digest, %shard, bucket, %path, "Storing blob");
        self.gateway
            .put(bucket, path.as_str(), input.content, &input.content_type, metadata)
            .await?;

        self.metrics.blob_stored(shard.get(), size);
        let key = self.codec.encode_key(&path, shard);
        info!(%key, size, "Stored blob");
        Ok(key)
    }

    /// Fetches the content stored under `key`.
    #[tracing::instrument(skip(self))]
    pub async fn get(&self, key: &str) -> Result<Bytes, DomainError> {
        let result = async {
            let resolved = self.resolve(key)?;
            let object = self
                .gateway
                .get(&resolved.bucket, resolved.path.as_str())
                .await?;
            self.metrics.blob_served(object.body.len());
            Ok::<_, DomainError>(object.body)
        }
        .await;
        self.observe(result)
    }

    /// Fetches the metadata of the blob stored under `key`.
    #[tracing::instrument(skip(self))]
    pub async fn get_meta(&self, key: &str) -> Result<Meta, DomainError> {
        let result = async {
            let resolved = self.resolve(key)?;
            let head = self
                .gateway
                .head(&resolved.bucket, resolved.path.as_str())
                .await?;
            self.metrics.meta_served();
            Ok::<_, DomainError>(meta::decode(&head))
        }
        .await;
        self.observe(result)
    }

    /// Fetches content and metadata in a single store round trip.
    #[tracing::instrument(skip(self))]
    pub async fn get_with_meta(&self, key: &str) -> Result<(Bytes, Meta), DomainError> {
        let result = async {
            let resolved = self.resolve(key)?;
            let object = self
                .gateway
                .get(&resolved.bucket, resolved.path.as_str())
                .await?;
            self.metrics.blob_served(object.body.len());
            Ok::<_, DomainError>((object.body, meta::decode(&object.head)))
        }
        .await;
        self.observe(result)
    }

    /// Decodes `key` and resolves its shard to a bucket, without touching the store.
    pub fn resolve(&self, key: &str) -> Result<ResolvedKey, DomainError> {
        let (path, shard) = self.codec.decode_key(key)?;
        let bucket = self.config.bucket(shard)?.to_string();
        Ok(ResolvedKey {
            path,
            shard,
            bucket,
        })
    }

    fn observe<T>(&self, result: Result<T, DomainError>) -> Result<T, DomainError> {
        if let Err(err) = &result {
            let kind = err.kind();
            self.metrics.request_failed(kind);
            if kind.is_caller_error() {
                debug!(error = %err, "Rejected request");
            } else {
                warn!(error = %err, kind = %kind, "Request failed");
            }
        }
        result
    }
}
