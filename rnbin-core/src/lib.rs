//! # rnbin core
//!
//! Content addressing and shard routing for a blob gateway backed by a set
//! of object store buckets.
//!
//! ## Features
//!
//! - **Content-Derived Paths**: Blobs are stored under `<prefix>/<namespace>/<sha256>-<suffix>`
//! - **Shard Routing**: The digest picks one of the configured buckets, no side index needed
//! - **Self-Routing Keys**: The opaque key carries the shard, so lookups go straight to the right bucket
//! - **Stable Metadata Names**: Origin name, creator, namespace and attributes travel as store metadata
//! - **Closed Error Taxonomy**: Store failures are normalized into five domain error kinds
//! - **Pluggable Stores**: Anything implementing [`StoreGateway`] can back the service
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use rnbin_core::{BlobInput, BlobService, MemoryGateway, ShardConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let buckets = vec!["blobs-0".to_string(), "blobs-1".to_string()];
//! let config = Arc::new(ShardConfig::new(buckets.clone())?);
//! let service = BlobService::new(config, Arc::new(MemoryGateway::new(buckets)));
//!
//! let key = service
//!     .put(BlobInput::new("hello", "text/plain", "docs").with_origin_name("hello.txt"))
//!     .await?;
//! let content = service.get(key.as_str()).await?;
//! let meta = service.get_meta(key.as_str()).await?;
//! assert_eq!(&content[..], b"hello");
//! assert_eq!(meta.origin_name, "hello.txt");
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod gateway;
pub mod hasher;
pub mod input;
pub mod key;
pub mod memory;
pub mod meta;
pub mod metrics;
pub mod service;
pub mod shard;

pub use config::{ConfigError, ShardConfig, DEFAULT_PREFIX_LEN};
pub use error::{normalize, DomainError, ErrorKind};
pub use gateway::{ObjectHead, StoreError, StoredObject, StoreGateway};
pub use hasher::Digest;
pub use input::BlobInput;
pub use key::{KeyCodec, OpaqueKey, StoragePath};
pub use memory::MemoryGateway;
pub use meta::{Attributes, Meta};
pub use metrics::{MetricsCollector, NoOpMetrics, SharedMetrics};
pub use service::{BlobService, ResolvedKey};
pub use shard::{route, ShardIndex};
