use std::collections::HashSet;
use std::fmt;
use std::num::NonZeroUsize;

use crate::error::DomainError;
use crate::hasher::{Digest, DIGEST_HEX_LEN};
use crate::shard::{self, ShardIndex};

/// Number of digest characters used for the leading directory of a storage path.
pub const DEFAULT_PREFIX_LEN: usize = 6;

/// Startup configuration errors. These are fatal and never produced per request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    NoBuckets,
    EmptyBucketName(usize),
    DuplicateBucket(String),
    InvalidPrefixLength(usize),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::NoBuckets => write!(f, "At least one bucket must be configured"),
            ConfigError::EmptyBucketName(pos) => {
                write!(f, "Bucket name at position {} is empty", pos)
            }
            ConfigError::DuplicateBucket(name) => {
                write!(f, "Bucket '{}' is configured more than once", name)
            }
            ConfigError::InvalidPrefixLength(len) => write!(
                f,
                "Prefix length {} is out of range (1..={})",
                len, DIGEST_HEX_LEN
            ),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Ordered bucket list and path layout, fixed for the lifetime of the process.
///
/// The position of a bucket in the list is its shard index, so reordering the
/// list after keys have been handed out breaks every existing key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShardConfig {
    buckets: Vec<String>,
    prefix_len: usize,
}

impl ShardConfig {
    pub fn new(buckets: Vec<String>) -> Result<Self, ConfigError> {
        Self::with_prefix_len(buckets, DEFAULT_PREFIX_LEN)
    }

    pub fn with_prefix_len(buckets: Vec<String>, prefix_len: usize) -> Result<Self, ConfigError> {
        if buckets.is_empty() {
            return Err(ConfigError::NoBuckets);
        }
        if prefix_len == 0 || prefix_len > DIGEST_HEX_LEN {
            return Err(ConfigError::InvalidPrefixLength(prefix_len));
        }

        let mut seen = HashSet::new();
        for (pos, bucket) in buckets.iter().enumerate() {
            if bucket.trim().is_empty() {
                return Err(ConfigError::EmptyBucketName(pos));
            }
            if !seen.insert(bucket.as_str()) {
                return Err(ConfigError::DuplicateBucket(bucket.clone()));
            }
        }

        Ok(Self {
            buckets,
            prefix_len,
        })
    }

    pub fn shard_count(&self) -> NonZeroUsize {
        // the constructor rejects an empty bucket list
        NonZeroUsize::new(self.buckets.len()).unwrap_or(NonZeroUsize::MIN)
    }

    pub fn prefix_len(&self) -> usize {
        self.prefix_len
    }

    pub fn buckets(&self) -> &[String] {
        &self.buckets
    }

    /// Shard that receives content with the given digest.
    pub fn route(&self, digest: &Digest) -> ShardIndex {
        shard::route(digest, self.shard_count())
    }

    /// Resolves a shard index to its bucket.
    pub fn bucket(&self, index: ShardIndex) -> Result<&str, DomainError> {
        self.buckets
            .get(index.get())
            .map(String::as_str)
            .ok_or(DomainError::InvalidShardReference {
                index: index.get(),
                shard_count: self.buckets.len(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn buckets(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_rejects_empty_bucket_list() {
        assert_eq!(ShardConfig::new(vec![]), Err(ConfigError::NoBuckets));
    }

    #[test]
    fn test_rejects_bad_bucket_names() {
        assert_eq!(
            ShardConfig::new(buckets(&["a", " "])),
            Err(ConfigError::EmptyBucketName(1))
        );
        assert_eq!(
            ShardConfig::new(buckets(&["a", "b", "a"])),
            Err(ConfigError::DuplicateBucket("a".to_string()))
        );
    }

    #[test]
    fn test_rejects_bad_prefix_length() {
        assert_eq!(
            ShardConfig::with_prefix_len(buckets(&["a"]), 0),
            Err(ConfigError::InvalidPrefixLength(0))
        );
        assert_eq!(
            ShardConfig::with_prefix_len(buckets(&["a"]), 65),
            Err(ConfigError::InvalidPrefixLength(65))
        );
        assert!(ShardConfig::with_prefix_len(buckets(&["a"]), 64).is_ok());
    }

    #[test]
    fn test_bucket_lookup() {
        let config = ShardConfig::new(buckets(&["b0", "b1"])).unwrap();
        assert_eq!(config.shard_count().get(), 2);
        assert_eq!(config.prefix_len(), DEFAULT_PREFIX_LEN);
        assert_eq!(config.bucket(ShardIndex::new(1)).unwrap(), "b1");

        let err = config.bucket(ShardIndex::new(2)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidShardReference);
    }

    #[test]
    fn test_route_always_resolves() {
        let config = ShardConfig::new(buckets(&["b0", "b1", "b2"])).unwrap();
        for i in 0..64u32 {
            let digest = Digest::of(&i.to_le_bytes());
            assert!(config.bucket(config.route(&digest)).is_ok());
        }
    }
}
