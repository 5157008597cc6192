//! Storage paths and opaque keys.
//!
//! A storage path has the shape `<prefix>/<namespace>/<digest>-<suffix>` where
//! `prefix` is the first characters of the digest and `suffix` is the write
//! time as lower case hex nanoseconds. The opaque key handed to callers is the
//! path followed by `@` and the decimal shard index:
//!
//! ```text
//! 2cf24d/docs/2cf24dba...9824-17f1c9a3b2e4d000@0
//! ```
//!
//! Decoding splits on the *last* `@`. Everything before it is the path, which
//! keeps the parse unambiguous even if a path ever contains an `@` itself.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;

use crate::error::DomainError;
use crate::hasher::Digest;
use crate::shard::ShardIndex;

pub const DIR_SEPARATOR: char = '/';
pub const SUFFIX_SEPARATOR: char = '-';
pub const POSITION_SEPARATOR: char = '@';

/// Location of an object inside its bucket.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StoragePath(String);

/// Components of a [`StoragePath`] built by this crate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathParts<'a> {
    pub prefix: &'a str,
    pub namespace: &'a str,
    pub digest: &'a str,
    pub suffix: &'a str,
}

impl StoragePath {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Splits the path into its components. Returns `None` for paths that do
    /// not have the `<prefix>/<namespace>/<digest>-<suffix>` shape.
    pub fn parts(&self) -> Option<PathParts<'_>> {
        let mut segments = self.0.splitn(3, DIR_SEPARATOR);
        let prefix = segments.next()?;
        let namespace = segments.next()?;
        let (digest, suffix) = segments.next()?.rsplit_once(SUFFIX_SEPARATOR)?;
        if prefix.is_empty() || namespace.is_empty() || digest.is_empty() || suffix.is_empty() {
            return None;
        }
        Some(PathParts {
            prefix,
            namespace,
            digest,
            suffix,
        })
    }
}

impl fmt::Display for StoragePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The only handle callers keep for a stored blob. Its structure is not part of
/// the public contract.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OpaqueKey(String);

impl OpaqueKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OpaqueKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Source of uniqueness suffixes: Unix time in nanoseconds, strictly
/// increasing for the lifetime of the clock.
#[derive(Debug, Default)]
pub struct SuffixClock {
    last: AtomicU64,
}

impl SuffixClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&self) -> u64 {
        let now = u64::try_from(Utc::now().timestamp_nanos_opt().unwrap_or(i64::MAX)).unwrap_or(0);
        let prev = self
            .last
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |prev| {
                Some(now.max(prev.saturating_add(1)))
            })
            .unwrap_or_else(|prev| prev);
        now.max(prev.saturating_add(1))
    }
}

/// Builds storage paths and encodes/decodes opaque keys.
#[derive(Debug)]
pub struct KeyCodec {
    prefix_len: usize,
    clock: SuffixClock,
}

impl KeyCodec {
    pub fn new(prefix_len: usize) -> Self {
        Self {
            prefix_len,
            clock: SuffixClock::new(),
        }
    }

    /// Builds a fresh storage path. Two calls with the same digest and
    /// namespace never return the same path.
    pub fn build_path(&self, digest: &Digest, namespace: &str) -> StoragePath {
        self.build_path_with_suffix(digest, namespace, self.clock.next())
    }

    pub fn build_path_with_suffix(
        &self,
        digest: &Digest,
        namespace: &str,
        suffix: u64,
    ) -> StoragePath {
        StoragePath(format!(
            "{prefix}{DIR_SEPARATOR}{namespace}{DIR_SEPARATOR}{digest}{SUFFIX_SEPARATOR}{suffix:x}",
            prefix = digest.prefix(self.prefix_len),
        ))
    }

    pub fn encode_key(&self, path: &StoragePath, shard: ShardIndex) -> OpaqueKey {
        OpaqueKey(format!("{}{}{}", path, POSITION_SEPARATOR, shard))
    }

    /// Splits a key into storage path and shard index.
    ///
    /// The range of the shard index is not checked here; see
    /// [`ShardConfig::bucket`](crate::ShardConfig::bucket).
    pub fn decode_key(&self, key: &str) -> Result<(StoragePath, ShardIndex), DomainError> {
        let (path, position) = key
            .rsplit_once(POSITION_SEPARATOR)
            .ok_or_else(|| DomainError::malformed_key(key, "missing position separator"))?;

        if path.is_empty() {
            return Err(DomainError::malformed_key(key, "empty storage path"));
        }
        if position.is_empty() || !position.bytes().all(|b| b.is_ascii_digit()) {
            return Err(DomainError::malformed_key(
                key,
                "shard position is not a non-negative integer",
            ));
        }
        let index = position
            .parse::<usize>()
            .map_err(|_| DomainError::malformed_key(key, "shard position is too large"))?;

        Ok((StoragePath(path.to_string()), ShardIndex::new(index)))
    }
}
