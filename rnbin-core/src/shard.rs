use std::fmt;
use std::num::NonZeroUsize;

use crate::hasher::Digest;

/// Position of a bucket in the configured bucket list.
///
/// A `ShardIndex` is only meaningful relative to a shard count. Indices coming
/// out of [`route`] are always in range; indices decoded from a key are checked
/// by [`ShardConfig::bucket`](crate::ShardConfig::bucket).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShardIndex(usize);

impl ShardIndex {
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    pub const fn get(self) -> usize {
        self.0
    }
}

impl fmt::Display for ShardIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Picks the shard for a digest.
///
/// Only the trailing hex nibble of the digest is used, reduced modulo the shard
/// count. With more than 16 shards the buckets above index 15 never receive data.
pub fn route(digest: &Digest, shard_count: NonZeroUsize) -> ShardIndex {
    ShardIndex(digest.last_nibble() as usize % shard_count.get())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    fn count(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    #[test]
    fn test_route_uses_trailing_nibble() {
        // sha256("hello") ends in '4'
        let digest = Digest::of(b"hello");
        assert_eq!(route(&digest, count(1)), ShardIndex::new(0));
        assert_eq!(route(&digest, count(2)), ShardIndex::new(0));
        assert_eq!(route(&digest, count(3)), ShardIndex::new(1));
        assert_eq!(route(&digest, count(16)), ShardIndex::new(4));
        assert_eq!(route(&digest, count(32)), ShardIndex::new(4));
    }

    #[test]
    fn test_route_in_range_and_deterministic() {
        let mut rng = rand::thread_rng();
        for _ in 0..256 {
            let content: Vec<u8> = (0..rng.gen_range(0..256)).map(|_| rng.gen()).collect();
            let digest = Digest::of(&content);
            let shards = count(rng.gen_range(1..20));
            let index = route(&digest, shards);
            assert!(index.get() < shards.get());
            assert_eq!(index, route(&digest, shards));
        }
    }
}
