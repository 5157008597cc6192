use std::fmt;

use sha2::{Digest as _, Sha256};

/// Length of a hex encoded digest (sha256, 32 bytes)
pub const DIGEST_HEX_LEN: usize = 64;

/// Hex encoded sha256 of a blob's content.
///
/// Identical content always yields an identical digest. The digest drives both
/// the storage path and the shard selection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Digest(String);

impl Digest {
    /// Computes the digest of `content`. Accepts any byte sequence, including an empty one.
    pub fn of(content: &[u8]) -> Self {
        let hash = Sha256::digest(content);
        Self(faster_hex::hex_string(hash.as_slice()))
    }

    /// Parses an already encoded digest, e.g. one recovered from a storage path.
    ///
    /// Only lower case hex of the exact digest length is accepted.
    pub fn parse(s: &str) -> Option<Self> {
        let valid = s.len() == DIGEST_HEX_LEN
            && s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'));
        valid.then(|| Self(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First `len` hex characters, clamped to the digest length.
    pub fn prefix(&self, len: usize) -> &str {
        &self.0[..len.min(self.0.len())]
    }

    /// Value (0..16) of the trailing hex character.
    pub fn last_nibble(&self) -> u8 {
        self.0
            .chars()
            .last()
            .and_then(|c| c.to_digit(16))
            .map(|v| v as u8)
            .unwrap_or(0)
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Digest {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
