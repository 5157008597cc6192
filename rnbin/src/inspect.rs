use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::Parser;
use serde::Serialize;

use rnbin_core::{Digest, DomainError, KeyCodec, ShardConfig, DEFAULT_PREFIX_LEN};

use crate::config::StoreArgs;

#[derive(Parser, Debug)]
pub struct InspectKeyConfig {
    #[command(flatten)]
    pub store: StoreArgs,

    #[arg(required = true, help = "Opaque key to decode")]
    pub key: String,
}

/// Offline breakdown of an opaque key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyReport {
    pub key: String,
    pub path: String,
    pub shard: usize,
    pub bucket: Option<String>,
    pub namespace: Option<String>,
    pub digest: Option<String>,
    pub written_at: Option<DateTime<Utc>>,
}

pub fn inspect_key(args: InspectKeyConfig) -> Result<()> {
    let shards = if args.store.buckets.is_empty() && args.store.config.is_none() {
        None
    } else {
        Some(args.store.resolve()?.shards)
    };

    let report = describe_key(shards.as_ref(), &args.key)?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

/// Decodes `key` without touching any store.
///
/// The bucket is only reported when a shard configuration is given and the
/// shard index is in range for it. The digest is only reported when the path
/// segment is a well-formed SHA-256 hex digest.
pub fn describe_key(shards: Option<&ShardConfig>, key: &str) -> Result<KeyReport, DomainError> {
    let prefix_len = shards.map_or(DEFAULT_PREFIX_LEN, ShardConfig::prefix_len);
    let (path, shard) = KeyCodec::new(prefix_len).decode_key(key)?;

    let bucket = shards
        .and_then(|config| config.bucket(shard).ok())
        .map(str::to_string);
    let parts = path.parts();

    Ok(KeyReport {
        key: key.to_string(),
        path: path.as_str().to_string(),
        shard: shard.get(),
        bucket,
        namespace: parts.as_ref().map(|p| p.namespace.to_string()),
        digest: parts
            .as_ref()
            .and_then(|p| Digest::parse(p.digest))
            .map(|d| d.as_str().to_string()),
        written_at: parts.as_ref().and_then(|p| suffix_time(p.suffix)),
    })
}

fn suffix_time(suffix: &str) -> Option<DateTime<Utc>> {
    let nanos = u64::from_str_radix(suffix, 16).ok()?;
    let secs = i64::try_from(nanos / 1_000_000_000).ok()?;
    DateTime::<Utc>::from_timestamp(secs, (nanos % 1_000_000_000) as u32)
}
