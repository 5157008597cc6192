use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use serde::Deserialize;
use tracing::info;

use rnbin_core::{BlobService, MemoryGateway, SharedMetrics, ShardConfig, StoreGateway, DEFAULT_PREFIX_LEN};

use crate::s3_gateway::S3Gateway;

/// Object store the service talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    S3,
    /// In-process store, contents are lost on exit.
    Memory,
}

impl FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "s3" => Ok(Backend::S3),
            "memory" => Ok(Backend::Memory),
            _ => Err(format!("Unknown backend: {}", s)),
        }
    }
}

/// Configuration file structure for rnbin.toml
///
/// ```toml
/// region = "ap-northeast-1"
/// endpoint_url = "http://localhost:9000"
/// buckets = ["blobs-0", "blobs-1"]
/// prefix_len = 6
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub region: Option<String>,
    pub endpoint_url: Option<String>,
    #[serde(default)]
    pub buckets: Vec<String>,
    pub prefix_len: Option<usize>,
}

impl FileConfig {
    /// Load configuration from a TOML file
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }
}

/// Store selection flags shared by every subcommand.
#[derive(Args, Debug, Clone)]
pub struct StoreArgs {
    #[arg(long, help = "TOML config file (region, endpoint_url, buckets, prefix_len)")]
    pub config: Option<PathBuf>,

    #[arg(
        long = "bucket",
        help = "Bucket name, repeat in shard order. Overrides the config file list"
    )]
    pub buckets: Vec<String>,

    #[arg(long, help = "AWS region. Falls back to the AWS environment/profile")]
    pub region: Option<String>,

    #[arg(long, help = "Custom S3 endpoint, e.g. for MinIO")]
    pub endpoint_url: Option<String>,

    #[arg(long, help = "Digest characters used for the leading path directory [default: 6]")]
    pub prefix_len: Option<usize>,

    #[arg(long, default_value = "s3", help = "Store backend (s3, memory)")]
    pub backend: Backend,
}

/// Store settings after merging the config file with command line flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreSettings {
    pub shards: ShardConfig,
    pub region: Option<String>,
    pub endpoint_url: Option<String>,
    pub backend: Backend,
}

impl StoreArgs {
    /// Merges flags over the config file and validates the shard layout.
    pub fn resolve(&self) -> Result<StoreSettings> {
        let file = match &self.config {
            Some(path) => FileConfig::load_from_file(path)?,
            None => FileConfig::default(),
        };
        self.merge(file)
    }

    fn merge(&self, file: FileConfig) -> Result<StoreSettings> {
        let buckets = if self.buckets.is_empty() {
            file.buckets
        } else {
            self.buckets.clone()
        };
        let prefix_len = self
            .prefix_len
            .or(file.prefix_len)
            .unwrap_or(DEFAULT_PREFIX_LEN);
        let shards =
            ShardConfig::with_prefix_len(buckets, prefix_len).context("Invalid shard configuration")?;

        Ok(StoreSettings {
            shards,
            region: self.region.clone().or(file.region),
            endpoint_url: self.endpoint_url.clone().or(file.endpoint_url),
            backend: self.backend,
        })
    }

    /// Builds the blob service for these settings.
    pub async fn build_service(&self, metrics: SharedMetrics) -> Result<BlobService> {
        let settings = self.resolve()?;
        info!(
            buckets = ?settings.shards.buckets(),
            prefix_len = settings.shards.prefix_len(),
            backend = ?settings.backend,
            "Configured shards"
        );

        let gateway: Arc<dyn StoreGateway> = match settings.backend {
            Backend::S3 => Arc::new(S3Gateway::new(settings.region, settings.endpoint_url).await),
            Backend::Memory => Arc::new(MemoryGateway::new(settings.shards.buckets().to_vec())),
        };

        Ok(BlobService::with_metrics(
            Arc::new(settings.shards),
            gateway,
            metrics,
        ))
    }
}
