use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use bytes::Bytes;
use clap::Parser;
use tokio::io::AsyncWriteExt;
use tracing::info;

use rnbin_core::input::MAX_TEXT_LEN;
use rnbin_core::{BlobInput, BlobService, OpaqueKey, SharedMetrics};

use crate::config::StoreArgs;

fn parse_attribute(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("Expected key=value, got: {}", s))
}

#[derive(Parser, Debug)]
pub struct StoreConfig {
    #[command(flatten)]
    pub store: StoreArgs,

    #[arg(required = true, help = "File to upload")]
    pub file: PathBuf,

    #[arg(long, help = "Namespace tag ([A-Za-z0-9_.], at most 64 chars)")]
    pub sep: String,

    #[arg(long, help = "Origin name, defaults to the file name")]
    pub name: Option<String>,

    #[arg(long)]
    pub created_by: Option<String>,

    #[arg(long, default_value = "application/octet-stream")]
    pub content_type: String,

    #[arg(long = "attr", value_parser = parse_attribute, help = "Attribute as key=value, repeatable")]
    pub attributes: Vec<(String, String)>,
}

#[derive(Parser, Debug)]
pub struct RetrieveConfig {
    #[command(flatten)]
    pub store: StoreArgs,

    #[arg(required = true, help = "Opaque key returned by store")]
    pub key: String,

    #[arg(required = true, help = "Destination file path")]
    pub dest: PathBuf,
}

#[derive(Parser, Debug)]
pub struct MetaConfig {
    #[command(flatten)]
    pub store: StoreArgs,

    #[arg(required = true, help = "Opaque key returned by store")]
    pub key: String,
}

#[tokio::main]
pub async fn store(args: StoreConfig) -> Result<()> {
    let service = args.store.build_service(SharedMetrics::default()).await?;
    let key = store_file(&service, &args).await?;
    println!("{}", key);
    Ok(())
}

#[tokio::main]
pub async fn retrieve(args: RetrieveConfig) -> Result<()> {
    let service = args.store.build_service(SharedMetrics::default()).await?;
    let size = retrieve_to_file(&service, &args.key, &args.dest).await?;
    info!(dest = %args.dest.display(), size, "Blob retrieved");
    Ok(())
}

#[tokio::main]
pub async fn meta(args: MetaConfig) -> Result<()> {
    let service = args.store.build_service(SharedMetrics::default()).await?;
    let meta = service.get_meta(&args.key).await?;
    println!("{}", serde_json::to_string_pretty(&meta)?);
    Ok(())
}

/// Reads `args.file` and stores it, returning the new key.
pub async fn store_file(service: &BlobService, args: &StoreConfig) -> Result<OpaqueKey> {
    let content = tokio::fs::read(&args.file)
        .await
        .with_context(|| format!("Failed to read {}", args.file.display()))?;

    let origin_name = args
        .name
        .clone()
        .or_else(|| default_origin_name(&args.file));

    let mut input = BlobInput::new(Bytes::from(content), args.content_type.clone(), args.sep.clone());
    if let Some(name) = origin_name {
        input = input.with_origin_name(name);
    }
    if let Some(creator) = &args.created_by {
        input = input.with_created_by(creator.clone());
    }
    for (key, value) in &args.attributes {
        input = input.with_attribute(key.clone(), value.clone());
    }

    Ok(service.put(input).await?)
}

/// File name of `path` when it is usable as an origin name as is.
fn default_origin_name(path: &Path) -> Option<String> {
    let name = path.file_name()?.to_str()?;
    let printable = name.chars().all(|c| c.is_ascii_graphic() || c == ' ');
    (printable && name.trim() == name && name.len() <= MAX_TEXT_LEN).then(|| name.to_string())
}

/// Writes the blob behind `key` to `dest`, returning the number of bytes written.
pub async fn retrieve_to_file(service: &BlobService, key: &str, dest: &Path) -> Result<usize> {
    let content = service.get(key).await?;

    let mut file = tokio::fs::File::create(dest)
        .await
        .with_context(|| format!("Failed to create {}", dest.display()))?;
    file.write_all(&content).await?;

    // Ensure all data is written to disk
    file.flush().await?;

    Ok(content.len())
}
