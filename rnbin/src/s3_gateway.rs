//! S3 implementation of the store gateway.

use std::collections::HashMap;

use anyhow::Context;
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::error::{ProvideErrorMetadata, SdkError};
use aws_sdk_s3::primitives::{ByteStream, DateTime as S3DateTime};
use aws_sdk_s3::Client as S3Client;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use tracing::debug;

use rnbin_core::{ObjectHead, StoreError, StoreGateway, StoredObject};

/// Store gateway backed by `aws-sdk-s3`.
///
/// Retries and timeouts are those of the SDK defaults.
#[derive(Clone, Debug)]
pub struct S3Gateway {
    client: S3Client,
}

impl S3Gateway {
    /// Create a gateway from the AWS environment (credentials, profile, region).
    ///
    /// The client is configured with `force_path_style(true)` so S3-compatible
    /// endpoints (MinIO, LocalStack) work with plain bucket names.
    pub async fn new(region: Option<String>, endpoint_url: Option<String>) -> Self {
        let mut config_loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = region {
            config_loader = config_loader.region(aws_config::Region::new(region));
        }
        let config = config_loader.load().await;

        let mut s3_config = aws_sdk_s3::config::Builder::from(&config).force_path_style(true);
        if let Some(url) = endpoint_url {
            s3_config = s3_config.endpoint_url(url);
        }

        Self::from_client(S3Client::from_conf(s3_config.build()))
    }

    pub fn from_client(client: S3Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl StoreGateway for S3Gateway {
    async fn put(
        &self,
        bucket: &str,
        key: &str,
        body: Bytes,
        content_type: &str,
        metadata: HashMap<String, String>,
    ) -> Result<(), StoreError> {
        debug!(bucket, key, size = body.len(), "S3 put_object");
        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .content_type(content_type)
            .set_metadata(Some(metadata))
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|err| classify(err, false, "put_object", bucket, key))?;
        Ok(())
    }

    async fn get(&self, bucket: &str, key: &str) -> Result<StoredObject, StoreError> {
        debug!(bucket, key, "S3 get_object");
        let resp = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|err| {
                let no_such_key = err.as_service_error().is_some_and(|e| e.is_no_such_key());
                classify(err, no_such_key, "get_object", bucket, key)
            })?;

        let head = object_head(
            resp.content_type(),
            resp.content_length(),
            resp.last_modified(),
            resp.metadata(),
        );
        let body = resp
            .body
            .collect()
            .await
            .with_context(|| format!("Failed to read S3 object body {}/{}", bucket, key))
            .map_err(StoreError::unavailable)?
            .into_bytes();

        Ok(StoredObject { body, head })
    }

    async fn head(&self, bucket: &str, key: &str) -> Result<ObjectHead, StoreError> {
        debug!(bucket, key, "S3 head_object");
        let resp = self
            .client
            .head_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|err| {
                let not_found = err.as_service_error().is_some_and(|e| e.is_not_found());
                classify(err, not_found, "head_object", bucket, key)
            })?;

        Ok(object_head(
            resp.content_type(),
            resp.content_length(),
            resp.last_modified(),
            resp.metadata(),
        ))
    }
}

/// Maps an SDK error onto the gateway vocabulary.
///
/// An object is missing when the SDK parsed a typed not-found error or the raw
/// response carries HTTP 404. Everything else is reported as unavailable.
fn classify<E>(
    err: SdkError<E>,
    typed_not_found: bool,
    operation: &str,
    bucket: &str,
    key: &str,
) -> StoreError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
{
    let status_not_found = err
        .raw_response()
        .is_some_and(|resp| resp.status().as_u16() == 404);
    if typed_not_found || status_not_found {
        return StoreError::not_found(bucket, key);
    }

    let code = err.code().unwrap_or("unknown").to_string();
    StoreError::unavailable(
        anyhow::Error::new(err).context(format!("S3 {} failed for {}/{} ({})", operation, bucket, key, code)),
    )
}

fn object_head(
    content_type: Option<&str>,
    content_length: Option<i64>,
    last_modified: Option<&S3DateTime>,
    metadata: Option<&HashMap<String, String>>,
) -> ObjectHead {
    ObjectHead {
        content_type: content_type.map(str::to_string),
        content_length: content_length.and_then(|len| u64::try_from(len).ok()),
        last_modified: last_modified
            .and_then(|t| DateTime::<Utc>::from_timestamp(t.secs(), t.subsec_nanos())),
        metadata: metadata.cloned().unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_head_conversion() {
        let mut metadata = HashMap::new();
        metadata.insert("rnbin-sep".to_string(), "docs".to_string());
        let modified = S3DateTime::from_secs(1_700_000_000);

        let head = object_head(Some("text/plain"), Some(5), Some(&modified), Some(&metadata));
        assert_eq!(head.content_type.as_deref(), Some("text/plain"));
        assert_eq!(head.content_length, Some(5));
        assert_eq!(head.last_modified.unwrap().timestamp(), 1_700_000_000);
        assert_eq!(head.metadata, metadata);
    }

    #[test]
    fn test_object_head_missing_fields() {
        let head = object_head(None, Some(-1), None, None);
        assert_eq!(head, ObjectHead::default());
    }

    #[test]
    fn test_construction_failure_is_unavailable() {
        let err: SdkError<aws_sdk_s3::operation::get_object::GetObjectError> =
            SdkError::construction_failure(std::io::Error::new(
                std::io::ErrorKind::Other,
                "bad request",
            ));
        let classified = classify(err, false, "get_object", "b0", "k");
        assert!(matches!(classified, StoreError::Unavailable { .. }));
    }

    #[test]
    fn test_raw_404_is_not_found() {
        use aws_sdk_s3::config::http::HttpResponse;
        use aws_sdk_s3::operation::get_object::GetObjectError;
        use aws_sdk_s3::types::error::InvalidObjectState;
        use aws_smithy_types::body::SdkBody;

        let raw = HttpResponse::new(404u16.try_into().unwrap(), SdkBody::empty());
        let err: SdkError<GetObjectError> = SdkError::service_error(
            GetObjectError::InvalidObjectState(InvalidObjectState::builder().build()),
            raw,
        );
        let classified = classify(err, false, "get_object", "b0", "k");
        assert!(matches!(classified, StoreError::NotFound { .. }));
    }

    #[test]
    fn test_raw_503_is_unavailable() {
        use aws_sdk_s3::config::http::HttpResponse;
        use aws_sdk_s3::operation::get_object::GetObjectError;
        use aws_sdk_s3::types::error::InvalidObjectState;
        use aws_smithy_types::body::SdkBody;

        let raw = HttpResponse::new(503u16.try_into().unwrap(), SdkBody::empty());
        let err: SdkError<GetObjectError> = SdkError::service_error(
            GetObjectError::InvalidObjectState(InvalidObjectState::builder().build()),
            raw,
        );
        let classified = classify(err, false, "get_object", "b0", "k");
        assert!(matches!(classified, StoreError::Unavailable { .. }));
    }

    #[test]
    fn test_typed_not_found() {
        let err: SdkError<aws_sdk_s3::operation::head_object::HeadObjectError> =
            SdkError::timeout_error(std::io::Error::new(std::io::ErrorKind::TimedOut, "slow"));
        let classified = classify(err, true, "head_object", "b0", "k");
        assert!(matches!(classified, StoreError::NotFound { .. }));
    }
}
