use std::fmt;

use crate::gateway::StoreError;

/// Stable classification of a [`DomainError`], used for status mapping and metric labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidInput,
    MalformedKey,
    InvalidShardReference,
    NotFound,
    BackendUnavailable,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::InvalidInput => "invalid_input",
            ErrorKind::MalformedKey => "malformed_key",
            ErrorKind::InvalidShardReference => "invalid_shard_reference",
            ErrorKind::NotFound => "not_found",
            ErrorKind::BackendUnavailable => "backend_unavailable",
        }
    }

    /// Whether the condition was caused by the caller's request.
    pub fn is_caller_error(self) -> bool {
        matches!(
            self,
            ErrorKind::InvalidInput | ErrorKind::MalformedKey | ErrorKind::InvalidShardReference
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The closed set of errors surfaced by [`BlobService`](crate::BlobService).
#[derive(Debug)]
pub enum DomainError {
    /// The upload failed validation.
    InvalidInput { reason: String },
    /// The key lacks the position separator or its shard suffix is not a non-negative integer.
    MalformedKey { key: String, reason: &'static str },
    /// The key names a shard outside the configured bucket list.
    InvalidShardReference { index: usize, shard_count: usize },
    /// The store has no object at the resolved location.
    NotFound { bucket: String, path: String },
    /// Any other store failure. The cause is kept for logging.
    BackendUnavailable { source: anyhow::Error },
}

impl DomainError {
    pub fn invalid_input(reason: impl Into<String>) -> Self {
        DomainError::InvalidInput {
            reason: reason.into(),
        }
    }

    pub fn malformed_key(key: &str, reason: &'static str) -> Self {
        DomainError::MalformedKey {
            key: key.to_string(),
            reason,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            DomainError::InvalidInput { .. } => ErrorKind::InvalidInput,
            DomainError::MalformedKey { .. } => ErrorKind::MalformedKey,
            DomainError::InvalidShardReference { .. } => ErrorKind::InvalidShardReference,
            DomainError::NotFound { .. } => ErrorKind::NotFound,
            DomainError::BackendUnavailable { .. } => ErrorKind::BackendUnavailable,
        }
    }
}

impl fmt::Display for DomainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DomainError::InvalidInput { reason } => write!(f, "Invalid input: {}", reason),
            DomainError::MalformedKey { key, reason } => {
                write!(f, "Malformed key '{}': {}", key, reason)
            }
            DomainError::InvalidShardReference { index, shard_count } => write!(
                f,
                "Shard {} is out of range, {} shard(s) configured",
                index, shard_count
            ),
            DomainError::NotFound { bucket, path } => {
                write!(f, "Object not found: {}/{}", bucket, path)
            }
            DomainError::BackendUnavailable { source } => {
                write!(f, "Backend unavailable: {:#}", source)
            }
        }
    }
}

impl std::error::Error for DomainError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DomainError::BackendUnavailable { source } => Some(source.as_ref()),
            _ => None,
        }
    }
}

/// Maps a store failure into the domain vocabulary.
///
/// Not-found is recognised from the structured [`StoreError::NotFound`] signal
/// only, never from error text.
pub fn normalize(err: StoreError) -> DomainError {
    match err {
        StoreError::NotFound { bucket, key } => DomainError::NotFound { bucket, path: key },
        StoreError::Unavailable { source } => DomainError::BackendUnavailable { source },
    }
}

impl From<StoreError> for DomainError {
    fn from(err: StoreError) -> Self {
        normalize(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_not_found() {
        let err = normalize(StoreError::NotFound {
            bucket: "b0".to_string(),
            key: "abc/ns/abc-1".to_string(),
        });
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.to_string(), "Object not found: b0/abc/ns/abc-1");
    }

    #[test]
    fn test_normalize_keeps_cause() {
        let err = normalize(StoreError::unavailable(anyhow::anyhow!("connection reset")));
        assert_eq!(err.kind(), ErrorKind::BackendUnavailable);
        let source = std::error::Error::source(&err).expect("cause is kept");
        assert_eq!(source.to_string(), "connection reset");
    }

    #[test]
    fn test_not_found_text_is_not_sniffed() {
        let err = normalize(StoreError::unavailable(anyhow::anyhow!(
            "status code: 404, request id: xyz"
        )));
        assert_eq!(err.kind(), ErrorKind::BackendUnavailable);
    }

    #[test]
    fn test_caller_errors() {
        assert!(ErrorKind::InvalidInput.is_caller_error());
        assert!(ErrorKind::MalformedKey.is_caller_error());
        assert!(ErrorKind::InvalidShardReference.is_caller_error());
        assert!(!ErrorKind::NotFound.is_caller_error());
        assert!(!ErrorKind::BackendUnavailable.is_caller_error());
    }
}
