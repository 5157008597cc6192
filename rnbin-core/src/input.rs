use bytes::Bytes;

use crate::error::DomainError;
use crate::meta::{self, Attributes};

pub const MAX_NAMESPACE_LEN: usize = 64;
pub const MAX_CONTENT_TYPE_LEN: usize = 255;
/// Limit for origin name, created-by and attribute values.
pub const MAX_TEXT_LEN: usize = 140;
pub const MAX_ATTRIBUTES: usize = 16;
pub const MAX_ATTRIBUTE_KEY_LEN: usize = 64;
/// User metadata ceiling of the backing store, names plus values.
pub const MAX_METADATA_BYTES: usize = 2048;

/// A decoded upload, as handed over by the transport layer.
#[derive(Debug, Clone)]
pub struct BlobInput {
    pub content: Bytes,
    pub content_type: String,
    pub namespace: String,
    pub origin_name: Option<String>,
    pub created_by: Option<String>,
    pub attributes: Attributes,
}

impl BlobInput {
    pub fn new(
        content: impl Into<Bytes>,
        content_type: impl Into<String>,
        namespace: impl Into<String>,
    ) -> Self {
        Self {
            content: content.into(),
            content_type: content_type.into(),
            namespace: namespace.into(),
            origin_name: None,
            created_by: None,
            attributes: Attributes::new(),
        }
    }

    pub fn with_origin_name(mut self, name: impl Into<String>) -> Self {
        self.origin_name = Some(name.into());
        self
    }

    pub fn with_created_by(mut self, creator: impl Into<String>) -> Self {
        self.created_by = Some(creator.into());
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Store metadata for this upload.
    pub fn store_metadata(&self) -> std::collections::HashMap<String, String> {
        meta::encode(
            self.origin_name.as_deref(),
            self.created_by.as_deref(),
            &self.namespace,
            &self.attributes,
        )
    }

    /// Checks every field against the upload rules.
    ///
    /// Values containing reserved key separators are rejected rather than escaped.
    pub fn validate(&self) -> Result<(), DomainError> {
        validate_namespace(&self.namespace)?;
        validate_content_type(&self.content_type)?;
        if let Some(name) = &self.origin_name {
            validate_text("origin name", name)?;
        }
        if let Some(creator) = &self.created_by {
            validate_text("created-by", creator)?;
        }

        if self.attributes.len() > MAX_ATTRIBUTES {
            return Err(DomainError::invalid_input(format!(
                "at most {} attributes are allowed, got {}",
                MAX_ATTRIBUTES,
                self.attributes.len()
            )));
        }
        for (key, value) in &self.attributes {
            validate_attribute_key(key)?;
            validate_text("attribute value", value)?;
        }

        let size = meta::encoded_size(&self.store_metadata());
        if size > MAX_METADATA_BYTES {
            return Err(DomainError::invalid_input(format!(
                "metadata is {} bytes, the limit is {}",
                size, MAX_METADATA_BYTES
            )));
        }

        Ok(())
    }
}

fn validate_namespace(namespace: &str) -> Result<(), DomainError> {
    if namespace.is_empty() {
        return Err(DomainError::invalid_input("namespace tag is required"));
    }
    if namespace.len() > MAX_NAMESPACE_LEN {
        return Err(DomainError::invalid_input(format!(
            "namespace tag is longer than {} characters",
            MAX_NAMESPACE_LEN
        )));
    }
    if let Some(c) = namespace
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || *c == '_' || *c == '.'))
    {
        return Err(DomainError::invalid_input(format!(
            "namespace tag contains '{}', only ASCII letters, digits, '_' and '.' are allowed",
            c.escape_default()
        )));
    }
    // "." and ".." would become dot-segments of the storage path
    if namespace.chars().all(|c| c == '.') {
        return Err(DomainError::invalid_input(
            "namespace tag must contain a letter, digit or '_'",
        ));
    }
    Ok(())
}

fn validate_content_type(content_type: &str) -> Result<(), DomainError> {
    if content_type.is_empty() {
        return Err(DomainError::invalid_input("content type is required"));
    }
    if content_type.len() > MAX_CONTENT_TYPE_LEN {
        return Err(DomainError::invalid_input(format!(
            "content type is longer than {} characters",
            MAX_CONTENT_TYPE_LEN
        )));
    }
    if !content_type.chars().all(|c| c.is_ascii_graphic() || c == ' ') {
        return Err(DomainError::invalid_input(
            "content type must be printable ASCII",
        ));
    }
    Ok(())
}

fn validate_text(field: &str, value: &str) -> Result<(), DomainError> {
    if value.len() > MAX_TEXT_LEN {
        return Err(DomainError::invalid_input(format!(
            "{} is longer than {} characters",
            field, MAX_TEXT_LEN
        )));
    }
    if !value.chars().all(|c| c.is_ascii_graphic() || c == ' ') {
        return Err(DomainError::invalid_input(format!(
            "{} must be printable ASCII",
            field
        )));
    }
    // store metadata travels as HTTP header values, which lose surrounding whitespace
    if value.trim() != value {
        return Err(DomainError::invalid_input(format!(
            "{} must not start or end with whitespace",
            field
        )));
    }
    Ok(())
}

fn validate_attribute_key(key: &str) -> Result<(), DomainError> {
    if key.is_empty() || key.len() > MAX_ATTRIBUTE_KEY_LEN {
        return Err(DomainError::invalid_input(format!(
            "attribute key must be 1 to {} characters",
            MAX_ATTRIBUTE_KEY_LEN
        )));
    }
    if !key
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
    {
        return Err(DomainError::invalid_input(format!(
            "attribute key '{}' may only contain a-z, 0-9 and '_'",
            key.escape_default()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn input() -> BlobInput {
        BlobInput::new("hello", "text/plain", "docs")
    }

    fn assert_invalid(input: BlobInput) {
        let err = input.validate().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput, "{}", err);
    }

    #[test]
    fn test_valid_upload() {
        let upload = input()
            .with_origin_name("hello world.txt")
            .with_created_by("alice@example.com")
            .with_attribute("tenant_id", "42");
        assert!(upload.validate().is_ok());
    }

    #[test]
    fn test_namespace_rules() {
        for ns in ["", "a/b", "a-b", "a@b", "a b", "ünï", ".", "..", "..."] {
            let mut upload = input();
            upload.namespace = ns.to_string();
            assert_invalid(upload);
        }
        let mut upload = input();
        upload.namespace = "x".repeat(MAX_NAMESPACE_LEN + 1);
        assert_invalid(upload);

        let mut upload = input();
        upload.namespace = "Tenant_1.images".to_string();
        assert!(upload.validate().is_ok());

        let mut upload = input();
        upload.namespace = ".hidden".to_string();
        assert!(upload.validate().is_ok());
    }

    #[test]
    fn test_content_type_rules() {
        let mut upload = input();
        upload.content_type = String::new();
        assert_invalid(upload);

        let mut upload = input();
        upload.content_type = "text/plain\n".to_string();
        assert_invalid(upload);
    }

    #[test]
    fn test_text_limit() {
        assert!(input()
            .with_origin_name("n".repeat(MAX_TEXT_LEN))
            .validate()
            .is_ok());
        assert_invalid(input().with_origin_name("n".repeat(MAX_TEXT_LEN + 1)));
        assert_invalid(input().with_created_by("tab\there"));
    }

    #[test]
    fn test_surrounding_whitespace_is_rejected() {
        assert_invalid(input().with_origin_name("  padded  "));
        assert_invalid(input().with_origin_name("trailing "));
        assert_invalid(input().with_created_by(" leading"));
        assert_invalid(input().with_attribute("k", "   "));
        assert!(input()
            .with_origin_name("inner space.txt")
            .with_attribute("k", "a b")
            .validate()
            .is_ok());
    }

    #[test]
    fn test_attribute_rules() {
        assert_invalid(input().with_attribute("Upper", "v"));
        assert_invalid(input().with_attribute("with-dash", "v"));
        assert_invalid(input().with_attribute("", "v"));
        assert_invalid(input().with_attribute("k", "v".repeat(MAX_TEXT_LEN + 1)));

        let mut upload = input();
        for i in 0..=MAX_ATTRIBUTES {
            upload = upload.with_attribute(format!("k{}", i), "v");
        }
        assert_invalid(upload);
    }

    #[test]
    fn test_metadata_size_limit() {
        let mut upload = input();
        for i in 0..MAX_ATTRIBUTES {
            upload = upload.with_attribute(format!("key_{:02}", i), "v".repeat(MAX_TEXT_LEN));
        }
        assert_invalid(upload);
    }
}
