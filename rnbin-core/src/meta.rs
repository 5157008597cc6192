//! Translation between blob attributes and the flat per-object metadata of the store.
//!
//! Field names are fixed and shared by every version of the gateway:
//!
//! | field       | store metadata key      |
//! |-------------|-------------------------|
//! | origin name | `rnbin-origin-name`     |
//! | created by  | `rnbin-created-by`      |
//! | namespace   | `rnbin-sep`             |
//! | attribute   | `rnbin-attr-<key>`      |
//!
//! The names are lower case, hyphen separated words so they survive the
//! store's header-name normalization. Reads match them case-insensitively.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::gateway::ObjectHead;

pub const META_ORIGIN_NAME: &str = "rnbin-origin-name";
pub const META_CREATED_BY: &str = "rnbin-created-by";
pub const META_NAMESPACE: &str = "rnbin-sep";
pub const META_ATTR_PREFIX: &str = "rnbin-attr-";

/// Free-form caller attributes.
pub type Attributes = BTreeMap<String, String>;

/// Metadata of a stored blob as seen by callers.
///
/// Fields the store did not report are empty (or zero, or the Unix epoch for
/// `last_modified`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Meta {
    pub content_type: String,
    pub content_length: u64,
    pub last_modified: DateTime<Utc>,
    pub namespace: String,
    pub origin_name: String,
    pub created_by: String,
    pub attributes: Attributes,
}

/// Builds the store metadata for an upload. Absent and empty optional fields are left out.
pub fn encode(
    origin_name: Option<&str>,
    created_by: Option<&str>,
    namespace: &str,
    attributes: &Attributes,
) -> HashMap<String, String> {
    let mut metadata = HashMap::with_capacity(3 + attributes.len());

    metadata.insert(META_NAMESPACE.to_string(), namespace.to_string());
    if let Some(name) = origin_name.filter(|s| !s.is_empty()) {
        metadata.insert(META_ORIGIN_NAME.to_string(), name.to_string());
    }
    if let Some(creator) = created_by.filter(|s| !s.is_empty()) {
        metadata.insert(META_CREATED_BY.to_string(), creator.to_string());
    }
    for (key, value) in attributes {
        metadata.insert(format!("{}{}", META_ATTR_PREFIX, key), value.clone());
    }

    metadata
}

/// Number of bytes the metadata occupies in the store (names plus values).
pub fn encoded_size(metadata: &HashMap<String, String>) -> usize {
    metadata.iter().map(|(k, v)| k.len() + v.len()).sum()
}

/// Builds a [`Meta`] from what the store returned.
///
/// Unknown metadata keys are ignored; empty attribute values are dropped like
/// any other empty field.
pub fn decode(head: &ObjectHead) -> Meta {
    let mut meta = Meta {
        content_type: head.content_type.clone().unwrap_or_default(),
        content_length: head.content_length.unwrap_or(0),
        last_modified: head.last_modified.unwrap_or_default(),
        ..Default::default()
    };

    for (raw_key, value) in &head.metadata {
        if value.is_empty() {
            continue;
        }
        let key = raw_key.to_ascii_lowercase();
        match key.as_str() {
            META_ORIGIN_NAME => meta.origin_name = value.clone(),
            META_CREATED_BY => meta.created_by = value.clone(),
            META_NAMESPACE => meta.namespace = value.clone(),
            _ => {
                if let Some(attr) = key.strip_prefix(META_ATTR_PREFIX) {
                    if !attr.is_empty() {
                        meta.attributes.insert(attr.to_string(), value.clone());
                    }
                }
            }
        }
    }

    meta
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_encode_fields() {
        let mut attributes = Attributes::new();
        attributes.insert("tenant".to_string(), "acme".to_string());

        let metadata = encode(Some("cat.png"), Some("alice"), "docs", &attributes);
        assert_eq!(metadata.len(), 4);
        assert_eq!(metadata[META_ORIGIN_NAME], "cat.png");
        assert_eq!(metadata[META_CREATED_BY], "alice");
        assert_eq!(metadata[META_NAMESPACE], "docs");
        assert_eq!(metadata["rnbin-attr-tenant"], "acme");
        assert_eq!(
            encoded_size(&metadata),
            metadata.iter().map(|(k, v)| k.len() + v.len()).sum::<usize>()
        );
    }

    #[test]
    fn test_encode_skips_absent_and_empty() {
        let metadata = encode(None, Some(""), "docs", &Attributes::new());
        assert_eq!(metadata.len(), 1);
        assert!(!metadata.contains_key(META_ORIGIN_NAME));
        assert!(!metadata.contains_key(META_CREATED_BY));
    }

    #[test]
    fn test_decode_round_trip() {
        let mut attributes = Attributes::new();
        attributes.insert("feature".to_string(), "avatars".to_string());
        attributes.insert("rev_2".to_string(), "b".to_string());
        let modified = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();

        let head = ObjectHead {
            content_type: Some("image/png".to_string()),
            content_length: Some(42),
            last_modified: Some(modified),
            metadata: encode(Some("cat.png"), None, "docs", &attributes),
        };
        let meta = decode(&head);

        assert_eq!(meta.content_type, "image/png");
        assert_eq!(meta.content_length, 42);
        assert_eq!(meta.last_modified, modified);
        assert_eq!(meta.namespace, "docs");
        assert_eq!(meta.origin_name, "cat.png");
        assert_eq!(meta.created_by, "");
        assert_eq!(meta.attributes, attributes);
    }

    #[test]
    fn test_decode_empty_head() {
        let meta = decode(&ObjectHead::default());
        assert_eq!(meta, Meta::default());
        assert_eq!(meta.last_modified.timestamp(), 0);
    }

    #[test]
    fn test_decode_is_case_insensitive_and_lenient() {
        let mut metadata = HashMap::new();
        metadata.insert("Rnbin-Origin-Name".to_string(), "report.pdf".to_string());
        metadata.insert("RNBIN-CREATED-BY".to_string(), "".to_string());
        metadata.insert("Rnbin-Attr-Owner".to_string(), "bob".to_string());
        metadata.insert("rnbin-attr-".to_string(), "dangling".to_string());
        metadata.insert("x-unrelated".to_string(), "ignored".to_string());

        let meta = decode(&ObjectHead {
            metadata,
            ..Default::default()
        });
        assert_eq!(meta.origin_name, "report.pdf");
        assert_eq!(meta.created_by, "");
        assert_eq!(meta.namespace, "");
        assert_eq!(meta.attributes.len(), 1);
        assert_eq!(meta.attributes["owner"], "bob");
    }
}
