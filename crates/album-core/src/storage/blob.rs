//! The object-store contract the upload and gallery pipeline relies on.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::Result;

/// Custom metadata key holding the user caption.
pub const CAPTION_METADATA_KEY: &str = "caption";

/// Reference to a stored object.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectRef {
    pub key: String,
}

impl ObjectRef {
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }
}

/// Metadata reported for a stored object.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectMetadata {
    /// Creation time, when the backend reports one.
    pub created_at: Option<DateTime<Utc>>,
    /// Caller-supplied metadata attached at upload time.
    pub custom: BTreeMap<String, String>,
}

impl ObjectMetadata {
    /// The caption entry, kept as-is even when empty.
    pub fn caption(&self) -> Option<&str> {
        self.custom.get(CAPTION_METADATA_KEY).map(String::as_str)
    }
}

/// Object storage operations used by the album.
///
/// Keys passed to [`BlobStore::put`] must be unique within the store; callers
/// generate them with a random component.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// List objects under `prefix`, stopping after `max_results` when set.
    async fn list(&self, prefix: &str, max_results: Option<usize>) -> Result<Vec<ObjectRef>>;

    /// Resolve an externally fetchable URL for an object.
    async fn download_url(&self, object: &ObjectRef) -> Result<String>;

    /// Fetch creation time and custom metadata for an object.
    async fn metadata(&self, object: &ObjectRef) -> Result<ObjectMetadata>;

    /// Write `payload` under `key` with the given custom metadata.
    async fn put(
        &self,
        key: &str,
        payload: Vec<u8>,
        content_type: &str,
        metadata: BTreeMap<String, String>,
    ) -> Result<ObjectRef>;
}

/// Trim whitespace and surrounding slashes from an object key.
pub fn normalize_object_key(object_key: &str) -> Result<String> {
    let object_key = object_key.trim().trim_matches('/').to_string();
    if object_key.is_empty() {
        return Err(crate::Error::InvalidInput(
            "object_key cannot be empty".to_string(),
        ));
    }
    if object_key.split('/').any(|segment| segment == "..") {
        return Err(crate::Error::InvalidInput(
            "object_key must not contain path traversal segments".to_string(),
        ));
    }
    Ok(object_key)
}

/// Join a root prefix and a key with a single `/`.
pub fn join_key(prefix: &str, key: &str) -> String {
    let prefix = prefix.trim_matches('/');
    let key = key.trim_matches('/');
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}/{key}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn normalize_object_key_rejects_empty() {
        let err = normalize_object_key("   ").unwrap_err();
        match err {
            Error::InvalidInput(message) => assert!(message.contains("object_key")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn normalize_object_key_rejects_traversal() {
        assert!(normalize_object_key("album/../secret").is_err());
        assert_eq!(
            normalize_object_key("/album/a..b.jpg/").unwrap(),
            "album/a..b.jpg"
        );
    }

    #[test]
    fn join_key_handles_empty_prefix() {
        assert_eq!(join_key("", "a.jpg"), "a.jpg");
        assert_eq!(join_key("/wedding/", "a.jpg"), "wedding/a.jpg");
    }

    #[test]
    fn caption_keeps_empty_string() {
        let mut metadata = ObjectMetadata::default();
        assert_eq!(metadata.caption(), None);
        metadata
            .custom
            .insert(CAPTION_METADATA_KEY.to_string(), String::new());
        assert_eq!(metadata.caption(), Some(""));
    }
}
