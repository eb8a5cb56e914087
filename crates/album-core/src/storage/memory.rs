//! In-process blob store for tests and offline demos.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::blob::{normalize_object_key, BlobStore, ObjectMetadata, ObjectRef};
use crate::{Error, Result};

#[derive(Debug, Clone)]
struct StoredObject {
    bytes: Vec<u8>,
    content_type: String,
    metadata: ObjectMetadata,
}

/// Blob store kept entirely in memory.
///
/// Writes whose key contains a registered fragment fail, and listing can be
/// switched to fail, so error paths can be driven without a network.
#[derive(Debug)]
pub struct MemoryBlobStore {
    base_url: String,
    objects: Mutex<BTreeMap<String, StoredObject>>,
    failing_fragments: Mutex<Vec<String>>,
    fail_list: AtomicBool,
}

impl Default for MemoryBlobStore {
    fn default() -> Self {
        Self::new("memory://album")
    }
}

impl MemoryBlobStore {
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            objects: Mutex::new(BTreeMap::new()),
            failing_fragments: Mutex::new(Vec::new()),
            fail_list: AtomicBool::new(false),
        }
    }

    /// Seed an object with an explicit creation time.
    pub fn insert(
        &self,
        key: &str,
        bytes: Vec<u8>,
        created_at: Option<DateTime<Utc>>,
        custom: BTreeMap<String, String>,
    ) -> Result<ObjectRef> {
        let key = normalize_object_key(key)?;
        lock(&self.objects)?.insert(
            key.clone(),
            StoredObject {
                bytes,
                content_type: "application/octet-stream".to_string(),
                metadata: ObjectMetadata { created_at, custom },
            },
        );
        Ok(ObjectRef::new(key))
    }

    /// Make every later write whose key contains `fragment` fail.
    pub fn fail_writes_matching(&self, fragment: impl Into<String>) -> Result<()> {
        lock(&self.failing_fragments)?.push(fragment.into());
        Ok(())
    }

    /// Toggle listing failures.
    pub fn set_fail_list(&self, fail: bool) {
        self.fail_list.store(fail, Ordering::SeqCst);
    }

    /// Number of stored objects.
    pub fn len(&self) -> Result<usize> {
        Ok(lock(&self.objects)?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Stored bytes and content type for a key.
    pub fn object(&self, key: &str) -> Result<Option<(Vec<u8>, String)>> {
        Ok(lock(&self.objects)?
            .get(key)
            .map(|object| (object.bytes.clone(), object.content_type.clone())))
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn list(&self, prefix: &str, max_results: Option<usize>) -> Result<Vec<ObjectRef>> {
        if self.fail_list.load(Ordering::SeqCst) {
            return Err(Error::List("memory store listing disabled".to_string()));
        }

        let prefix = prefix.trim_matches('/');
        let objects = lock(&self.objects)?;
        Ok(objects
            .keys()
            .filter(|key| prefix.is_empty() || key.starts_with(&format!("{prefix}/")))
            .take(max_results.unwrap_or(usize::MAX))
            .map(ObjectRef::new)
            .collect())
    }

    async fn download_url(&self, object: &ObjectRef) -> Result<String> {
        if !lock(&self.objects)?.contains_key(&object.key) {
            return Err(Error::NotFound(object.key.clone()));
        }
        Ok(format!("{}/{}", self.base_url, object.key))
    }

    async fn metadata(&self, object: &ObjectRef) -> Result<ObjectMetadata> {
        lock(&self.objects)?
            .get(&object.key)
            .map(|stored| stored.metadata.clone())
            .ok_or_else(|| Error::NotFound(object.key.clone()))
    }

    async fn put(
        &self,
        key: &str,
        payload: Vec<u8>,
        content_type: &str,
        metadata: BTreeMap<String, String>,
    ) -> Result<ObjectRef> {
        let key = normalize_object_key(key)?;
        if lock(&self.failing_fragments)?
            .iter()
            .any(|fragment| key.contains(fragment.as_str()))
        {
            return Err(Error::Write(format!("memory store rejected {key}")));
        }

        lock(&self.objects)?.insert(
            key.clone(),
            StoredObject {
                bytes: payload,
                content_type: content_type.to_string(),
                metadata: ObjectMetadata {
                    created_at: Some(Utc::now()),
                    custom: metadata,
                },
            },
        );
        Ok(ObjectRef::new(key))
    }
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>> {
    mutex
        .lock()
        .map_err(|_| Error::Storage("memory store lock poisoned".to_string()))
}
