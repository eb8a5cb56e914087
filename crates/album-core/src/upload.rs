//! Concurrent batch upload of pending images.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use futures::future::join_all;
use uuid::Uuid;

use crate::config::AlbumConfig;
use crate::models::{PendingUpload, UploadId};
use crate::storage::{
    join_key, resize_or_original, BlobStore, ObjectRef, ResizeOptions, CAPTION_METADATA_KEY,
};
use crate::util::sanitize_file_name;
use crate::Result;

/// Result of writing one pending item.
#[derive(Debug)]
pub struct UploadOutcome {
    pub id: UploadId,
    pub file_name: String,
    pub result: Result<ObjectRef>,
}

/// Per-item results of a submitted batch, in submission order.
#[derive(Debug, Default)]
pub struct UploadReport {
    pub outcomes: Vec<UploadOutcome>,
}

impl UploadReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|outcome| outcome.result.is_ok())
            .count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    /// Keys written successfully.
    pub fn stored_keys(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter_map(|outcome| outcome.result.as_ref().ok())
            .map(|object| object.key.as_str())
            .collect()
    }
}

/// Writes a batch of pending uploads to the blob store.
#[derive(Clone)]
pub struct UploadOrchestrator {
    store: Arc<dyn BlobStore>,
    root_prefix: String,
    resize: ResizeOptions,
    max_selection: usize,
}

impl UploadOrchestrator {
    pub fn new(store: Arc<dyn BlobStore>, config: &AlbumConfig) -> Self {
        Self {
            store,
            root_prefix: config.root_prefix.clone(),
            resize: config.resize_options(),
            max_selection: config.max_selection,
        }
    }

    /// Upload every item concurrently and wait for all of them to settle.
    ///
    /// Failed items are reported but never retried, and successful writes are
    /// not rolled back. Items beyond the selection limit are skipped.
    pub async fn submit(&self, mut items: Vec<PendingUpload>) -> UploadReport {
        if items.len() > self.max_selection {
            tracing::debug!(
                "Submitting {} of {} items (selection limit)",
                self.max_selection,
                items.len()
            );
            items.truncate(self.max_selection);
        }
        if items.is_empty() {
            return UploadReport::default();
        }

        let outcomes = join_all(items.iter().map(|item| self.upload_one(item))).await;
        let report = UploadReport { outcomes };

        tracing::info!(
            "Upload batch finished: {} stored, {} failed",
            report.succeeded(),
            report.failed()
        );
        report
    }

    async fn upload_one(&self, item: &PendingUpload) -> UploadOutcome {
        let prepared = resize_or_original(item, self.resize).await;
        let key = build_object_key(&self.root_prefix, &item.file_name, &prepared.extension);

        let mut metadata = BTreeMap::new();
        metadata.insert(CAPTION_METADATA_KEY.to_string(), item.caption.clone());

        let result = self
            .store
            .put(&key, prepared.bytes, &prepared.content_type, metadata)
            .await;
        match &result {
            Ok(object) => tracing::debug!("Uploaded {} as {}", item.file_name, object.key),
            Err(error) => tracing::warn!("Upload of {} failed: {}", item.file_name, error),
        }

        UploadOutcome {
            id: item.id,
            file_name: item.file_name.clone(),
            result,
        }
    }
}

/// Unique object key: `{prefix}/{unix_ms}-{uuid}-{file stem}.{extension}`.
pub fn build_object_key(prefix: &str, file_name: &str, extension: &str) -> String {
    let (stem, _) = sanitize_file_name(file_name);
    let ts = Utc::now().timestamp_millis();
    let id = Uuid::now_v7();
    let extension = extension.trim_start_matches('.');

    let name = if extension.is_empty() {
        format!("{ts}-{id}-{stem}")
    } else {
        format!("{ts}-{id}-{stem}.{extension}")
    };
    join_key(prefix, &name)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use image::{DynamicImage, GenericImageView, ImageBuffer, ImageFormat, Rgb};

    use super::*;
    use crate::storage::MemoryBlobStore;
    use crate::Error;

    fn png(width: u32, height: u32) -> Vec<u8> {
        let image = ImageBuffer::from_pixel(width, height, Rgb([200u8, 30, 60]));
        let mut cursor = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(image)
            .write_to(&mut cursor, ImageFormat::Png)
            .unwrap();
        cursor.into_inner()
    }

    fn orchestrator(store: &Arc<MemoryBlobStore>, config: &AlbumConfig) -> UploadOrchestrator {
        let store: Arc<dyn BlobStore> = store.clone();
        UploadOrchestrator::new(store, config)
    }

    #[test]
    fn build_object_key_is_unique_and_prefixed() {
        let first = build_object_key("wedding", "First Dance.PNG", "jpg");
        let second = build_object_key("wedding", "First Dance.PNG", "jpg");

        assert_ne!(first, second);
        assert!(first.starts_with("wedding/"));
        assert!(first.ends_with("-first-dance.jpg"));
        assert!(!build_object_key("", "a.png", "png").starts_with('/'));
    }

    #[tokio::test]
    async fn submit_writes_resized_payload_with_caption() {
        let store = Arc::new(MemoryBlobStore::default());
        let config = AlbumConfig {
            max_dimension: 64,
            ..AlbumConfig::default()
        };
        let mut item = PendingUpload::new("cake.png", "image/png", png(256, 128));
        item.caption = "The cake".to_string();

        let report = orchestrator(&store, &config).submit(vec![item]).await;

        assert_eq!(report.succeeded(), 1);
        let key = report.stored_keys()[0].to_string();
        assert!(key.ends_with("-cake.jpg"));

        let (bytes, content_type) = store.object(&key).unwrap().unwrap();
        assert_eq!(content_type, "image/jpeg");
        assert_eq!(image::load_from_memory(&bytes).unwrap().dimensions(), (64, 32));

        let metadata = store.metadata(&ObjectRef::new(key)).await.unwrap();
        assert_eq!(metadata.caption(), Some("The cake"));
    }

    #[tokio::test]
    async fn submit_stores_empty_caption_as_empty_string() {
        let store = Arc::new(MemoryBlobStore::default());
        let item = PendingUpload::new("a.png", "image/png", png(4, 4));

        let report = orchestrator(&store, &AlbumConfig::default())
            .submit(vec![item])
            .await;

        let object = ObjectRef::new(report.stored_keys()[0]);
        let metadata = store.metadata(&object).await.unwrap();
        assert_eq!(metadata.caption(), Some(""));
    }

    #[tokio::test]
    async fn submit_reports_failures_without_stopping_the_batch() {
        let store = Arc::new(MemoryBlobStore::default());
        store.fail_writes_matching("broken").unwrap();
        let items = vec![
            PendingUpload::new("good.png", "image/png", png(8, 8)),
            PendingUpload::new("broken.png", "image/png", png(8, 8)),
        ];
        let broken_id = items[1].id;

        let report = orchestrator(&store, &AlbumConfig::default())
            .submit(items)
            .await;

        assert_eq!(report.succeeded(), 1);
        assert_eq!(report.failed(), 1);
        let failed = report
            .outcomes
            .iter()
            .find(|outcome| outcome.result.is_err())
            .unwrap();
        assert_eq!(failed.id, broken_id);
        assert!(matches!(failed.result, Err(Error::Write(_))));
        assert_eq!(store.len().unwrap(), 1);
    }

    #[tokio::test]
    async fn submit_uploads_undecodable_files_unmodified() {
        let store = Arc::new(MemoryBlobStore::default());
        let item = PendingUpload::new("scan.png", "image/png", b"truncated".to_vec());

        let report = orchestrator(&store, &AlbumConfig::default())
            .submit(vec![item])
            .await;

        let key = report.stored_keys()[0].to_string();
        assert!(key.ends_with("-scan.png"));
        let (bytes, content_type) = store.object(&key).unwrap().unwrap();
        assert_eq!(bytes, b"truncated");
        assert_eq!(content_type, "image/png");
    }

    #[tokio::test]
    async fn submit_caps_batch_to_max_selection() {
        let store = Arc::new(MemoryBlobStore::default());
        let config = AlbumConfig {
            max_selection: 2,
            ..AlbumConfig::default()
        };
        let items = (0..3)
            .map(|index| PendingUpload::new(format!("{index}.png"), "image/png", png(2, 2)))
            .collect();

        let report = orchestrator(&store, &config).submit(items).await;

        assert_eq!(report.outcomes.len(), 2);
        assert_eq!(store.len().unwrap(), 2);
    }

    #[tokio::test]
    async fn submit_empty_batch_writes_nothing() {
        let store = Arc::new(MemoryBlobStore::default());
        let report = orchestrator(&store, &AlbumConfig::default())
            .submit(Vec::new())
            .await;
        assert!(report.outcomes.is_empty());
        assert!(store.is_empty().unwrap());
    }
}
