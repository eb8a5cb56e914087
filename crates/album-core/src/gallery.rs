//! Gallery listing, refresh bookkeeping and pagination.

use std::sync::Arc;

use futures::future::try_join_all;
use serde::{Deserialize, Serialize};

use crate::config::AlbumConfig;
use crate::models::{sort_newest_first, GalleryItem};
use crate::storage::{BlobStore, ObjectRef};
use crate::{Error, Result};

/// Number of numbered page buttons shown around the current page.
pub const DEFAULT_VISIBLE_PAGES: usize = 3;

/// Resolves every stored object into a sorted gallery collection.
#[derive(Clone)]
pub struct GalleryFetcher {
    store: Arc<dyn BlobStore>,
    root_prefix: String,
    max_results: Option<usize>,
}

impl GalleryFetcher {
    pub fn new(store: Arc<dyn BlobStore>, config: &AlbumConfig) -> Self {
        Self {
            store,
            root_prefix: config.root_prefix.clone(),
            max_results: config.list_max_results,
        }
    }

    /// List the store and resolve URL and metadata for each object
    /// concurrently, newest first.
    ///
    /// Any failure fails the whole fetch so a caller never shows a partial
    /// collection.
    pub async fn fetch_all(&self) -> Result<Vec<GalleryItem>> {
        let objects = self
            .store
            .list(&self.root_prefix, self.max_results)
            .await
            .map_err(into_list_error)?;

        let mut items = try_join_all(objects.into_iter().map(|object| self.resolve(object)))
            .await
            .map_err(into_list_error)?;
        sort_newest_first(&mut items);

        tracing::info!("Fetched {} gallery items", items.len());
        Ok(items)
    }

    async fn resolve(&self, object: ObjectRef) -> Result<GalleryItem> {
        let (url, metadata) = futures::try_join!(
            self.store.download_url(&object),
            self.store.metadata(&object)
        )?;

        Ok(GalleryItem {
            url,
            caption: metadata.caption().map(ToOwned::to_owned),
            created_at: metadata.created_at,
            key: object.key,
        })
    }
}

fn into_list_error(error: Error) -> Error {
    match error {
        Error::List(_) => error,
        other => Error::List(other.to_string()),
    }
}

/// Loading state of the gallery collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoadState {
    Idle,
    Loading,
    Ready,
}

/// Handle for one refresh; only the most recently issued ticket may apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshTicket(u64);

/// What [`Gallery::finish_refresh`] did with a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshApplied {
    /// The collection was replaced.
    Replaced,
    /// The fetch failed; the previous collection was kept.
    Failed,
    /// A newer refresh was started; the result was discarded.
    Stale,
}

/// One entry in the pagination strip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "page", rename_all = "snake_case")]
pub enum PageControl {
    Page(usize),
    Ellipsis,
}

/// The displayed gallery collection and page cursor.
#[derive(Debug, Clone)]
pub struct Gallery {
    items: Vec<GalleryItem>,
    page_size: usize,
    current_page: usize,
    state: LoadState,
    generation: u64,
}

impl Gallery {
    /// A `page_size` of zero is treated as one.
    #[must_use]
    pub fn new(page_size: usize) -> Self {
        Self {
            items: Vec::new(),
            page_size: page_size.max(1),
            current_page: 1,
            state: LoadState::Idle,
            generation: 0,
        }
    }

    pub fn items(&self) -> &[GalleryItem] {
        &self.items
    }

    pub const fn page_size(&self) -> usize {
        self.page_size
    }

    pub const fn current_page(&self) -> usize {
        self.current_page
    }

    pub const fn state(&self) -> LoadState {
        self.state
    }

    pub fn is_loading(&self) -> bool {
        self.state == LoadState::Loading
    }

    /// Enter `Loading` and issue a ticket that supersedes earlier ones.
    pub fn begin_refresh(&mut self) -> RefreshTicket {
        self.generation += 1;
        self.state = LoadState::Loading;
        RefreshTicket(self.generation)
    }

    /// Apply a fetch result if `ticket` is still the latest refresh.
    pub fn finish_refresh(
        &mut self,
        ticket: RefreshTicket,
        result: Result<Vec<GalleryItem>>,
    ) -> RefreshApplied {
        if ticket.0 != self.generation {
            tracing::debug!(
                "Discarding gallery refresh {} (latest is {})",
                ticket.0,
                self.generation
            );
            return RefreshApplied::Stale;
        }

        match result {
            Ok(items) => {
                self.items = items;
                self.current_page = self.current_page.clamp(1, self.total_pages().max(1));
                self.state = LoadState::Ready;
                RefreshApplied::Replaced
            }
            Err(error) => {
                tracing::warn!("Gallery refresh failed: {}", error);
                self.state = if self.items.is_empty() {
                    LoadState::Idle
                } else {
                    LoadState::Ready
                };
                RefreshApplied::Failed
            }
        }
    }

    /// Number of pages, zero for an empty gallery.
    pub fn total_pages(&self) -> usize {
        self.items.len().div_ceil(self.page_size)
    }

    /// Items on 1-based page `page`; empty for page zero or past the end.
    pub fn page(&self, page: usize) -> &[GalleryItem] {
        let Some(start) = page
            .checked_sub(1)
            .and_then(|index| index.checked_mul(self.page_size))
        else {
            return &[];
        };
        if start >= self.items.len() {
            return &[];
        }
        let end = (start + self.page_size).min(self.items.len());
        &self.items[start..end]
    }

    pub fn current_items(&self) -> &[GalleryItem] {
        self.page(self.current_page)
    }

    /// Move the cursor, clamped to the available pages. Never changes the
    /// load state.
    pub fn set_page(&mut self, page: usize) -> usize {
        self.current_page = page.clamp(1, self.total_pages().max(1));
        self.current_page
    }

    pub const fn has_previous(&self) -> bool {
        self.current_page > 1
    }

    pub fn has_next(&self) -> bool {
        self.current_page < self.total_pages()
    }

    /// Pagination strip for the current page.
    pub fn page_controls(&self, visible: usize) -> Vec<PageControl> {
        page_controls(self.current_page, self.total_pages(), visible)
    }
}

/// Build a pagination strip: a window of `visible` pages around `current`,
/// plus the first and last page with ellipses when the window misses them.
pub fn page_controls(current: usize, total: usize, visible: usize) -> Vec<PageControl> {
    if total == 0 {
        return Vec::new();
    }
    let visible = visible.max(1);
    let current = current.clamp(1, total);

    let start = current.saturating_sub(visible / 2).max(1);
    let end = (start + visible - 1).min(total);
    let start = (end + 1).saturating_sub(visible).max(1);

    let mut controls = Vec::with_capacity(visible + 4);
    if start > 1 {
        controls.push(PageControl::Page(1));
        if start > 2 {
            controls.push(PageControl::Ellipsis);
        }
    }
    controls.extend((start..=end).map(PageControl::Page));
    if end < total {
        if end + 1 < total {
            controls.push(PageControl::Ellipsis);
        }
        controls.push(PageControl::Page(total));
    }
    controls
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::storage::{MemoryBlobStore, CAPTION_METADATA_KEY};

    use super::PageControl::{Ellipsis, Page};

    fn item(index: usize) -> GalleryItem {
        GalleryItem {
            key: format!("photo-{index}"),
            url: format!("memory://album/photo-{index}"),
            caption: None,
            created_at: None,
        }
    }

    fn ready_gallery(count: usize, page_size: usize) -> Gallery {
        let mut gallery = Gallery::new(page_size);
        let ticket = gallery.begin_refresh();
        gallery.finish_refresh(ticket, Ok((0..count).map(item).collect()));
        gallery
    }

    fn seeded_store(count: i64) -> Arc<MemoryBlobStore> {
        let store = Arc::new(MemoryBlobStore::new("https://cdn.example.com"));
        for index in 0..count {
            let mut custom = BTreeMap::new();
            custom.insert(CAPTION_METADATA_KEY.to_string(), format!("caption {index}"));
            store
                .insert(
                    &format!("album/{index:03}.jpg"),
                    Vec::new(),
                    Some(Utc.timestamp_opt(1_700_000_000 + index, 0).unwrap()),
                    custom,
                )
                .unwrap();
        }
        store
    }

    fn fetcher(store: &Arc<MemoryBlobStore>, config: &AlbumConfig) -> GalleryFetcher {
        let store: Arc<dyn BlobStore> = store.clone();
        GalleryFetcher::new(store, config)
    }

    fn album_config() -> AlbumConfig {
        AlbumConfig {
            root_prefix: "album".to_string(),
            ..AlbumConfig::default()
        }
    }

    #[tokio::test]
    async fn fetch_all_sorts_newest_first_and_resolves_fields() {
        let store = seeded_store(3);
        let items = fetcher(&store, &album_config()).fetch_all().await.unwrap();

        let keys: Vec<&str> = items.iter().map(|item| item.key.as_str()).collect();
        assert_eq!(keys, vec!["album/002.jpg", "album/001.jpg", "album/000.jpg"]);
        assert_eq!(items[0].url, "https://cdn.example.com/album/002.jpg");
        assert_eq!(items[0].caption.as_deref(), Some("caption 2"));
    }

    #[tokio::test]
    async fn fetch_all_tolerates_missing_metadata() {
        let store = Arc::new(MemoryBlobStore::default());
        store
            .insert("album/bare.jpg", Vec::new(), None, BTreeMap::new())
            .unwrap();

        let items = fetcher(&store, &album_config()).fetch_all().await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].caption, None);
        assert_eq!(items[0].created_at, None);
    }

    #[tokio::test]
    async fn fetch_all_respects_max_results() {
        let store = seeded_store(10);
        let config = AlbumConfig {
            list_max_results: Some(4),
            ..album_config()
        };
        assert_eq!(fetcher(&store, &config).fetch_all().await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn fetch_all_maps_failures_to_list_errors() {
        let store = seeded_store(2);
        store.set_fail_list(true);

        let err = fetcher(&store, &album_config()).fetch_all().await.unwrap_err();
        assert!(matches!(err, Error::List(_)));
    }

    #[tokio::test]
    async fn sixty_five_objects_make_two_pages() {
        let store = seeded_store(65);
        let mut gallery = Gallery::new(60);
        let ticket = gallery.begin_refresh();
        let result = fetcher(&store, &album_config()).fetch_all().await;
        assert_eq!(gallery.finish_refresh(ticket, result), RefreshApplied::Replaced);

        assert_eq!(gallery.total_pages(), 2);
        assert_eq!(gallery.page(1).len(), 60);
        assert_eq!(gallery.page(2).len(), 5);
        assert!(gallery.page(3).is_empty());
        assert_eq!(gallery.page(1)[0].key, "album/064.jpg");
        assert_eq!(gallery.page(2)[4].key, "album/000.jpg");
    }

    #[test]
    fn page_zero_and_empty_gallery_are_empty() {
        let gallery = ready_gallery(5, 2);
        assert!(gallery.page(0).is_empty());
        assert!(Gallery::new(10).page(1).is_empty());
        assert_eq!(Gallery::new(10).total_pages(), 0);
    }

    #[test]
    fn page_handles_huge_page_numbers() {
        let gallery = ready_gallery(5, 2);
        assert!(gallery.page(usize::MAX).is_empty());
    }

    #[test]
    fn refresh_moves_through_load_states() {
        let mut gallery = Gallery::new(10);
        assert_eq!(gallery.state(), LoadState::Idle);

        let ticket = gallery.begin_refresh();
        assert!(gallery.is_loading());

        gallery.finish_refresh(ticket, Ok(vec![item(1)]));
        assert_eq!(gallery.state(), LoadState::Ready);
    }

    #[test]
    fn stale_refresh_is_discarded() {
        let mut gallery = Gallery::new(10);
        let slow = gallery.begin_refresh();
        let fast = gallery.begin_refresh();

        assert_eq!(
            gallery.finish_refresh(fast, Ok(vec![item(1), item(2)])),
            RefreshApplied::Replaced
        );
        assert_eq!(
            gallery.finish_refresh(slow, Ok(vec![item(9)])),
            RefreshApplied::Stale
        );
        assert_eq!(gallery.items().len(), 2);
    }

    #[test]
    fn failed_refresh_keeps_previous_items() {
        let mut gallery = ready_gallery(3, 10);
        let ticket = gallery.begin_refresh();

        let applied = gallery.finish_refresh(ticket, Err(Error::List("offline".to_string())));

        assert_eq!(applied, RefreshApplied::Failed);
        assert_eq!(gallery.items().len(), 3);
        assert_eq!(gallery.state(), LoadState::Ready);
    }

    #[test]
    fn failed_first_refresh_returns_to_idle() {
        let mut gallery = Gallery::new(10);
        let ticket = gallery.begin_refresh();
        gallery.finish_refresh(ticket, Err(Error::List("offline".to_string())));
        assert_eq!(gallery.state(), LoadState::Idle);
    }

    #[test]
    fn set_page_clamps_and_keeps_state() {
        let mut gallery = ready_gallery(25, 10);

        assert_eq!(gallery.set_page(3), 3);
        assert_eq!(gallery.current_items().len(), 5);
        assert_eq!(gallery.set_page(9), 3);
        assert_eq!(gallery.set_page(0), 1);
        assert_eq!(gallery.state(), LoadState::Ready);
        assert!(!gallery.has_previous());
        assert!(gallery.has_next());
    }

    #[test]
    fn refresh_clamps_current_page_when_collection_shrinks() {
        let mut gallery = ready_gallery(30, 10);
        gallery.set_page(3);

        let ticket = gallery.begin_refresh();
        gallery.finish_refresh(ticket, Ok((0..12).map(item).collect()));

        assert_eq!(gallery.current_page(), 2);
    }

    #[test]
    fn page_controls_window_and_ellipses() {
        assert_eq!(page_controls(1, 0, 3), Vec::<PageControl>::new());
        assert_eq!(page_controls(1, 1, 3), vec![Page(1)]);
        assert_eq!(page_controls(1, 3, 3), vec![Page(1), Page(2), Page(3)]);
        assert_eq!(
            page_controls(1, 10, 3),
            vec![Page(1), Page(2), Page(3), Ellipsis, Page(10)]
        );
        assert_eq!(
            page_controls(5, 10, 3),
            vec![Page(1), Ellipsis, Page(4), Page(5), Page(6), Ellipsis, Page(10)]
        );
        assert_eq!(
            page_controls(10, 10, 3),
            vec![Page(1), Ellipsis, Page(8), Page(9), Page(10)]
        );
        assert_eq!(
            page_controls(3, 5, 3),
            vec![Page(1), Page(2), Page(3), Page(4), Page(5)]
        );
    }

    #[test]
    fn page_control_serializes_with_kind_tag() {
        let json = serde_json::to_string(&[Page(2), Ellipsis]).unwrap();
        assert_eq!(json, r#"[{"kind":"page","page":2},{"kind":"ellipsis"}]"#);
    }
}
