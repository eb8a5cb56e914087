//! Application state owned by a single host.
//!
//! Every handler takes `&mut self`, so selection edits, uploads, refreshes and
//! page changes are applied one at a time.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::AlbumConfig;
use crate::environment::{ClientSignals, EnvironmentGuard};
use crate::gallery::{Gallery, GalleryFetcher, PageControl, RefreshApplied, DEFAULT_VISIBLE_PAGES};
use crate::models::{GalleryItem, SelectedFile, UploadId};
use crate::selection::SelectionManager;
use crate::storage::BlobStore;
use crate::upload::{UploadOrchestrator, UploadReport};
use crate::Result;

/// Category of a user-visible notice.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeKind {
    UploadFailed,
    GalleryUnavailable,
    RestrictedBrowser,
}

/// Message the view shows without blocking interaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

impl Notice {
    fn new(kind: NoticeKind) -> Self {
        let message = match kind {
            NoticeKind::UploadFailed => "Some photos could not be uploaded. Please try again.",
            NoticeKind::GalleryUnavailable => "The gallery could not be loaded right now.",
            NoticeKind::RestrictedBrowser => {
                "Uploads may not work in this in-app browser. Open the page in your regular browser."
            }
        };
        Self {
            kind,
            message: message.to_string(),
        }
    }
}

/// Selection, gallery and notices for one album session.
pub struct AppState {
    config: AlbumConfig,
    selection: SelectionManager,
    gallery: Gallery,
    fetcher: GalleryFetcher,
    orchestrator: UploadOrchestrator,
    guard: EnvironmentGuard,
    notices: Vec<Notice>,
}

impl AppState {
    pub fn new(config: AlbumConfig, store: Arc<dyn BlobStore>) -> Result<Self> {
        Ok(Self {
            selection: SelectionManager::new(config.max_selection),
            gallery: Gallery::new(config.page_size),
            fetcher: GalleryFetcher::new(Arc::clone(&store), &config),
            orchestrator: UploadOrchestrator::new(store, &config),
            guard: EnvironmentGuard::with_defaults()?,
            notices: Vec::new(),
            config,
        })
    }

    pub const fn config(&self) -> &AlbumConfig {
        &self.config
    }

    pub const fn selection(&self) -> &SelectionManager {
        &self.selection
    }

    pub const fn gallery(&self) -> &Gallery {
        &self.gallery
    }

    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    /// Remove and return pending notices.
    pub fn drain_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    pub fn select_files(&mut self, files: impl IntoIterator<Item = SelectedFile>) -> usize {
        self.selection.add_files(files)
    }

    pub fn set_caption(&mut self, id: UploadId, caption: impl Into<String>) -> Result<()> {
        self.selection.set_caption(id, caption)
    }

    pub fn remove_pending(&mut self, id: UploadId) -> bool {
        self.selection.remove_item(id).is_some()
    }

    pub fn clear_pending(&mut self) {
        self.selection.clear_all();
    }

    /// Upload every pending item, then refresh the gallery.
    ///
    /// The pending list is emptied whatever the per-item outcome.
    pub async fn submit(&mut self) -> UploadReport {
        let pending = self.selection.take_all();
        if pending.is_empty() {
            return UploadReport::default();
        }

        let report = self.orchestrator.submit(pending).await;
        if report.failed() > 0 {
            self.push_notice(NoticeKind::UploadFailed);
        }

        self.refresh().await;
        report
    }

    /// Refetch the whole gallery, keeping the current view on failure.
    pub async fn refresh(&mut self) -> RefreshApplied {
        let ticket = self.gallery.begin_refresh();
        let result = self.fetcher.fetch_all().await;
        let applied = self.gallery.finish_refresh(ticket, result);
        if applied == RefreshApplied::Failed {
            self.push_notice(NoticeKind::GalleryUnavailable);
        }
        applied
    }

    /// Switch pages without any I/O.
    pub fn change_page(&mut self, page: usize) -> &[GalleryItem] {
        self.gallery.set_page(page);
        self.gallery.current_items()
    }

    pub fn current_page_items(&self) -> &[GalleryItem] {
        self.gallery.current_items()
    }

    pub fn page_controls(&self) -> Vec<PageControl> {
        self.gallery.page_controls(DEFAULT_VISIBLE_PAGES)
    }

    /// Warn when the client looks like a restricted in-app browser.
    pub fn check_environment(&mut self, signals: &ClientSignals) -> bool {
        let restricted = self.guard.is_restricted_browser_context(signals);
        if restricted {
            tracing::info!("Restricted browser context detected");
            self.push_notice(NoticeKind::RestrictedBrowser);
        }
        restricted
    }

    fn push_notice(&mut self, kind: NoticeKind) {
        self.notices.push(Notice::new(kind));
    }
}
