use album_core::gallery::{PageControl, RefreshApplied};
use album_core::{AppState, GalleryItem};
use chrono::Utc;
use serde::Serialize;

use crate::commands::common::{format_gallery_lines, format_page_controls, print_notices};
use crate::error::CliError;

#[derive(Debug, Serialize)]
pub struct GalleryPage {
    pub page: usize,
    pub total_pages: usize,
    pub total_items: usize,
    pub has_previous: bool,
    pub has_next: bool,
    pub items: Vec<GalleryItem>,
    pub controls: Vec<PageControl>,
}

/// Refresh the gallery and return the requested page, clamped to range.
pub async fn load_page(state: &mut AppState, page: usize) -> Result<GalleryPage, CliError> {
    if state.refresh().await == RefreshApplied::Failed {
        print_notices(&state.drain_notices());
        return Err(CliError::GalleryUnavailable);
    }

    let items = state.change_page(page).to_vec();
    let gallery = state.gallery();
    Ok(GalleryPage {
        page: gallery.current_page(),
        total_pages: gallery.total_pages(),
        total_items: gallery.items().len(),
        has_previous: gallery.has_previous(),
        has_next: gallery.has_next(),
        items,
        controls: state.page_controls(),
    })
}

pub async fn run_list(state: &mut AppState, page: usize, as_json: bool) -> Result<(), CliError> {
    let gallery_page = load_page(state, page).await?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&gallery_page)?);
        return Ok(());
    }

    if gallery_page.items.is_empty() {
        println!("No photos yet.");
        return Ok(());
    }

    for line in format_gallery_lines(&gallery_page.items, Utc::now()) {
        println!("{line}");
    }
    println!(
        "Page {} of {}  {}",
        gallery_page.page,
        gallery_page.total_pages,
        format_page_controls(&gallery_page.controls, gallery_page.page)
    );

    Ok(())
}
