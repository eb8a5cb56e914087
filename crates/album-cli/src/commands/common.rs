use std::fs;
use std::path::Path;

use album_core::gallery::PageControl;
use album_core::{GalleryItem, Notice, SelectedFile};
use chrono::{DateTime, Utc};

use crate::error::CliError;

pub fn read_selected_file(path: &Path) -> Result<SelectedFile, CliError> {
    let bytes = fs::read(path).map_err(|source| CliError::ReadFile {
        path: path.to_path_buf(),
        source,
    })?;
    let file_name = path
        .file_name()
        .map_or_else(|| "image".to_string(), |name| name.to_string_lossy().into_owned());
    Ok(SelectedFile::new(file_name, bytes))
}

pub fn format_relative_time(timestamp: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let diff = now.signed_duration_since(timestamp).num_milliseconds().max(0);
    let minute = 60_000;
    let hour = 60 * minute;
    let day = 24 * hour;
    let week = 7 * day;
    let month = 30 * day;
    let year = 365 * day;

    if diff < minute {
        "just now".to_string()
    } else if diff < hour {
        format!("{}m ago", diff / minute)
    } else if diff < day {
        format!("{}h ago", diff / hour)
    } else if diff < week {
        format!("{}d ago", diff / day)
    } else if diff < month {
        format!("{}w ago", diff / week)
    } else if diff < year {
        format!("{}mo ago", diff / month)
    } else {
        format!("{}y ago", diff / year)
    }
}

pub fn format_gallery_lines(items: &[GalleryItem], now: DateTime<Utc>) -> Vec<String> {
    items
        .iter()
        .map(|item| {
            let age = item
                .created_at
                .map_or_else(|| "-".to_string(), |at| format_relative_time(at, now));
            match item.caption.as_deref().filter(|caption| !caption.is_empty()) {
                Some(caption) => format!("{age:>8}  {}  \"{caption}\"", item.key),
                None => format!("{age:>8}  {}", item.key),
            }
        })
        .collect()
}

pub fn format_page_controls(controls: &[PageControl], current: usize) -> String {
    controls
        .iter()
        .map(|control| match control {
            PageControl::Page(page) if *page == current => format!("[{page}]"),
            PageControl::Page(page) => page.to_string(),
            PageControl::Ellipsis => "...".to_string(),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn print_notices(notices: &[Notice]) {
    for notice in notices {
        eprintln!("{}", notice.message);
    }
}
