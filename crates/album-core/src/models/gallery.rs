//! Gallery item model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A previously uploaded image resolved for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GalleryItem {
    /// Object key in the store.
    pub key: String,
    /// Fetchable image URL.
    pub url: String,
    /// Caption stored alongside the object, `Some("")` when left blank.
    pub caption: Option<String>,
    /// Creation time reported by the store.
    pub created_at: Option<DateTime<Utc>>,
}

/// Order items newest first. Undated items go last; ties keep listing order.
pub fn sort_newest_first(items: &mut [GalleryItem]) {
    items.sort_by(|a, b| match (a.created_at, b.created_at) {
        (Some(a), Some(b)) => b.cmp(&a),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    });
}
