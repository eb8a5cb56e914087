//! Data models for Album

mod gallery;
mod upload;

pub use gallery::{sort_newest_first, GalleryItem};
pub use upload::{guess_content_type, PendingUpload, SelectedFile, UploadId};
