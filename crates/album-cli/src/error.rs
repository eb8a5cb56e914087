use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] album_core::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Failed to read {path}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Got {captions} captions for {files} files")]
    TooManyCaptions { captions: usize, files: usize },
    #[error("The gallery could not be loaded")]
    GalleryUnavailable,
    #[error(
        "Storage is not configured. Set R2_ACCOUNT_ID, R2_BUCKET, R2_ACCESS_KEY_ID and R2_SECRET_ACCESS_KEY."
    )]
    StorageNotConfigured,
}
