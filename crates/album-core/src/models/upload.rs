//! Pending upload model

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use uuid::Uuid;

use crate::util::sanitize_file_name;

/// A unique identifier for a pending upload, using UUID v7.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UploadId(Uuid);

impl UploadId {
    /// Create a new unique upload ID using UUID v7.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for UploadId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for UploadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for UploadId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// A file chosen by the user, before it joins the pending selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedFile {
    /// Original file name.
    pub file_name: String,
    /// Content MIME type.
    pub content_type: String,
    /// Raw file bytes.
    pub bytes: Vec<u8>,
}

impl SelectedFile {
    /// Build a selected file, guessing the content type from the file name.
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let file_name = file_name.into();
        let content_type = guess_content_type(&file_name);
        Self {
            file_name,
            content_type,
            bytes,
        }
    }
}

/// MIME type for a file name based on its image extension.
pub fn guess_content_type(file_name: &str) -> String {
    image::ImageFormat::from_path(Path::new(file_name)).map_or_else(
        |_| "application/octet-stream".to_string(),
        |format| format.to_mime_type().to_string(),
    )
}

/// A selected, not-yet-submitted image plus its caption.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingUpload {
    /// Identity within the current selection.
    pub id: UploadId,
    /// Original file name.
    pub file_name: String,
    /// Content MIME type of `payload`.
    pub content_type: String,
    /// Image bytes as selected.
    pub payload: Arc<[u8]>,
    /// User-entered caption, empty until edited.
    pub caption: String,
}

impl PendingUpload {
    /// Create a pending upload with a fresh id and an empty caption.
    pub fn new(
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        payload: Vec<u8>,
    ) -> Self {
        Self {
            id: UploadId::new(),
            file_name: file_name.into(),
            content_type: content_type.into(),
            payload: Arc::from(payload),
            caption: String::new(),
        }
    }

    /// Sanitized extension of the original file name, `bin` when it has none.
    #[must_use]
    pub fn extension(&self) -> String {
        let (_, ext) = sanitize_file_name(&self.file_name);
        if ext.is_empty() {
            "bin".to_string()
        } else {
            ext
        }
    }
}

impl From<SelectedFile> for PendingUpload {
    fn from(file: SelectedFile) -> Self {
        Self::new(file.file_name, file.content_type, file.bytes)
    }
}
