//! album-core - Core library for Album
//!
//! This crate contains the upload and gallery pipeline shared by every album
//! host: pending selection, client-side resizing, concurrent upload to an
//! object store, gallery listing and pagination.

pub mod config;
pub mod environment;
pub mod error;
pub mod gallery;
pub mod models;
pub mod selection;
pub mod state;
pub mod storage;
pub mod upload;
pub mod util;

pub use config::AlbumConfig;
pub use error::{Error, Result};
pub use models::{GalleryItem, PendingUpload, SelectedFile, UploadId};
pub use state::{AppState, Notice, NoticeKind};
