//! Storage abstractions for object backends and upload payloads.

mod blob;
mod memory;
mod r2;
mod resize;

pub use blob::{
    join_key, normalize_object_key, BlobStore, ObjectMetadata, ObjectRef, CAPTION_METADATA_KEY,
};
pub use memory::MemoryBlobStore;
pub use r2::{R2Config, R2Storage};
pub use resize::{
    fit_within, resize_image, resize_or_original, OutputFormat, PreparedPayload, ResizeOptions,
    ResizedImage,
};
