//! Error types for album-core

use thiserror::Error;

/// Result type alias using album-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in album-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Source image could not be decoded or re-encoded
    #[error("Image decode error: {0}")]
    Decode(String),

    /// A single object write was rejected by the store
    #[error("Upload failed: {0}")]
    Write(String),

    /// Listing the store or resolving an object failed
    #[error("Gallery listing failed: {0}")]
    List(String),

    /// Media/object storage error
    #[error("Storage error: {0}")]
    Storage(String),

    /// Pending upload or object not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Malformed configuration value
    #[error("Configuration error: {0}")]
    Config(String),
}
