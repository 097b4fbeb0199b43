use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the metadata storage layer.
///
/// Structural problems (`ShardMissing`, `IndexDrift`) are surfaced to the
/// caller of the affected operation; they indicate the on-disk store needs a
/// reindex pass, not a normal miss.
#[derive(Error, Debug)]
pub enum MetadataError {
    /// The key is not listed in any category of the index.
    #[error("no metadata found for key '{0}'")]
    NotFound(String),

    /// The index references a category whose shard file does not exist.
    #[error("shard file missing for category '{category}': {path}")]
    ShardMissing { category: String, path: PathBuf },

    /// The index and shard contents disagree.
    #[error("index drift: {0}")]
    IndexDrift(String),

    /// An I/O error occurred while reading or writing a store file.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A store file could not be parsed or serialized.
    #[error("format error: {0}")]
    Format(#[from] serde_json::Error),
}

/// A specialized Result type for metadata storage operations.
pub type Result<T> = std::result::Result<T, MetadataError>;
