//! Crate-wide error type.

use crate::config::ConfigError;
use crate::snapshot::SnapshotError;
use crate::storage::StorageError;
use thiserror::Error;

/// Errors surfaced by [`crate::Sketchpad`] operations.
#[derive(Debug, Error)]
pub enum SketchError {
    #[error("Invalid color: {0}")]
    InvalidColor(String),
    #[error("Cannot allocate a {0}x{1} surface")]
    Allocation(u32, u32),
    #[error("Snapshot error: {0}")]
    Snapshot(#[from] SnapshotError),
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

/// Result type for sketchpad operations.
pub type SketchResult<T> = Result<T, SketchError>;
