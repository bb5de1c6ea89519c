//! Key-value storage for persisted snapshots.

mod memory;

#[cfg(not(target_arch = "wasm32"))]
mod file;

#[cfg(target_arch = "wasm32")]
mod local;

pub use memory::MemoryStore;

#[cfg(not(target_arch = "wasm32"))]
pub use file::FileStore;

#[cfg(target_arch = "wasm32")]
pub use local::LocalStorageStore;

use thiserror::Error;

/// Storage errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(String),
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
    #[error("Storage error: {0}")]
    Other(String),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for string key-value backends.
///
/// Values are overwritten wholesale; a missing key is `Ok(None)`, not an
/// error.
pub trait SnapshotStore {
    /// Read the value under `key`.
    fn get(&self, key: &str) -> StorageResult<Option<String>>;

    /// Write `value` under `key`, replacing any previous value.
    fn set(&mut self, key: &str, value: &str) -> StorageResult<()>;

    /// Remove `key`. Removing a missing key succeeds.
    fn remove(&mut self, key: &str) -> StorageResult<()>;

    /// Check if a key exists.
    fn contains(&self, key: &str) -> StorageResult<bool> {
        Ok(self.get(key)?.is_some())
    }
}

impl<S: SnapshotStore + ?Sized> SnapshotStore for Box<S> {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: &str) -> StorageResult<()> {
        (**self).set(key, value)
    }

    fn remove(&mut self, key: &str) -> StorageResult<()> {
        (**self).remove(key)
    }
}

/// Convenience type alias for the platform's persistent store.
#[cfg(not(target_arch = "wasm32"))]
pub type PlatformStore = FileStore;

#[cfg(target_arch = "wasm32")]
pub type PlatformStore = LocalStorageStore;

/// Create the platform's persistent store in its default location.
#[cfg(not(target_arch = "wasm32"))]
pub fn create_default_store() -> StorageResult<PlatformStore> {
    FileStore::default_location()
}

#[cfg(target_arch = "wasm32")]
pub fn create_default_store() -> StorageResult<PlatformStore> {
    LocalStorageStore::new()
}
