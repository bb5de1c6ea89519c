//! Browser `localStorage` implementation for WebAssembly.

use super::{SnapshotStore, StorageError, StorageResult};

/// Store backed by `window.localStorage`.
pub struct LocalStorageStore {
    storage: web_sys::Storage,
}

impl LocalStorageStore {
    /// Open the page's local storage.
    pub fn new() -> StorageResult<Self> {
        let window = web_sys::window()
            .ok_or_else(|| StorageError::Unavailable("No window object".to_string()))?;
        let storage = window
            .local_storage()
            .map_err(|e| StorageError::Unavailable(format!("localStorage error: {:?}", e)))?
            .ok_or_else(|| StorageError::Unavailable("localStorage not available".to_string()))?;
        Ok(Self { storage })
    }
}

impl SnapshotStore for LocalStorageStore {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        self.storage
            .get_item(key)
            .map_err(|e| StorageError::Other(format!("Get error: {:?}", e)))
    }

    fn set(&mut self, key: &str, value: &str) -> StorageResult<()> {
        // Fails when the quota is exceeded.
        self.storage
            .set_item(key, value)
            .map_err(|e| StorageError::Other(format!("Set error: {:?}", e)))
    }

    fn remove(&mut self, key: &str) -> StorageResult<()> {
        self.storage
            .remove_item(key)
            .map_err(|e| StorageError::Other(format!("Remove error: {:?}", e)))
    }
}
