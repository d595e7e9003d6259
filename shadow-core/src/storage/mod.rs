/*!
Storage adapters for snapshot blobs.

This module defines the blob storage abstraction (port) and its adapters. A
blob is the byte-for-byte content of a file at save time, named by the short
id of that content. Writing a blob is not atomic; a crash mid-copy can leave
a partial file behind.
*/

pub mod local;

use crate::Result;
use std::path::Path;

/// Storage abstraction for snapshot blobs
///
/// Implementations are scoped to a single store root.
pub trait SnapshotStorage {
    /// Create the blob directory if it is missing. Idempotent.
    fn ensure(&self) -> Result<()>;

    /// Store `content` as blob `id`, replacing any existing blob
    ///
    /// # Returns
    /// The number of bytes written
    fn write(&self, id: &str, content: &[u8]) -> Result<u64>;

    /// Overwrite `dest` with the content of blob `id`
    ///
    /// # Errors
    /// * `ShadowError::SnapshotMissing` - If the blob does not exist
    fn restore(&self, id: &str, dest: &Path) -> Result<u64>;

    /// Read the full content of blob `id`
    fn read(&self, id: &str) -> Result<Vec<u8>>;

    /// Check whether blob `id` exists
    fn exists(&self, id: &str) -> bool;

    /// Remove blob `id`. A blob that is already gone is not an error.
    fn delete(&self, id: &str) -> Result<()>;
}

pub use local::LocalSnapshotStorage;

/// Memory-based storage adapter for testing
///
/// This implementation keeps blobs in a HashMap so tests can remove or
/// corrupt them without touching the store directory.
#[cfg(test)]
pub struct MemoryStorage {
    data: std::sync::Arc<std::sync::Mutex<std::collections::HashMap<String, Vec<u8>>>>,
}

#[cfg(test)]
impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
impl MemoryStorage {
    pub fn new() -> Self {
        Self {
            data: std::sync::Arc::new(std::sync::Mutex::new(std::collections::HashMap::new())),
        }
    }

    /// Replace the content of a blob directly
    pub fn corrupt(&self, id: &str, data: &[u8]) {
        self.data.lock().unwrap().insert(id.to_string(), data.to_vec());
    }
}

#[cfg(test)]
impl SnapshotStorage for MemoryStorage {
    fn ensure(&self) -> Result<()> {
        Ok(())
    }

    fn write(&self, id: &str, content: &[u8]) -> Result<u64> {
        self.data.lock().unwrap().insert(id.to_string(), content.to_vec());
        Ok(content.len() as u64)
    }

    fn restore(&self, id: &str, dest: &Path) -> Result<u64> {
        let content = self.read(id)?;
        std::fs::write(dest, &content).map_err(|e| {
            crate::ShadowError::storage(format!("Failed to write {}: {e}", dest.display()))
        })?;
        Ok(content.len() as u64)
    }

    fn read(&self, id: &str) -> Result<Vec<u8>> {
        let storage = self.data.lock().unwrap();
        storage
            .get(id)
            .cloned()
            .ok_or_else(|| crate::ShadowError::SnapshotMissing {
                id: id.to_string(),
                path: std::path::PathBuf::from(id),
            })
    }

    fn exists(&self, id: &str) -> bool {
        self.data.lock().unwrap().contains_key(id)
    }

    fn delete(&self, id: &str) -> Result<()> {
        self.data.lock().unwrap().remove(id);
        Ok(())
    }
}
