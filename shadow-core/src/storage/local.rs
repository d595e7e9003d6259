/*!
Local filesystem blob storage.
*/

use super::SnapshotStorage;
use crate::fingerprint::is_short_id;
use crate::{Result, ShadowError};
use std::fs::{self, File};
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Name of the blob directory inside a store root.
pub const SNAPSHOTS_DIR_NAME: &str = "snapshots";

/// Local filesystem storage for snapshot blobs
///
/// Blobs live in `<store_root>/snapshots/<id>`. Parent directories are
/// created on demand.
///
/// # Example
/// ```rust,no_run
/// use shadow_core::storage::{LocalSnapshotStorage, SnapshotStorage};
///
/// let storage = LocalSnapshotStorage::new("/project/.shadow");
/// storage.ensure()?;
/// storage.write("2cf24dba", b"hello")?;
/// # Ok::<(), shadow_core::ShadowError>(())
/// ```
#[derive(Debug, Clone)]
pub struct LocalSnapshotStorage {
    snapshots_dir: PathBuf,
}

impl LocalSnapshotStorage {
    /// Create a storage adapter for the store rooted at `store_root`
    pub fn new<P: AsRef<Path>>(store_root: P) -> Self {
        Self {
            snapshots_dir: store_root.as_ref().join(SNAPSHOTS_DIR_NAME),
        }
    }

    /// Directory holding the blobs
    pub fn snapshots_dir(&self) -> &Path {
        &self.snapshots_dir
    }

    /// Path of blob `id`
    ///
    /// Ids that are not short ids are refused so a crafted id cannot point
    /// outside the blob directory.
    pub fn blob_path(&self, id: &str) -> Result<PathBuf> {
        if !is_short_id(id) {
            return Err(ShadowError::validation(format!(
                "invalid version id {id:?}: expected 8 lowercase hex characters"
            )));
        }
        Ok(self.snapshots_dir.join(id))
    }
}

/// Copy the bytes of `src` onto `dst`, truncating `dst` and keeping its
/// permissions when it already exists
fn copy_contents(src: &Path, dst: &Path) -> io::Result<u64> {
    let mut reader = File::open(src)?;
    if let Some(parent) = dst.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut writer = File::create(dst)?;
    let copied = io::copy(&mut reader, &mut writer)?;
    writer.sync_all()?;
    Ok(copied)
}

fn write_contents(dst: &Path, content: &[u8]) -> io::Result<()> {
    if let Some(parent) = dst.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut writer = File::create(dst)?;
    writer.write_all(content)?;
    writer.sync_all()
}

impl SnapshotStorage for LocalSnapshotStorage {
    fn ensure(&self) -> Result<()> {
        fs::create_dir_all(&self.snapshots_dir).map_err(|e| {
            ShadowError::storage(format!(
                "Failed to create directory {}: {e}",
                self.snapshots_dir.display()
            ))
        })
    }

    fn write(&self, id: &str, content: &[u8]) -> Result<u64> {
        let blob = self.blob_path(id)?;
        write_contents(&blob, content).map_err(|e| {
            ShadowError::storage(format!("Failed to write snapshot {}: {e}", blob.display()))
        })?;
        debug!("Wrote snapshot {} ({} bytes)", id, content.len());
        Ok(content.len() as u64)
    }

    fn restore(&self, id: &str, dest: &Path) -> Result<u64> {
        let blob = self.blob_path(id)?;
        if !blob.is_file() {
            return Err(ShadowError::SnapshotMissing {
                id: id.to_string(),
                path: blob,
            });
        }

        let copied = copy_contents(&blob, dest).map_err(|e| {
            ShadowError::storage(format!(
                "Failed to restore snapshot {} to {}: {e}",
                blob.display(),
                dest.display()
            ))
        })?;
        debug!("Restored snapshot {} onto {}", id, dest.display());
        Ok(copied)
    }

    fn read(&self, id: &str) -> Result<Vec<u8>> {
        let blob = self.blob_path(id)?;
        fs::read(&blob).map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                ShadowError::SnapshotMissing {
                    id: id.to_string(),
                    path: blob.clone(),
                }
            } else {
                ShadowError::storage(format!(
                    "Failed to read snapshot {}: {e}",
                    blob.display()
                ))
            }
        })
    }

    fn exists(&self, id: &str) -> bool {
        self.blob_path(id).map(|p| p.is_file()).unwrap_or(false)
    }

    fn delete(&self, id: &str) -> Result<()> {
        let blob = self.blob_path(id)?;
        match fs::remove_file(&blob) {
            Ok(()) => {
                debug!("Deleted snapshot {}", id);
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ShadowError::storage(format!(
                "Failed to delete snapshot {}: {e}",
                blob.display()
            ))),
        }
    }
}
