/*!
Persistence of the metadata document.

The document is `<store_root>/list.json`. Saves go through a temporary file
in the store root that is renamed over the document, so readers always see
either the previous or the new complete document.
*/

use crate::metadata::VersionList;
use crate::{Result, ShadowError};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

/// File name of the metadata document inside a store root.
pub const LIST_FILE_NAME: &str = "list.json";

/// Unix mode of the metadata document.
#[cfg(unix)]
pub const LIST_FILE_MODE: u32 = 0o644;

/// Loads and saves the metadata document of one store
#[derive(Debug, Clone)]
pub struct VersionStore {
    root: PathBuf,
}

impl VersionStore {
    /// Create a version store for the store rooted at `root`
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    /// The store root
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the metadata document
    pub fn list_path(&self) -> PathBuf {
        self.root.join(LIST_FILE_NAME)
    }

    /// Load the metadata document
    ///
    /// A store that was never saved to yields an empty list.
    ///
    /// # Errors
    /// * `ShadowError::Json` - If the document exists but cannot be decoded
    /// * `ShadowError::Storage` - If the document cannot be read
    pub fn load(&self) -> Result<VersionList> {
        let path = self.list_path();
        let data = match fs::read(&path) {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No metadata document at {}", path.display());
                return Ok(VersionList::new());
            }
            Err(e) => {
                return Err(ShadowError::storage(format!(
                    "Failed to read {}: {e}",
                    path.display()
                )))
            }
        };

        let list: VersionList = serde_json::from_slice(&data)?;
        debug!(
            "Loaded {} tracked file(s) from {}",
            list.files.len(),
            path.display()
        );
        Ok(list)
    }

    /// Save the metadata document atomically
    ///
    /// The output is pretty-printed with a stable field order.
    pub fn save(&self, list: &VersionList) -> Result<()> {
        let path = self.list_path();
        let mut data = serde_json::to_vec_pretty(list)?;
        data.push(b'\n');

        fs::create_dir_all(&self.root).map_err(|e| {
            ShadowError::storage(format!(
                "Failed to create directory {}: {e}",
                self.root.display()
            ))
        })?;

        let mut tmp = NamedTempFile::new_in(&self.root).map_err(|e| {
            ShadowError::storage(format!(
                "Failed to create temporary file in {}: {e}",
                self.root.display()
            ))
        })?;
        tmp.write_all(&data)
            .and_then(|()| tmp.as_file().sync_all())
            .map_err(|e| {
                ShadowError::storage(format!("Failed to write {}: {e}", tmp.path().display()))
            })?;
        set_document_permissions(&tmp)?;
        tmp.persist(&path).map_err(|e| {
            ShadowError::storage(format!("Failed to replace {}: {}", path.display(), e.error))
        })?;

        debug!("Saved metadata document {}", path.display());
        Ok(())
    }
}

// Temporary files are created owner-only; the document itself is not private.
#[cfg(unix)]
fn set_document_permissions(tmp: &NamedTempFile) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    tmp.as_file()
        .set_permissions(fs::Permissions::from_mode(LIST_FILE_MODE))
        .map_err(|e| {
            ShadowError::storage(format!(
                "Failed to set permissions on {}: {e}",
                tmp.path().display()
            ))
        })
}

#[cfg(not(unix))]
fn set_document_permissions(_tmp: &NamedTempFile) -> Result<()> {
    Ok(())
}
