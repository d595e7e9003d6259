/*!
Main snapshot engine that orchestrates the save, restore and delete workflows.

The engine composes the metadata document (`VersionStore`) and the blob
storage (`SnapshotStorage`) of one store. The two are committed separately:

- save writes the blob before the metadata document,
- delete commits the metadata document before removing the blob,

so an interrupted operation leaves at worst an orphan blob, never a version
whose blob is missing. Orphans are not collected.
*/

use crate::fingerprint;
use crate::lock::{StoreLock, DEFAULT_LOCK_WAIT};
use crate::metadata::{FileEntry, Version, VersionList, AUTO_SAVE_NOTES, AUTO_SAVE_TAG};
use crate::storage::{LocalSnapshotStorage, SnapshotStorage};
use crate::version_store::VersionStore;
use crate::{Result, ShadowError};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Options for a save
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SaveOptions {
    pub tags: Vec<String>,
    pub notes: String,
}

impl SaveOptions {
    pub fn new(tags: Vec<String>, notes: impl Into<String>) -> Self {
        Self {
            tags,
            notes: notes.into(),
        }
    }
}

/// Result of a restore
#[derive(Debug, Clone, PartialEq)]
pub struct RestoreOutcome {
    /// The version the file now holds
    pub restored: Version,
    /// The version created from the pre-restore content, if any
    pub auto_saved: Option<Version>,
}

/// Engine for the snapshot workflows of one store
///
/// Tracked paths passed to the engine must already be absolute and cleaned;
/// use [`crate::PathResolver::locate`] to obtain them.
///
/// # Example
/// ```rust,no_run
/// use shadow_core::{PathResolver, SaveOptions, ShadowConfig, ShadowEngine};
/// use std::path::Path;
///
/// let config = ShadowConfig::load()?;
/// let tracked = PathResolver::from_env()?.locate(Path::new("notes.txt"), &config.repo_path)?;
/// let engine = ShadowEngine::open(&tracked.store_root);
///
/// let version = engine.save(&tracked.path, SaveOptions::default())?;
/// // ... edit notes.txt ...
/// engine.restore(&tracked.path, &version.id, true)?;
/// # Ok::<(), shadow_core::ShadowError>(())
/// ```
pub struct ShadowEngine<S = LocalSnapshotStorage>
where
    S: SnapshotStorage,
{
    versions: VersionStore,
    snapshots: S,
    lock_wait: Duration,
}

impl ShadowEngine<LocalSnapshotStorage> {
    /// Open the store rooted at `store_root` with local blob storage
    ///
    /// Nothing is created on disk until the first save.
    pub fn open<P: AsRef<Path>>(store_root: P) -> Self {
        let root = store_root.as_ref();
        Self::with_storage(root, LocalSnapshotStorage::new(root))
    }
}

impl<S> ShadowEngine<S>
where
    S: SnapshotStorage,
{
    /// Create an engine over `store_root` with the given blob storage
    pub fn with_storage<P: Into<PathBuf>>(store_root: P, snapshots: S) -> Self {
        Self {
            versions: VersionStore::new(store_root),
            snapshots,
            lock_wait: DEFAULT_LOCK_WAIT,
        }
    }

    /// Set how long to wait for another process to release the store lock
    pub fn with_lock_wait(mut self, wait: Duration) -> Self {
        self.lock_wait = wait;
        self
    }

    /// The store root
    pub fn store_root(&self) -> &Path {
        self.versions.root()
    }

    /// The blob storage
    pub fn storage(&self) -> &S {
        &self.snapshots
    }

    /// Save the current content of `path` as a new version
    ///
    /// This method:
    /// 1. Reads the file once and derives its id, hash and size from those bytes
    /// 2. Creates the store and writes the same bytes as the blob
    /// 3. Loads the metadata document, records the version, saves it
    ///
    /// A failure at step 3 leaves the blob behind without a version.
    ///
    /// # Errors
    /// * `ShadowError::SourceNotFound` - If `path` does not exist
    /// * `ShadowError::Locked` - If another process holds the store
    /// * `ShadowError::Json` - If the metadata document is malformed
    /// * `ShadowError::Storage` - If any filesystem step fails
    pub fn save(&self, path: &Path, options: SaveOptions) -> Result<Version> {
        let content = read_source(path)?;
        self.prepare_store()?;
        let _lock = StoreLock::acquire(self.store_root(), self.lock_wait)?;
        self.commit_save(path, &content, options)
    }

    fn commit_save(&self, path: &Path, content: &[u8], options: SaveOptions) -> Result<Version> {
        let id = fingerprint::short_id(content);
        let hash = fingerprint::hash_bytes(content);
        let size = content.len() as u64;
        debug!("Saving {} as {} ({} bytes)", path.display(), id, size);

        self.snapshots.ensure()?;
        self.snapshots.write(&id, content)?;

        let version = Version::new(id, size, hash)
            .with_tags(options.tags)
            .with_notes(options.notes);

        let mut list = self.versions.load()?;
        list.add_version(&path_key(path), version.clone());
        self.versions.save(&list)?;

        info!("Saved version {} of {}", version.id, path.display());
        Ok(version)
    }

    /// Restore `path` to version `id`
    ///
    /// With `auto_save`, the current content (when the file exists) is first
    /// saved as an `auto-save` version; that version is fully persisted
    /// before the file is overwritten.
    ///
    /// # Errors
    /// * `ShadowError::FileNotTracked` / `ShadowError::VersionNotFound` - If
    ///   the version is not recorded
    /// * `ShadowError::SnapshotMissing` - If the version's blob is gone
    pub fn restore(&self, path: &Path, id: &str, auto_save: bool) -> Result<RestoreOutcome> {
        let key = path_key(path);
        self.require_store(&key)?;
        let _lock = StoreLock::acquire(self.store_root(), self.lock_wait)?;

        let list = self.versions.load()?;
        let restored = lookup(&list, &key, id)?.clone();

        let auto_saved = if auto_save && path.exists() {
            let options = SaveOptions::new(vec![AUTO_SAVE_TAG.to_string()], AUTO_SAVE_NOTES);
            let content = read_source(path)?;
            let version = self.commit_save(path, &content, options)?;
            info!("Saved current state of {} as {}", path.display(), version.id);
            Some(version)
        } else {
            None
        };

        self.snapshots.restore(id, path)?;
        info!("Restored {} to version {}", path.display(), id);

        Ok(RestoreOutcome {
            restored,
            auto_saved,
        })
    }

    /// Delete version `id` of `path`
    ///
    /// The metadata document is saved before the blob is removed. The blob is
    /// kept while any other version in the store still refers to it.
    ///
    /// # Returns
    /// The removed version
    pub fn delete(&self, path: &Path, id: &str) -> Result<Version> {
        let key = path_key(path);
        self.require_store(&key)?;
        let _lock = StoreLock::acquire(self.store_root(), self.lock_wait)?;

        let mut list = self.versions.load()?;
        let removed = lookup(&list, &key, id)?.clone();

        if !list.remove_version(&key, id) {
            return Err(ShadowError::inconsistent(format!(
                "version {id} of {key} was found but could not be removed"
            )));
        }
        self.versions.save(&list)?;

        if list.references(id) {
            warn!("Snapshot {} is still referenced, keeping the blob", id);
        } else {
            self.snapshots.delete(id)?;
        }

        info!("Deleted version {} of {}", id, key);
        Ok(removed)
    }

    /// Load the metadata document of the store
    pub fn list(&self) -> Result<VersionList> {
        self.versions.load()
    }

    /// Version history of `path`, newest first
    pub fn history(&self, path: &Path) -> Result<FileEntry> {
        let key = path_key(path);
        let list = self.versions.load()?;
        list.find(&key)
            .cloned()
            .ok_or(ShadowError::FileNotTracked { path: key })
    }

    /// Look up version `id` of `path`
    pub fn version(&self, path: &Path, id: &str) -> Result<Version> {
        let key = path_key(path);
        let list = self.versions.load()?;
        lookup(&list, &key, id).cloned()
    }

    /// Check that the blob of version `id` still holds the recorded content
    ///
    /// # Errors
    /// * `ShadowError::SnapshotMissing` - If the blob is gone
    /// * `ShadowError::IntegrityCheckFailed` - If the blob hash differs, for
    ///   example after a short id collision overwrote it
    pub fn verify(&self, path: &Path, id: &str) -> Result<Version> {
        let version = self.version(path, id)?;
        let content = self.snapshots.read(id)?;
        let actual = fingerprint::hash_bytes(&content);
        if actual != version.hash {
            return Err(ShadowError::IntegrityCheckFailed {
                expected: version.hash,
                actual,
            });
        }
        debug!("Snapshot {} verified", id);
        Ok(version)
    }

    fn prepare_store(&self) -> Result<()> {
        fs::create_dir_all(self.store_root()).map_err(|e| {
            ShadowError::storage(format!(
                "Failed to create directory {}: {e}",
                self.store_root().display()
            ))
        })?;
        self.snapshots.ensure()
    }

    /// Fail early for stores that were never created, without creating them.
    fn require_store(&self, key: &str) -> Result<()> {
        if self.store_root().is_dir() {
            Ok(())
        } else {
            Err(ShadowError::FileNotTracked {
                path: key.to_string(),
            })
        }
    }
}

fn read_source(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => ShadowError::SourceNotFound {
            path: path.to_path_buf(),
        },
        _ => ShadowError::storage(format!("Failed to read {}: {e}", path.display())),
    })
}

fn path_key(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

fn lookup<'a>(list: &'a VersionList, key: &str, id: &str) -> Result<&'a Version> {
    let entry = list.find(key).ok_or_else(|| ShadowError::FileNotTracked {
        path: key.to_string(),
    })?;
    entry.version(id).ok_or_else(|| ShadowError::VersionNotFound {
        path: key.to_string(),
        id: id.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use tempfile::TempDir;

    fn memory_engine(temp_dir: &TempDir) -> ShadowEngine<MemoryStorage> {
        ShadowEngine::with_storage(temp_dir.path().join(".shadow"), MemoryStorage::new())
            .with_lock_wait(Duration::ZERO)
    }

    #[test]
    fn test_save_records_version() {
        let temp_dir = TempDir::new().unwrap();
        let engine = memory_engine(&temp_dir);
        let file = temp_dir.path().join("a.txt");
        fs::write(&file, b"hello").unwrap();

        let version = engine
            .save(&file, SaveOptions::new(vec!["x".to_string()], "n"))
            .unwrap();

        assert_eq!(version.id, "2cf24dba");
        assert_eq!(version.size, 5);
        assert_eq!(version.tags, vec!["x"]);
        assert_eq!(version.notes, "n");
        assert!(engine.storage().exists("2cf24dba"));
        assert_eq!(engine.history(&file).unwrap().versions[0], version);
    }

    #[test]
    fn test_save_missing_source() {
        let temp_dir = TempDir::new().unwrap();
        let engine = memory_engine(&temp_dir);

        let err = engine
            .save(&temp_dir.path().join("nope.txt"), SaveOptions::default())
            .unwrap_err();
        assert!(matches!(err, ShadowError::SourceNotFound { .. }));
        assert!(!engine.store_root().exists());
    }

    #[test]
    fn test_restore_missing_blob() {
        let temp_dir = TempDir::new().unwrap();
        let engine = memory_engine(&temp_dir);
        let file = temp_dir.path().join("a.txt");
        fs::write(&file, b"v1").unwrap();
        let version = engine.save(&file, SaveOptions::default()).unwrap();

        engine.storage().delete(&version.id).unwrap();
        fs::write(&file, b"v2").unwrap();

        let err = engine.restore(&file, &version.id, false).unwrap_err();
        assert!(matches!(err, ShadowError::SnapshotMissing { .. }));
        assert_eq!(fs::read(&file).unwrap(), b"v2");
    }

    #[test]
    fn test_verify_detects_corruption() {
        let temp_dir = TempDir::new().unwrap();
        let engine = memory_engine(&temp_dir);
        let file = temp_dir.path().join("a.txt");
        fs::write(&file, b"v1").unwrap();
        let version = engine.save(&file, SaveOptions::default()).unwrap();

        assert!(engine.verify(&file, &version.id).is_ok());

        engine.storage().corrupt(&version.id, b"tampered");
        assert!(matches!(
            engine.verify(&file, &version.id),
            Err(ShadowError::IntegrityCheckFailed { .. })
        ));
    }

    #[test]
    fn test_restore_untracked_store_creates_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let engine = ShadowEngine::open(temp_dir.path().join(".shadow"));
        let file = temp_dir.path().join("a.txt");

        let err = engine.restore(&file, "2cf24dba", true).unwrap_err();
        assert!(matches!(err, ShadowError::FileNotTracked { .. }));
        let err = engine.delete(&file, "2cf24dba").unwrap_err();
        assert!(matches!(err, ShadowError::FileNotTracked { .. }));
        assert!(!temp_dir.path().join(".shadow").exists());
    }

    #[test]
    fn test_save_derives_everything_from_one_read() {
        let temp_dir = TempDir::new().unwrap();
        let engine = memory_engine(&temp_dir).with_lock_wait(Duration::from_secs(5));
        let file = temp_dir.path().join("a.txt");
        fs::write(&file, b"before").unwrap();
        fs::create_dir_all(engine.store_root()).unwrap();

        let held = StoreLock::acquire(engine.store_root(), Duration::ZERO).unwrap();
        let version = std::thread::scope(|scope| {
            let saver = scope.spawn(|| engine.save(&file, SaveOptions::default()));
            // The save has read the file and is now waiting for the lock.
            std::thread::sleep(Duration::from_millis(200));
            fs::write(&file, b"after, and longer").unwrap();
            drop(held);
            saver.join().unwrap()
        })
        .unwrap();

        let blob = engine.storage().read(&version.id).unwrap();
        assert_eq!(version.id, fingerprint::short_id(&blob));
        assert_eq!(version.hash, fingerprint::hash_bytes(&blob));
        assert_eq!(version.size, blob.len() as u64);
        assert!(engine.verify(&file, &version.id).is_ok());
    }

    #[test]
    fn test_locked_store_rejects_save() {
        let temp_dir = TempDir::new().unwrap();
        let engine = memory_engine(&temp_dir);
        let file = temp_dir.path().join("a.txt");
        fs::write(&file, b"v1").unwrap();
        fs::create_dir_all(engine.store_root()).unwrap();

        let _held = StoreLock::acquire(engine.store_root(), Duration::ZERO).unwrap();
        let err = engine.save(&file, SaveOptions::default()).unwrap_err();
        assert!(matches!(err, ShadowError::Locked { .. }));
        assert!(engine.list().unwrap().is_empty());
    }
}
