/*!
Version metadata and the in-memory form of the metadata document.
*/

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::VecDeque;

/// Tag attached to versions created automatically before a restore.
pub const AUTO_SAVE_TAG: &str = "auto-save";

/// Notes attached to versions created automatically before a restore.
pub const AUTO_SAVE_NOTES: &str = "Saved before restore";

/// One saved state of a tracked file
///
/// A version is created once at save time and never mutated afterwards.
/// Its `id` names the snapshot blob holding the content.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Version {
    /// Short content id (8 hex chars), also the blob file name
    pub id: String,

    /// When the version was saved
    pub created_at: DateTime<Utc>,

    /// User supplied labels, in the order given
    #[serde(default, deserialize_with = "null_as_empty")]
    pub tags: Vec<String>,

    /// Free text notes
    #[serde(default)]
    pub notes: String,

    /// Content size in bytes
    pub size: u64,

    /// Full SHA-256 hex digest of the content
    pub hash: String,
}

impl Version {
    /// Create a version stamped with the current time
    ///
    /// # Example
    /// ```rust
    /// use shadow_core::Version;
    ///
    /// let hash = "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824";
    /// let version = Version::new("2cf24dba", 5, hash)
    ///     .with_tags(vec!["draft".to_string()])
    ///     .with_notes("first pass");
    /// assert_eq!(version.size, 5);
    /// assert_eq!(version.tags, vec!["draft"]);
    /// ```
    pub fn new<S1, S2>(id: S1, size: u64, hash: S2) -> Self
    where
        S1: Into<String>,
        S2: Into<String>,
    {
        Self {
            id: id.into(),
            created_at: Utc::now(),
            tags: Vec::new(),
            notes: String::new(),
            size,
            hash: hash.into(),
        }
    }

    /// Set the tags
    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    /// Set the notes
    pub fn with_notes<S: Into<String>>(mut self, notes: S) -> Self {
        self.notes = notes.into();
        self
    }

    /// Whether this version was written by the pre-restore auto-save.
    pub fn is_auto_save(&self) -> bool {
        self.tags.iter().any(|tag| tag == AUTO_SAVE_TAG)
    }
}

/// Version history of one tracked file, newest first
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct FileEntry {
    /// Canonical absolute path of the tracked file
    pub path: String,

    /// Versions in reverse insertion order
    pub versions: VecDeque<Version>,
}

impl FileEntry {
    fn new(path: String, version: Version) -> Self {
        Self {
            path,
            versions: VecDeque::from([version]),
        }
    }

    /// Find a version by exact id match. The newest match wins.
    pub fn version(&self, id: &str) -> Option<&Version> {
        self.versions.iter().find(|v| v.id == id)
    }

    /// The most recently saved version
    pub fn latest(&self) -> Option<&Version> {
        self.versions.front()
    }

    /// Sum of the recorded sizes of every version
    pub fn total_size(&self) -> u64 {
        self.versions.iter().map(|v| v.size).sum()
    }
}

/// The metadata document of a store
///
/// Entries are unique by path and kept in insertion order. Lookups scan
/// linearly; stores hold a handful of files.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct VersionList {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub files: Vec<FileEntry>,
}

impl VersionList {
    /// Create an empty list
    pub fn new() -> Self {
        Self::default()
    }

    /// Find the entry for `path`. Exact string match, no normalization.
    pub fn find(&self, path: &str) -> Option<&FileEntry> {
        self.files.iter().find(|entry| entry.path == path)
    }

    /// Record `version` as the newest version of `path`
    ///
    /// Appends a new entry when `path` is not tracked yet. An existing version
    /// with the same id is left in place; duplicates are allowed.
    pub fn add_version(&mut self, path: &str, version: Version) {
        match self.files.iter_mut().find(|entry| entry.path == path) {
            Some(entry) => entry.versions.push_front(version),
            None => self.files.push(FileEntry::new(path.to_string(), version)),
        }
    }

    /// Remove the first version of `path` whose id is `id`
    ///
    /// The entry itself is dropped once its last version is gone.
    /// Returns false, leaving the list untouched, when nothing matched.
    pub fn remove_version(&mut self, path: &str, id: &str) -> bool {
        let Some(entry_index) = self.files.iter().position(|entry| entry.path == path) else {
            return false;
        };

        let entry = &mut self.files[entry_index];
        let Some(version_index) = entry.versions.iter().position(|v| v.id == id) else {
            return false;
        };

        entry.versions.remove(version_index);
        if entry.versions.is_empty() {
            self.files.remove(entry_index);
        }
        true
    }

    /// Whether any version of any file still points at blob `id`.
    pub fn references(&self, id: &str) -> bool {
        self.files
            .iter()
            .any(|entry| entry.versions.iter().any(|v| v.id == id))
    }

    /// True when no file is tracked.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

fn null_as_empty<'de, D, T>(deserializer: D) -> std::result::Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn version(id: &str) -> Version {
        Version::new(id, 3, "a".repeat(64))
    }

    #[test]
    fn test_version_creation() {
        let v = Version::new("2cf24dba", 5, "abc")
            .with_tags(vec!["one".to_string(), "two".to_string()])
            .with_notes("note");
        assert_eq!(v.id, "2cf24dba");
        assert_eq!(v.size, 5);
        assert_eq!(v.tags, vec!["one", "two"]);
        assert_eq!(v.notes, "note");
        assert!(!v.is_auto_save());
    }

    #[test]
    fn test_auto_save_detection() {
        let v = version("00000001").with_tags(vec![AUTO_SAVE_TAG.to_string()]);
        assert!(v.is_auto_save());
    }

    #[test]
    fn test_add_version_new_file_appends_entry() {
        let mut list = VersionList::new();
        list.add_version("/a.txt", version("00000001"));
        list.add_version("/b.txt", version("00000002"));

        assert_eq!(list.files.len(), 2);
        assert_eq!(list.files[0].path, "/a.txt");
        assert_eq!(list.files[1].path, "/b.txt");
    }

    #[test]
    fn test_add_version_existing_file_goes_to_front() {
        let mut list = VersionList::new();
        list.add_version("/a.txt", version("00000001"));
        list.add_version("/a.txt", version("00000002"));

        let entry = list.find("/a.txt").unwrap();
        assert_eq!(entry.versions.len(), 2);
        assert_eq!(entry.versions[0].id, "00000002");
        assert_eq!(entry.latest().unwrap().id, "00000002");
        assert_eq!(list.files.len(), 1);
    }

    #[test]
    fn test_remove_version() {
        let mut list = VersionList::new();
        list.add_version("/a.txt", version("00000001"));
        list.add_version("/a.txt", version("00000002"));

        assert!(list.remove_version("/a.txt", "00000001"));
        let entry = list.find("/a.txt").unwrap();
        assert_eq!(entry.versions.len(), 1);
        assert_eq!(entry.versions[0].id, "00000002");
    }

    #[test]
    fn test_remove_last_version_drops_entry() {
        let mut list = VersionList::new();
        list.add_version("/a.txt", version("00000001"));

        assert!(list.remove_version("/a.txt", "00000001"));
        assert!(list.find("/a.txt").is_none());
        assert!(list.is_empty());
    }

    #[test]
    fn test_remove_version_not_found_leaves_list_untouched() {
        let mut list = VersionList::new();
        list.add_version("/a.txt", version("00000001"));
        let before = list.clone();

        assert!(!list.remove_version("/a.txt", "ffffffff"));
        assert!(!list.remove_version("/missing.txt", "00000001"));
        assert_eq!(list, before);
    }

    #[test]
    fn test_references() {
        let mut list = VersionList::new();
        list.add_version("/a.txt", version("00000001"));
        list.add_version("/b.txt", version("00000002"));

        assert!(list.references("00000001"));
        assert!(list.references("00000002"));
        assert!(!list.references("00000003"));
    }

    #[test]
    fn test_total_size() {
        let mut list = VersionList::new();
        list.add_version("/a.txt", Version::new("00000001", 10, "h"));
        list.add_version("/a.txt", Version::new("00000002", 32, "h"));
        assert_eq!(list.find("/a.txt").unwrap().total_size(), 42);
    }
}
