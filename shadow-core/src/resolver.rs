/*!
Locating the store of a tracked file.

A store lives in a `.shadow` directory. By default it sits next to the
tracked file; the `repo_path` option moves it elsewhere.
*/

use crate::config::DEFAULT_REPO_PATH;
use crate::{Result, ShadowError};
use std::path::{Component, Path, PathBuf};

/// Name of the store directory.
pub const STORE_DIR_NAME: &str = ".shadow";

/// A tracked file together with the root of its store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedFile {
    /// Absolute, lexically cleaned path of the file
    pub path: PathBuf,
    /// The `.shadow` directory holding its versions
    pub store_root: PathBuf,
}

impl TrackedFile {
    /// The key used for this file in the metadata document
    pub fn key(&self) -> String {
        self.path.to_string_lossy().into_owned()
    }
}

/// Resolves file paths to store locations
///
/// The working directory and home directory are explicit inputs so that
/// resolution does not depend on process state.
#[derive(Debug, Clone)]
pub struct PathResolver {
    cwd: PathBuf,
    home: Option<PathBuf>,
}

impl PathResolver {
    /// Create a resolver with an explicit working directory and home directory
    pub fn new<P: Into<PathBuf>>(cwd: P, home: Option<PathBuf>) -> Self {
        Self {
            cwd: cwd.into(),
            home,
        }
    }

    /// Create a resolver from the current process state
    ///
    /// # Errors
    /// * `ShadowError::Storage` - If the working directory cannot be determined
    pub fn from_env() -> Result<Self> {
        let cwd = std::env::current_dir().map_err(|e| {
            ShadowError::storage(format!("Failed to determine working directory: {e}"))
        })?;
        Ok(Self::new(cwd, dirs::home_dir()))
    }

    /// The working directory relative paths are resolved against
    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    /// Absolute, lexically cleaned form of `path`
    pub fn absolute(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            clean(path)
        } else {
            clean(&self.cwd.join(path))
        }
    }

    /// Resolve the store root for `target`
    ///
    /// 1. `target` is made absolute.
    /// 2. The base directory is `target` itself when it is a directory,
    ///    otherwise its parent.
    /// 3. `repo_path` is expanded: `~/x` under the home directory, absolute
    ///    values verbatim, `./` (or empty) as the base itself, anything else
    ///    relative to the base.
    /// 4. `.shadow` is appended.
    ///
    /// # Errors
    /// * `ShadowError::Config` - If `repo_path` starts with `~/` and no home
    ///   directory is known
    pub fn store_root(&self, target: &Path, repo_path: &str) -> Result<PathBuf> {
        let absolute = self.absolute(target);

        // A target that does not exist is treated as a file.
        let base = if absolute.is_dir() {
            absolute
        } else {
            absolute
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or(absolute)
        };

        let repo_path = if repo_path.is_empty() {
            DEFAULT_REPO_PATH
        } else {
            repo_path
        };

        let expanded = match repo_path.strip_prefix("~/") {
            Some(rest) => {
                let home = self.home.as_ref().ok_or_else(|| {
                    ShadowError::config(format!(
                        "cannot expand {repo_path}: home directory is unknown"
                    ))
                })?;
                home.join(rest)
            }
            None => PathBuf::from(repo_path),
        };

        let shadow_base = if expanded.is_absolute() {
            expanded
        } else if repo_path == DEFAULT_REPO_PATH {
            base
        } else {
            base.join(expanded)
        };

        Ok(clean(&shadow_base.join(STORE_DIR_NAME)))
    }

    /// Resolve both the absolute path of `target` and its store root
    pub fn locate(&self, target: &Path, repo_path: &str) -> Result<TrackedFile> {
        Ok(TrackedFile {
            path: self.absolute(target),
            store_root: self.store_root(target, repo_path)?,
        })
    }
}

/// Lexically clean a path: drop `.` components and fold `..` into the parent
///
/// `..` never climbs above the root of an absolute path.
pub fn clean(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(".."),
            },
            other => out.push(other.as_os_str()),
        }
    }
    if out.as_os_str().is_empty() {
        out.push(".");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn resolver() -> PathResolver {
        PathResolver::new("/work", Some(PathBuf::from("/h")))
    }

    #[test]
    fn test_colocated_store() {
        let root = resolver()
            .store_root(Path::new("/a/b/c.txt"), "./")
            .unwrap();
        assert_eq!(root, PathBuf::from("/a/b/.shadow"));
    }

    #[test]
    fn test_home_store() {
        let root = resolver()
            .store_root(Path::new("/a/b/c.txt"), "~/.x")
            .unwrap();
        assert_eq!(root, PathBuf::from("/h/.x/.shadow"));
    }

    #[test]
    fn test_relative_store() {
        let root = resolver()
            .store_root(Path::new("/a/b/c.txt"), "../cache")
            .unwrap();
        assert_eq!(root, PathBuf::from("/a/cache/.shadow"));
    }

    #[test]
    fn test_absolute_store() {
        let root = resolver()
            .store_root(Path::new("/a/b/c.txt"), "/var/store")
            .unwrap();
        assert_eq!(root, PathBuf::from("/var/store/.shadow"));
    }

    #[test]
    fn test_empty_repo_path_is_colocated() {
        let root = resolver().store_root(Path::new("/a/b/c.txt"), "").unwrap();
        assert_eq!(root, PathBuf::from("/a/b/.shadow"));
    }

    #[test]
    fn test_relative_target_uses_cwd() {
        let root = resolver()
            .store_root(Path::new("docs/./notes.md"), "./")
            .unwrap();
        assert_eq!(root, PathBuf::from("/work/docs/.shadow"));

        let tracked = resolver().locate(Path::new("../x.txt"), "./").unwrap();
        assert_eq!(tracked.path, PathBuf::from("/x.txt"));
        assert_eq!(tracked.key(), "/x.txt");
    }

    #[test]
    fn test_home_expansion_without_home() {
        let resolver = PathResolver::new("/work", None);
        let result = resolver.store_root(Path::new("/a/b/c.txt"), "~/.x");
        assert!(matches!(result, Err(ShadowError::Config(_))));

        // No expansion needed, no home needed.
        assert!(resolver.store_root(Path::new("/a/b/c.txt"), "./").is_ok());
    }

    #[test]
    fn test_directory_target_is_its_own_base() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().join("subdir");
        fs::create_dir_all(&dir).unwrap();

        let root = resolver().store_root(&dir, "./").unwrap();
        assert_eq!(root, clean(&dir.join(".shadow")));
    }

    #[test]
    fn test_existing_file_uses_parent() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("project").join("test.txt");
        fs::create_dir_all(file.parent().unwrap()).unwrap();
        fs::write(&file, b"test").unwrap();

        let root = resolver().store_root(&file, "../cache").unwrap();
        assert_eq!(root, clean(&temp_dir.path().join("cache").join(".shadow")));
    }

    #[test]
    fn test_clean() {
        assert_eq!(clean(Path::new("/a/./b/../c")), PathBuf::from("/a/c"));
        assert_eq!(clean(Path::new("/../a")), PathBuf::from("/a"));
        assert_eq!(clean(Path::new("a/../../b")), PathBuf::from("../b"));
        assert_eq!(clean(Path::new("./")), PathBuf::from("."));
        assert_eq!(clean(Path::new("/a/b/")), PathBuf::from("/a/b"));
    }
}
