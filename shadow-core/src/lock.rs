/*!
Exclusive store lock.

Every load-modify-save cycle of the metadata document runs under a lock file
in the store root, so two processes cannot interleave and lose an update.
*/

use crate::{Result, ShadowError};
use backoff::{ExponentialBackoff, ExponentialBackoffBuilder};
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

/// Name of the lock file inside a store root.
pub const LOCK_FILE_NAME: &str = "lock";

/// Default time spent waiting for another process to release the lock.
pub const DEFAULT_LOCK_WAIT: Duration = Duration::from_secs(2);

/// Held store lock; released when dropped
#[derive(Debug)]
pub struct StoreLock {
    path: PathBuf,
}

impl StoreLock {
    /// Acquire the lock of `store_root`, waiting up to `wait` for a holder to
    /// release it
    ///
    /// The store root must exist.
    ///
    /// # Errors
    /// * `ShadowError::Locked` - If the lock is still held after `wait`
    /// * `ShadowError::Storage` - If the lock file cannot be created
    pub fn acquire(store_root: &Path, wait: Duration) -> Result<Self> {
        let path = store_root.join(LOCK_FILE_NAME);

        if wait.is_zero() {
            return Self::try_acquire(&path);
        }

        let result = backoff::retry(lock_backoff(wait), || {
            Self::try_acquire(&path).map_err(|e| match e {
                ShadowError::Locked { .. } => {
                    debug!("Store lock {} busy, retrying", path.display());
                    backoff::Error::transient(e)
                }
                other => backoff::Error::permanent(other),
            })
        });

        result.map_err(|e| match e {
            backoff::Error::Permanent(err) => err,
            backoff::Error::Transient { err, .. } => {
                warn!("Gave up waiting for store lock {}", path.display());
                err
            }
        })
    }

    fn try_acquire(path: &Path) -> Result<Self> {
        let mut file = match OpenOptions::new().write(true).create_new(true).open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(ShadowError::Locked {
                    path: path.to_path_buf(),
                })
            }
            Err(e) => {
                return Err(ShadowError::storage(format!(
                    "Failed to create lock file {}: {e}",
                    path.display()
                )))
            }
        };

        let lock = Self {
            path: path.to_path_buf(),
        };
        record_owner(&mut file, path);
        debug!("Acquired store lock {}", path.display());
        Ok(lock)
    }

    /// Path of the lock file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            warn!("Failed to release store lock {}: {}", self.path.display(), e);
        }
    }
}

/// Write the current pid into the lock file. Informational only.
fn record_owner<W: Write>(writer: &mut W, path: &Path) -> bool {
    match writeln!(writer, "{}", std::process::id()) {
        Ok(()) => true,
        Err(e) => {
            warn!("Failed to record owner pid in {}: {}", path.display(), e);
            false
        }
    }
}

fn lock_backoff(wait: Duration) -> ExponentialBackoff {
    ExponentialBackoffBuilder::new()
        .with_initial_interval(Duration::from_millis(20))
        .with_max_interval(Duration::from_millis(250))
        .with_max_elapsed_time(Some(wait))
        .build()
}
