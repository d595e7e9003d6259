/*!
# Shadow Core Engine

Per-file snapshot store: save a copy of a file with tags and notes, list
its earlier versions, restore it to one of them, or delete one.

## Layout

Each store is a `.shadow` directory:

```text
.shadow/
  list.json          # metadata document: tracked files and their versions
  lock               # present while an operation runs
  snapshots/<id>     # one blob per version, named by its short content id
```

Where the `.shadow` directory lives is decided by [`PathResolver`] from the
`repo_path` option of [`ShadowConfig`].

## Usage

```rust,no_run
use shadow_core::{PathResolver, SaveOptions, ShadowConfig, ShadowEngine};
use std::path::Path;

let config = ShadowConfig::load()?;
let tracked = PathResolver::from_env()?.locate(Path::new("notes.txt"), &config.repo_path)?;
let engine = ShadowEngine::open(&tracked.store_root);

// Save a version
let version = engine.save(&tracked.path, SaveOptions::new(vec!["draft".into()], ""))?;

// Restore it later, keeping the current content as an auto-save
engine.restore(&tracked.path, &version.id, true)?;
# Ok::<(), shadow_core::ShadowError>(())
```
*/

pub mod config;
pub mod error;
pub mod fingerprint;
pub mod lock;
pub mod metadata;
pub mod observability;
pub mod resolver;
pub mod snapshot;
pub mod storage;
pub mod version_store;

#[cfg(test)]
mod metadata_tests;

pub use config::ShadowConfig;
pub use error::{Result, ShadowError};
pub use metadata::{FileEntry, Version, VersionList};
pub use resolver::{PathResolver, TrackedFile};
pub use snapshot::{RestoreOutcome, SaveOptions, ShadowEngine};
pub use storage::{LocalSnapshotStorage, SnapshotStorage};
pub use version_store::VersionStore;
