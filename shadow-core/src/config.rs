//! Configuration for locating shadow stores
//!
//! The only recognised option is `repo_path`, read from a YAML file at
//! `~/.config/shadow/config.yml` (or `~/.config/sh_adow/config.yml` when
//! only that one exists):
//!
//! ```yaml
//! repo_path: ~/.shadow_backups
//! ```

use crate::{Result, ShadowError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Repo path meaning "next to the tracked file".
pub const DEFAULT_REPO_PATH: &str = "./";

/// Config directory name under `~/.config`.
pub const CONFIG_DIR_NAME: &str = "shadow";

/// Config directory name used by earlier `sh_adow` releases.
pub const LEGACY_CONFIG_DIR_NAME: &str = "sh_adow";

const CONFIG_FILE_NAME: &str = "config.yml";

/// User configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShadowConfig {
    /// Where stores live, relative to the tracked file's directory unless
    /// absolute or `~/`-prefixed
    #[serde(default = "default_repo_path")]
    pub repo_path: String,
}

fn default_repo_path() -> String {
    DEFAULT_REPO_PATH.to_string()
}

impl Default for ShadowConfig {
    fn default() -> Self {
        Self {
            repo_path: default_repo_path(),
        }
    }
}

impl ShadowConfig {
    /// Create a configuration with the given repo path
    ///
    /// An empty value falls back to the default.
    pub fn with_repo_path<S: Into<String>>(repo_path: S) -> Self {
        Self {
            repo_path: repo_path.into(),
        }
        .normalized()
    }

    /// Default location of the config file under `home`
    pub fn default_path(home: &Path) -> PathBuf {
        home.join(".config").join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME)
    }

    /// Location of the config file written by earlier `sh_adow` releases
    pub fn legacy_path(home: &Path) -> PathBuf {
        home.join(".config").join(LEGACY_CONFIG_DIR_NAME).join(CONFIG_FILE_NAME)
    }

    /// Load the user's configuration
    ///
    /// Falls back to defaults when the home directory is unknown or no
    /// config file exists.
    pub fn load() -> Result<Self> {
        match dirs::home_dir() {
            Some(home) => Self::load_from_home(&home),
            None => {
                debug!("No home directory, using default configuration");
                Ok(Self::default())
            }
        }
    }

    /// Load the configuration found under `home`
    ///
    /// The default location wins; the legacy location is read only when the
    /// default file is absent.
    pub fn load_from_home(home: &Path) -> Result<Self> {
        let path = Self::default_path(home);
        if path.exists() {
            return Self::from_file(&path);
        }

        let legacy = Self::legacy_path(home);
        if legacy.exists() {
            debug!("Using legacy config file {}", legacy.display());
            return Self::from_file(&legacy);
        }

        Self::from_file(&path)
    }

    /// Load configuration from `path`
    ///
    /// A missing file yields the defaults. An unreadable or malformed file is
    /// a configuration error.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No config file at {}, using defaults", path.display());
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(ShadowError::config(format!(
                    "Failed to read config {}: {e}",
                    path.display()
                )))
            }
        };

        Self::from_yaml(&text).map_err(|e| match e {
            ShadowError::Config(msg) => {
                ShadowError::config(format!("{}: {msg}", path.display()))
            }
            other => other,
        })
    }

    /// Parse configuration from YAML text
    pub fn from_yaml(text: &str) -> Result<Self> {
        let blank = text
            .lines()
            .map(str::trim)
            .all(|line| line.is_empty() || line.starts_with('#'));
        if blank {
            return Ok(Self::default());
        }
        let config: Option<ShadowConfig> = serde_yaml::from_str(text)
            .map_err(|e| ShadowError::config(format!("Invalid config: {e}")))?;
        Ok(config.unwrap_or_default().normalized())
    }

    fn normalized(mut self) -> Self {
        if self.repo_path.trim().is_empty() {
            self.repo_path = default_repo_path();
        }
        self
    }
}
