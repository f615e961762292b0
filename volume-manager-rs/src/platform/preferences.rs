//! Preference persistence.
//!
//! The tracked-device list is stored as JSON in the per-user config
//! directory. Writes go to a temporary file in the same directory that is
//! then renamed over the target, so a concurrent reader sees either the old
//! document or the new one.

use crate::engine::Config;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, warn};

/// Application name (used for the config directory).
pub const APP_NAME: &str = "volume-manager";

/// Preferences file name.
pub const PREFERENCES_FILE: &str = "preferences.json";

/// Preferences service error types.
#[derive(Debug, Error)]
pub enum PreferencesError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Failed to read {path:?}: {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write {path:?}: {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid preferences in {path:?}: {source}")]
    InvalidValue {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// File-backed preference store.
#[derive(Debug, Clone)]
pub struct PreferenceStore {
    path: PathBuf,
}

impl PreferenceStore {
    /// Create a store reading and writing `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at `<config dir>/volume-manager/preferences.json`.
    pub fn default_location() -> Result<Self, PreferencesError> {
        let dir = dirs::config_dir().ok_or(PreferencesError::NoConfigDir)?;
        Ok(Self::new(dir.join(APP_NAME).join(PREFERENCES_FILE)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the persisted config, falling back to the built-in default when
    /// the file is missing, empty, or unreadable.
    pub fn load(&self) -> Config {
        match self.try_load() {
            Ok(Some(config)) => {
                debug!(path = ?self.path, tracked = config.tracked_devices.len(), "loaded preferences");
                config
            }
            Ok(None) => {
                debug!(path = ?self.path, "no preferences found, using defaults");
                Config::default()
            }
            Err(e) => {
                warn!(error = %e, "preferences unreadable, using defaults");
                Config::default()
            }
        }
    }

    /// Load the persisted config.
    ///
    /// Returns `None` if the file doesn't exist or is empty.
    pub fn try_load(&self) -> Result<Option<Config>, PreferencesError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(PreferencesError::ReadFailed {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        if content.trim().is_empty() {
            return Ok(None);
        }

        let config: Config =
            serde_json::from_str(&content).map_err(|source| PreferencesError::InvalidValue {
                path: self.path.clone(),
                source,
            })?;

        Ok(Some(config.sanitize()))
    }

    /// Persist `config` atomically, creating the parent directory if needed.
    pub fn save(&self, config: &Config) -> Result<(), PreferencesError> {
        let write_err = |source| PreferencesError::WriteFailed {
            path: self.path.clone(),
            source,
        };

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir).map_err(write_err)?;

        let content = serde_json::to_string_pretty(config).map_err(|source| {
            PreferencesError::InvalidValue {
                path: self.path.clone(),
                source,
            }
        })?;

        let mut file = NamedTempFile::new_in(&dir).map_err(write_err)?;
        file.write_all(content.as_bytes()).map_err(write_err)?;
        file.as_file().sync_all().map_err(write_err)?;
        file.persist(&self.path).map_err(|e| write_err(e.error))?;

        debug!(path = ?self.path, "saved preferences");
        Ok(())
    }
}
