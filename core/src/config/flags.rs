//! Persisted mode override flags.
//!
//! The two override flags survive restarts: they are read once when the
//! storage facade is built and the file is rewritten on every change.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::errors::StorageError;

/// Override flags for the storage mode policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModeFlags {
    /// Use the local folder even outside development.
    #[serde(default)]
    pub force_local_folder: bool,
    /// Use the remote server even in development.
    #[serde(default)]
    pub force_ssh_mode: bool,
}

/// JSON file holding the [`ModeFlags`].
#[derive(Debug, Clone)]
pub struct FlagStore {
    path: PathBuf,
}

impl FlagStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the flags, falling back to defaults if the file is missing or
    /// corrupt.
    pub fn load(&self) -> ModeFlags {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) => match serde_json::from_str::<ModeFlags>(&contents) {
                Ok(flags) => {
                    debug!(path = %self.path.display(), ?flags, "Loaded mode flags");
                    flags
                }
                Err(e) => {
                    warn!("Failed to parse mode flags from {}: {}", self.path.display(), e);
                    ModeFlags::default()
                }
            },
            Err(_) => {
                debug!("No mode flags file at {}", self.path.display());
                ModeFlags::default()
            }
        }
    }

    /// Write the flags, creating the parent directory if needed.
    pub fn save(&self, flags: &ModeFlags) -> Result<(), StorageError> {
        let shown = self.path.display().to_string();
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                StorageError::Io(format!("create {}: {e}", parent.display()))
            })?;
        }
        let json = serde_json::to_string_pretty(flags)
            .map_err(|e| StorageError::Io(format!("serialize mode flags: {e}")))?;
        std::fs::write(&self.path, json).map_err(|e| StorageError::Io(format!("{shown}: {e}")))?;
        debug!(path = %shown, ?flags, "Saved mode flags");
        Ok(())
    }
}

/// Default flags location: `<config dir>/filebridge/mode.json`.
pub fn default_flags_path() -> PathBuf {
    config_dir().join("mode.json")
}

/// Get the platform config directory for filebridge.
fn config_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(xdg).join("filebridge");
    }
    if let Ok(home) = std::env::var("HOME") {
        #[cfg(target_os = "macos")]
        return PathBuf::from(&home)
            .join("Library")
            .join("Application Support")
            .join("filebridge");
        #[cfg(not(target_os = "macos"))]
        return PathBuf::from(&home).join(".config").join("filebridge");
    }
    PathBuf::from(".config").join("filebridge")
}
