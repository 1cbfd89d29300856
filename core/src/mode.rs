//! Storage mode resolution.
//!
//! The base rule maps the development environment to the local folder and
//! every other environment to the remote server. The persisted
//! [`ModeFlags`] can flip that choice in either direction. Resolution is a
//! pure function of its inputs and is re-run for every operation.

use serde::{Deserialize, Serialize};

use crate::config::flags::ModeFlags;

/// Deployment environment the process runs in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    /// Parse an environment name. Only `development` (any case) selects
    /// [`Environment::Development`]; every other name is treated as a
    /// deployed environment.
    pub fn from_name(name: &str) -> Self {
        if name.trim().eq_ignore_ascii_case("development") {
            Environment::Development
        } else {
            Environment::Production
        }
    }

    pub fn is_development(self) -> bool {
        self == Environment::Development
    }
}

/// The backend an operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageMode {
    Local,
    Remote,
}

/// Policy deciding which backend is active.
pub trait ModePolicy: Send + Sync {
    fn resolve(&self, environment: Environment, flags: ModeFlags) -> StorageMode;
}

/// Default policy: development ⇒ local unless `force_ssh_mode`, anything
/// else ⇒ remote unless `force_local_folder`.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvironmentPolicy;

impl ModePolicy for EnvironmentPolicy {
    fn resolve(&self, environment: Environment, flags: ModeFlags) -> StorageMode {
        match environment {
            Environment::Development if flags.force_ssh_mode => StorageMode::Remote,
            Environment::Development => StorageMode::Local,
            Environment::Production if flags.force_local_folder => StorageMode::Local,
            Environment::Production => StorageMode::Remote,
        }
    }
}
