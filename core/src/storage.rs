//! Caller-facing storage facade.
//!
//! [`Storage`] owns the process-wide [`StorageConfig`] and the persisted
//! mode flags. Every operation snapshots the config, resolves the active
//! mode through the [`ModePolicy`] and dispatches to a freshly built
//! backend, so a config change affects the next call but never one that
//! is already running.

use std::sync::{Arc, PoisonError, RwLock};

use tracing::{debug, info};

use crate::backends::ssh::{execute_command, test_connection, CommandOutput};
use crate::backends::{LocalBackend, SandboxFallback, SftpBackend};
use crate::config::flags::FlagStore;
use crate::config::{ConfigUpdate, ConfigView, StorageConfig};
use crate::errors::StorageError;
use crate::files::{AggregatedFile, FileDescriptor, FileEntry, StorageBackend, TreeNode};
use crate::mode::{EnvironmentPolicy, ModePolicy, StorageMode};
use crate::tree::{render_markdown, render_outline};

/// Dual-backend file storage.
pub struct Storage {
    config: RwLock<StorageConfig>,
    flags: FlagStore,
    policy: Arc<dyn ModePolicy>,
}

impl Storage {
    /// Create a storage facade using the default [`EnvironmentPolicy`].
    pub fn new(config: StorageConfig) -> Self {
        Self::with_policy(config, Arc::new(EnvironmentPolicy))
    }

    /// Create a storage facade with a custom mode policy.
    ///
    /// The persisted mode flags at `config.flags_path` replace the flags
    /// carried by `config`.
    pub fn with_policy(mut config: StorageConfig, policy: Arc<dyn ModePolicy>) -> Self {
        let flags = FlagStore::new(config.flags_path.clone());
        config.set_flags(flags.load());
        let storage = Self {
            config: RwLock::new(config),
            flags,
            policy,
        };
        info!(mode = ?storage.mode(), "Storage initialized");
        storage
    }

    /// Create a storage facade from process environment variables.
    pub fn from_env() -> Self {
        Self::new(StorageConfig::from_env())
    }

    fn snapshot(&self) -> StorageConfig {
        self.config
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn resolve(&self, config: &StorageConfig) -> StorageMode {
        self.policy.resolve(config.environment, config.flags())
    }

    /// The mode the next operation would use.
    pub fn mode(&self) -> StorageMode {
        self.resolve(&self.snapshot())
    }

    pub fn is_local_folder_active(&self) -> bool {
        self.mode() == StorageMode::Local
    }

    /// Backend for the currently active mode.
    pub fn backend(&self) -> Box<dyn StorageBackend> {
        self.backend_for(&self.snapshot())
    }

    fn backend_for(&self, config: &StorageConfig) -> Box<dyn StorageBackend> {
        let mode = self.resolve(config);
        debug!(?mode, "Selected storage backend");
        match mode {
            StorageMode::Local => Box::new(LocalBackend::new(config.local_root_path.clone())),
            StorageMode::Remote => {
                let sftp = SftpBackend::new(config.remote.clone(), &config.remote_root_path);
                if config.sandbox_fallback {
                    Box::new(SandboxFallback::new(sftp))
                } else {
                    Box::new(sftp)
                }
            }
        }
    }

    pub async fn list_entries(&self, path: &str) -> Result<Vec<FileEntry>, StorageError> {
        self.backend().list(path).await
    }

    pub async fn read_file(&self, path: &str) -> Result<String, StorageError> {
        self.backend().read(path).await
    }

    pub async fn write_file(
        &self,
        file: &FileDescriptor,
        target_dir: &str,
    ) -> Result<(), StorageError> {
        self.backend().write(file, target_dir).await
    }

    pub async fn delete_entry(&self, path: &str) -> Result<bool, StorageError> {
        self.backend().delete(path).await
    }

    pub async fn create_folder(&self, name: &str, parent: &str) -> Result<bool, StorageError> {
        self.backend().mkdir(name, parent).await
    }

    pub async fn get_tree(&self, path: &str) -> Result<Vec<TreeNode>, StorageError> {
        self.backend().tree(path).await
    }

    /// Indented text outline of the tree under `path`.
    pub async fn get_outline(&self, path: &str) -> Result<String, StorageError> {
        let nodes = self.get_tree(path).await?;
        Ok(render_outline(&nodes))
    }

    pub async fn get_all_files_aggregate(
        &self,
        path: &str,
    ) -> Result<Vec<AggregatedFile>, StorageError> {
        self.backend().collect_files(path).await
    }

    /// The aggregate under `path` rendered as Markdown.
    pub async fn get_formatted_aggregate(&self, path: &str) -> Result<String, StorageError> {
        let files = self.get_all_files_aggregate(path).await?;
        Ok(render_markdown(&files))
    }

    /// Whether the remote server is reachable.
    ///
    /// Always `true` while the local folder is active.
    pub async fn test_connectivity(&self) -> bool {
        let config = self.snapshot();
        if self.resolve(&config) == StorageMode::Local {
            debug!("Local folder active, skipping connectivity test");
            return true;
        }
        test_connection(&config.remote).await
    }

    /// Run a shell command on the remote server.
    pub async fn execute_remote_command(
        &self,
        command: &str,
    ) -> Result<CommandOutput, StorageError> {
        let config = self.snapshot();
        if self.resolve(&config) == StorageMode::Local {
            return Err(StorageError::Config(
                "remote commands are unavailable while the local folder is active".into(),
            ));
        }
        execute_command(&config.remote, command).await
    }

    /// Current configuration with credentials redacted.
    pub fn get_config(&self) -> ConfigView {
        let config = self.snapshot();
        config.view(self.resolve(&config))
    }

    /// Validate and apply a partial update, persisting the mode flags if
    /// the update touches them. A rejected update changes nothing.
    pub fn set_config(&self, update: &ConfigUpdate) -> Result<(), StorageError> {
        let mut config = self.config.write().unwrap_or_else(PoisonError::into_inner);

        let mut next = config.clone();
        next.apply(update)?;
        let mode = self.resolve(&next);
        next.validate_for(mode)?;

        if update.touches_flags() {
            self.flags.save(&next.flags())?;
        }
        *config = next;
        info!(?mode, "Storage configuration updated");
        Ok(())
    }

    pub fn set_force_local_folder(&self, value: bool) -> Result<(), StorageError> {
        self.set_config(&ConfigUpdate {
            force_local_folder: Some(value),
            ..Default::default()
        })
    }

    pub fn set_force_ssh_mode(&self, value: bool) -> Result<(), StorageError> {
        self.set_config(&ConfigUpdate {
            force_ssh_mode: Some(value),
            ..Default::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RemoteConfig;
    use crate::config::flags::ModeFlags;
    use crate::mode::Environment;
    use tempfile::TempDir;

    fn config_in(dir: &TempDir, environment: Environment) -> StorageConfig {
        StorageConfig {
            environment,
            local_root_path: dir.path().join("files"),
            flags_path: dir.path().join("state").join("mode.json"),
            ..Default::default()
        }
    }

    fn complete_remote() -> RemoteConfig {
        RemoteConfig {
            host: "files.example.com".into(),
            username: "deploy".into(),
            password: Some("hunter2".into()),
            ..Default::default()
        }
    }

    #[test]
    fn development_defaults_to_local() {
        let dir = TempDir::new().unwrap();
        let storage = Storage::new(config_in(&dir, Environment::Development));
        assert_eq!(storage.mode(), StorageMode::Local);
        assert!(storage.is_local_folder_active());
    }

    #[test]
    fn persisted_flags_are_loaded_at_construction() {
        let dir = TempDir::new().unwrap();
        let config = config_in(&dir, Environment::Production);
        FlagStore::new(config.flags_path.clone())
            .save(&ModeFlags {
                force_local_folder: true,
                force_ssh_mode: false,
            })
            .unwrap();

        let storage = Storage::new(config);
        assert_eq!(storage.mode(), StorageMode::Local);
        assert!(storage.get_config().force_local_folder);
    }

    #[test]
    fn force_flags_persist_across_instances() {
        let dir = TempDir::new().unwrap();
        let mut config = config_in(&dir, Environment::Development);
        config.remote = complete_remote();

        let storage = Storage::new(config.clone());
        storage.set_force_ssh_mode(true).unwrap();
        assert_eq!(storage.mode(), StorageMode::Remote);

        let reopened = Storage::new(config);
        assert_eq!(reopened.mode(), StorageMode::Remote);
    }

    #[test]
    fn switching_to_incomplete_remote_is_rejected() {
        let dir = TempDir::new().unwrap();
        let storage = Storage::new(config_in(&dir, Environment::Development));

        let err = storage.set_force_ssh_mode(true).unwrap_err();
        assert!(matches!(err, StorageError::Config(_)));
        assert_eq!(storage.mode(), StorageMode::Local);
        assert!(!dir.path().join("state").join("mode.json").exists());
    }

    #[test]
    fn invalid_root_update_leaves_config_unchanged() {
        let dir = TempDir::new().unwrap();
        let storage = Storage::new(config_in(&dir, Environment::Development));
        let before = storage.get_config();

        let err = storage
            .set_config(&ConfigUpdate {
                remote_root_path: Some("relative/path".into()),
                local_root_path: Some("/elsewhere".into()),
                ..Default::default()
            })
            .unwrap_err();
        assert!(matches!(err, StorageError::Config(_)));
        assert_eq!(storage.get_config(), before);
    }

    #[test]
    fn remote_root_gets_trailing_slash() {
        let dir = TempDir::new().unwrap();
        let storage = Storage::new(config_in(&dir, Environment::Development));
        storage
            .set_config(&ConfigUpdate {
                remote_root_path: Some("/data/uploads".into()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(storage.get_config().remote_root_path, "/data/uploads/");
    }

    #[test]
    fn config_view_hides_password() {
        let dir = TempDir::new().unwrap();
        let mut config = config_in(&dir, Environment::Production);
        config.remote = complete_remote();
        let view = Storage::new(config).get_config();

        assert!(view.has_password);
        assert_eq!(view.mode, StorageMode::Remote);
        let json = serde_json::to_string(&view).unwrap();
        assert!(!json.contains("hunter2"));
    }

    #[test]
    fn custom_policy_is_honored() {
        struct AlwaysRemote;
        impl ModePolicy for AlwaysRemote {
            fn resolve(&self, _: Environment, _: ModeFlags) -> StorageMode {
                StorageMode::Remote
            }
        }

        let dir = TempDir::new().unwrap();
        let storage = Storage::with_policy(
            config_in(&dir, Environment::Development),
            Arc::new(AlwaysRemote),
        );
        assert_eq!(storage.mode(), StorageMode::Remote);
        assert_eq!(storage.backend().mode(), StorageMode::Remote);
    }

    #[tokio::test]
    async fn connectivity_is_trivially_true_in_local_mode() {
        let dir = TempDir::new().unwrap();
        let storage = Storage::new(config_in(&dir, Environment::Development));
        assert!(storage.test_connectivity().await);
    }

    #[tokio::test]
    async fn remote_commands_are_refused_in_local_mode() {
        let dir = TempDir::new().unwrap();
        let storage = Storage::new(config_in(&dir, Environment::Development));
        let err = storage.execute_remote_command("ls").await.unwrap_err();
        assert!(matches!(err, StorageError::Config(_)));
    }

    #[tokio::test]
    async fn local_root_change_applies_to_next_call() {
        let dir = TempDir::new().unwrap();
        let storage = Storage::new(config_in(&dir, Environment::Development));
        storage.create_folder("first", "").await.unwrap();

        let other = dir.path().join("other");
        storage
            .set_config(&ConfigUpdate {
                local_root_path: Some(other.to_string_lossy().to_string()),
                ..Default::default()
            })
            .unwrap();
        let names: Vec<_> = storage
            .list_entries("")
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.name)
            .collect();
        assert_eq!(names, vec!["sample.js".to_string()]);
        assert!(other.is_dir());
    }
}
