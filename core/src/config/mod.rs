pub mod flags;

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::StorageError;
use crate::mode::{Environment, StorageMode};
use crate::paths::ensure_trailing_slash;

use self::flags::{default_flags_path, ModeFlags};

/// Remote directory used until an administrator changes it.
pub const DEFAULT_REMOTE_ROOT: &str = "/srv/filebridge/files/";
/// Local directory used until an administrator changes it.
pub const DEFAULT_LOCAL_ROOT: &str = "files";

/// Algorithm preference lists offered during the SSH handshake.
///
/// The defaults lead with modern algorithms and keep the legacy SHA-1 based
/// ones at the end so that old servers still negotiate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlgorithmPreferences {
    #[serde(default = "default_kex")]
    pub kex: Vec<String>,
    #[serde(default = "default_host_key")]
    pub host_key: Vec<String>,
    #[serde(default = "default_cipher")]
    pub cipher: Vec<String>,
    #[serde(default = "default_mac")]
    pub mac: Vec<String>,
}

impl Default for AlgorithmPreferences {
    fn default() -> Self {
        Self {
            kex: default_kex(),
            host_key: default_host_key(),
            cipher: default_cipher(),
            mac: default_mac(),
        }
    }
}

/// Connection settings for the remote server.
///
/// Read once at startup; nothing at runtime updates these fields.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteConfig {
    pub host: String,
    #[serde(default = "default_ssh_port")]
    pub port: u16,
    pub username: String,
    #[serde(default, skip_serializing)]
    pub password: Option<String>,
    /// Private key file; takes precedence over the password when set.
    #[serde(default)]
    pub key_path: Option<String>,
    #[serde(default = "default_ready_timeout_ms")]
    pub ready_timeout_ms: u64,
    #[serde(default = "default_keepalive_interval_secs")]
    pub keepalive_interval_secs: u32,
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,
    #[serde(default)]
    pub algorithms: AlgorithmPreferences,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: default_ssh_port(),
            username: String::new(),
            password: None,
            key_path: None,
            ready_timeout_ms: default_ready_timeout_ms(),
            keepalive_interval_secs: default_keepalive_interval_secs(),
            probe_timeout_ms: default_probe_timeout_ms(),
            algorithms: AlgorithmPreferences::default(),
        }
    }
}

impl fmt::Debug for RemoteConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("key_path", &self.key_path)
            .field("ready_timeout_ms", &self.ready_timeout_ms)
            .field("keepalive_interval_secs", &self.keepalive_interval_secs)
            .field("probe_timeout_ms", &self.probe_timeout_ms)
            .finish()
    }
}

impl RemoteConfig {
    pub fn ready_timeout(&self) -> Duration {
        Duration::from_millis(self.ready_timeout_ms)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    /// Whether enough is configured to attempt a session.
    pub fn is_complete(&self) -> bool {
        !self.host.trim().is_empty() && !self.username.trim().is_empty()
    }

    /// Return a copy with `~` in the key path expanded.
    pub fn expand(mut self) -> Self {
        self.key_path = self.key_path.map(|s| {
            let stripped = s.trim().trim_matches('"').trim_matches('\'');
            shellexpand::tilde(stripped).into_owned()
        });
        self
    }
}

/// Process-wide storage configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageConfig {
    pub environment: Environment,
    pub remote: RemoteConfig,
    /// Always ends with `/`.
    pub remote_root_path: String,
    pub local_root_path: PathBuf,
    #[serde(default)]
    pub force_local_folder: bool,
    #[serde(default)]
    pub force_ssh_mode: bool,
    /// Serve placeholder data when the remote server is unreachable during
    /// listing and reading. Off unless explicitly enabled.
    #[serde(default)]
    pub sandbox_fallback: bool,
    pub flags_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            environment: Environment::Development,
            remote: RemoteConfig::default(),
            remote_root_path: DEFAULT_REMOTE_ROOT.to_string(),
            local_root_path: PathBuf::from(DEFAULT_LOCAL_ROOT),
            force_local_folder: false,
            force_ssh_mode: false,
            sandbox_fallback: false,
            flags_path: default_flags_path(),
        }
    }
}

impl StorageConfig {
    /// Build the configuration from process environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable lookup.
    ///
    /// Recognized variables: `FILEBRIDGE_ENV` (defaults to `development`),
    /// `SSH_HOST`, `SSH_PORT`, `SSH_USERNAME`, `SSH_PASSWORD`,
    /// `SSH_KEY_PATH`.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let environment = non_empty("FILEBRIDGE_ENV")
            .map(|name| Environment::from_name(&name))
            .unwrap_or(Environment::Development);

        let remote = RemoteConfig {
            host: non_empty("SSH_HOST").unwrap_or_default(),
            port: non_empty("SSH_PORT")
                .and_then(|p| p.trim().parse().ok())
                .unwrap_or_else(default_ssh_port),
            username: non_empty("SSH_USERNAME").unwrap_or_default(),
            password: non_empty("SSH_PASSWORD"),
            key_path: non_empty("SSH_KEY_PATH"),
            ..RemoteConfig::default()
        }
        .expand();

        Self {
            environment,
            remote,
            ..Self::default()
        }
    }

    pub fn flags(&self) -> ModeFlags {
        ModeFlags {
            force_local_folder: self.force_local_folder,
            force_ssh_mode: self.force_ssh_mode,
        }
    }

    pub fn set_flags(&mut self, flags: ModeFlags) {
        self.force_local_folder = flags.force_local_folder;
        self.force_ssh_mode = flags.force_ssh_mode;
    }

    /// Apply a partial update after validating it.
    ///
    /// On error `self` is left untouched.
    pub fn apply(&mut self, update: &ConfigUpdate) -> Result<(), StorageError> {
        let mut next = self.clone();

        if let Some(root) = &update.remote_root_path {
            let root = root.trim();
            if root.is_empty() {
                return Err(StorageError::Config("remoteRootPath must not be empty".into()));
            }
            if !root.starts_with('/') {
                return Err(StorageError::Config(format!(
                    "remoteRootPath must be absolute: {root}"
                )));
            }
            next.remote_root_path = ensure_trailing_slash(root);
        }
        if let Some(root) = &update.local_root_path {
            if root.trim().is_empty() {
                return Err(StorageError::Config("localRootPath must not be empty".into()));
            }
            next.local_root_path = PathBuf::from(shellexpand::tilde(root.trim()).into_owned());
        }
        if let Some(value) = update.force_local_folder {
            next.force_local_folder = value;
        }
        if let Some(value) = update.force_ssh_mode {
            next.force_ssh_mode = value;
        }
        if let Some(value) = update.sandbox_fallback {
            next.sandbox_fallback = value;
        }

        *self = next;
        Ok(())
    }

    /// Reject a configuration that would make an incomplete remote active.
    pub fn validate_for(&self, mode: StorageMode) -> Result<(), StorageError> {
        if mode == StorageMode::Remote && !self.remote.is_complete() {
            return Err(StorageError::Config(
                "remote mode requires SSH host and username".into(),
            ));
        }
        Ok(())
    }

    /// Caller-facing view with credentials redacted.
    pub fn view(&self, mode: StorageMode) -> ConfigView {
        ConfigView {
            environment: self.environment,
            mode,
            host: self.remote.host.clone(),
            port: self.remote.port,
            username: self.remote.username.clone(),
            has_password: self.remote.password.is_some(),
            has_key: self.remote.key_path.is_some(),
            remote_root_path: self.remote_root_path.clone(),
            local_root_path: self.local_root_path.to_string_lossy().to_string(),
            force_local_folder: self.force_local_folder,
            force_ssh_mode: self.force_ssh_mode,
            sandbox_fallback: self.sandbox_fallback,
        }
    }
}

/// Redacted configuration returned to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigView {
    pub environment: Environment,
    pub mode: StorageMode,
    pub host: String,
    pub port: u16,
    pub username: String,
    pub has_password: bool,
    pub has_key: bool,
    pub remote_root_path: String,
    pub local_root_path: String,
    pub force_local_folder: bool,
    pub force_ssh_mode: bool,
    pub sandbox_fallback: bool,
}

/// Partial configuration update; `None` fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigUpdate {
    #[serde(default)]
    pub remote_root_path: Option<String>,
    #[serde(default)]
    pub local_root_path: Option<String>,
    #[serde(default)]
    pub force_local_folder: Option<bool>,
    #[serde(default)]
    pub force_ssh_mode: Option<bool>,
    #[serde(default)]
    pub sandbox_fallback: Option<bool>,
}

impl ConfigUpdate {
    /// Whether the update touches the persisted mode flags.
    pub fn touches_flags(&self) -> bool {
        self.force_local_folder.is_some() || self.force_ssh_mode.is_some()
    }
}

// --- Default value functions ---

fn default_ssh_port() -> u16 {
    22
}

fn default_ready_timeout_ms() -> u64 {
    20_000
}

fn default_keepalive_interval_secs() -> u32 {
    5
}

fn default_probe_timeout_ms() -> u64 {
    10_000
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn default_kex() -> Vec<String> {
    strings(&[
        "curve25519-sha256",
        "ecdh-sha2-nistp256",
        "diffie-hellman-group14-sha256",
        "diffie-hellman-group-exchange-sha256",
        "diffie-hellman-group14-sha1",
        "diffie-hellman-group-exchange-sha1",
        "diffie-hellman-group1-sha1",
    ])
}

fn default_host_key() -> Vec<String> {
    strings(&[
        "ssh-ed25519",
        "ecdsa-sha2-nistp256",
        "rsa-sha2-512",
        "rsa-sha2-256",
        "ssh-rsa",
    ])
}

fn default_cipher() -> Vec<String> {
    strings(&[
        "aes128-ctr",
        "aes192-ctr",
        "aes256-ctr",
        "aes128-gcm@openssh.com",
        "aes256-gcm@openssh.com",
    ])
}

fn default_mac() -> Vec<String> {
    strings(&["hmac-sha2-256", "hmac-sha2-512", "hmac-sha1"])
}
