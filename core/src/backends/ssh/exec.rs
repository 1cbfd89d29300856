//! One-shot remote command execution over a fresh SSH session.

use std::io::Read;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::session::ScopedSession;
use crate::config::RemoteConfig;
use crate::errors::StorageError;

/// Exit status and captured output of a remote command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandOutput {
    pub code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == 0
    }
}

/// Run `command` on the remote server and wait for it to exit.
///
/// A non-zero exit code is reported in [`CommandOutput::code`], not as an
/// error. Errors are reserved for session and channel failures.
pub async fn execute_command(
    config: &RemoteConfig,
    command: &str,
) -> Result<CommandOutput, StorageError> {
    let config = config.clone();
    let command = command.to_string();
    tokio::task::spawn_blocking(move || run_command(&config, &command))
        .await
        .map_err(|e| StorageError::Io(format!("Task join failed: {e}")))?
}

fn run_command(config: &RemoteConfig, command: &str) -> Result<CommandOutput, StorageError> {
    let session = ScopedSession::open(config)?;
    let mut channel = session
        .channel_session()
        .map_err(|e| StorageError::Connection(format!("Failed to open channel: {e}")))?;
    channel
        .exec(command)
        .map_err(|e| StorageError::Io(format!("Failed to execute command: {e}")))?;

    let mut stdout = Vec::new();
    channel
        .read_to_end(&mut stdout)
        .map_err(|e| StorageError::Io(format!("Failed to read command output: {e}")))?;
    let mut stderr = Vec::new();
    channel
        .stderr()
        .read_to_end(&mut stderr)
        .map_err(|e| StorageError::Io(format!("Failed to read command stderr: {e}")))?;

    if let Err(e) = channel.wait_close() {
        warn!("Channel did not close cleanly: {e}");
    }
    let code = channel
        .exit_status()
        .map_err(|e| StorageError::Io(format!("Failed to get exit status: {e}")))?;

    info!(code, "Remote command completed");
    Ok(CommandOutput {
        code,
        stdout: String::from_utf8_lossy(&stdout).into_owned(),
        stderr: String::from_utf8_lossy(&stderr).into_owned(),
    })
}
