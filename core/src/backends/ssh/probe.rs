//! Connectivity probe: open a throwaway SSH session and report whether it
//! became ready within the probe timeout.

use tracing::{info, warn};

use super::session::ScopedSession;
use crate::config::RemoteConfig;

/// Whether an authenticated SSH session can be established.
///
/// Never fails and never waits longer than `config.probe_timeout()`. The
/// session, if one was opened, is closed before the blocking task ends.
pub async fn test_connection(config: &RemoteConfig) -> bool {
    let timeout = config.probe_timeout();
    let owned = config.clone();
    let attempt = tokio::task::spawn_blocking(move || {
        ScopedSession::open_with_timeout(&owned, timeout).map(drop)
    });

    match tokio::time::timeout(timeout, attempt).await {
        Ok(Ok(Ok(()))) => {
            info!(host = %config.host, "SSH connection test succeeded");
            true
        }
        Ok(Ok(Err(e))) => {
            warn!(host = %config.host, "SSH connection test failed: {e}");
            false
        }
        Ok(Err(e)) => {
            warn!("SSH connection test task failed: {e}");
            false
        }
        Err(_) => {
            warn!(host = %config.host, ?timeout, "SSH connection test timed out");
            false
        }
    }
}
