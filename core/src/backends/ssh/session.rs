//! Scoped SSH and SFTP sessions.
//!
//! Every remote operation acquires its own session and releases it when the
//! guard goes out of scope, on success and error paths alike.

use std::ops::Deref;
use std::time::Duration;

use ssh2::{Session, Sftp};
use tracing::{debug, warn};

use super::auth::connect_and_authenticate;
use crate::config::RemoteConfig;
use crate::errors::StorageError;

/// An authenticated SSH session that disconnects on drop.
pub(crate) struct ScopedSession {
    session: Session,
}

impl ScopedSession {
    /// Open a session bounded by the configured ready timeout.
    pub fn open(config: &RemoteConfig) -> Result<Self, StorageError> {
        Self::open_with_timeout(config, config.ready_timeout())
    }

    pub fn open_with_timeout(
        config: &RemoteConfig,
        timeout: Duration,
    ) -> Result<Self, StorageError> {
        let session = connect_and_authenticate(config, timeout)?;
        debug!(host = %config.host, "SSH session ready");
        Ok(Self { session })
    }
}

impl Deref for ScopedSession {
    type Target = Session;

    fn deref(&self) -> &Session {
        &self.session
    }
}

impl Drop for ScopedSession {
    fn drop(&mut self) {
        match self.session.disconnect(None, "filebridge: session closed", None) {
            Ok(()) => debug!("SSH session closed"),
            Err(e) => warn!("Failed to close SSH session: {e}"),
        }
    }
}

/// An SFTP channel together with the session that carries it.
///
/// Fields drop in declaration order, so the channel is shut down before
/// the session disconnects.
pub(crate) struct SftpSession {
    sftp: Sftp,
    _session: ScopedSession,
}

impl SftpSession {
    pub fn open(config: &RemoteConfig) -> Result<Self, StorageError> {
        let session = ScopedSession::open(config)?;
        let sftp = session
            .sftp()
            .map_err(|e| StorageError::Connection(format!("SFTP init failed: {e}")))?;
        Ok(Self {
            sftp,
            _session: session,
        })
    }
}

impl Deref for SftpSession {
    type Target = Sftp;

    fn deref(&self) -> &Sftp {
        &self.sftp
    }
}
