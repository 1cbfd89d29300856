//! Error taxonomy for the filebridge storage core.
//!
//! Backends classify every failure into one of these variants and propagate
//! it; rendering human-readable messages is left to the consumer.

use thiserror::Error;

/// Errors returned by storage operations.
#[derive(Error, Debug)]
pub enum StorageError {
    /// The target path does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The remote session could not be established or timed out.
    #[error("Connection error: {0}")]
    Connection(String),

    /// A read, write or delete failed for a reason other than absence.
    #[error("I/O error: {0}")]
    Io(String),

    /// A configuration update was rejected.
    #[error("Config error: {0}")]
    Config(String),

    /// A caller-supplied path or entry name escapes the storage root or is
    /// otherwise malformed.
    #[error("Invalid path: {0}")]
    InvalidPath(String),
}

impl StorageError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound(_))
    }

    pub fn is_connection(&self) -> bool {
        matches!(self, StorageError::Connection(_))
    }
}

/// Map `std::io::Error` to `StorageError` based on error kind.
pub fn map_io_error(e: std::io::Error, path: &str) -> StorageError {
    match e.kind() {
        std::io::ErrorKind::NotFound => StorageError::NotFound(path.to_string()),
        _ => StorageError::Io(format!("{path}: {e}")),
    }
}

/// SFTP status code for a missing file (`LIBSSH2_FX_NO_SUCH_FILE`).
const SFTP_NO_SUCH_FILE: i32 = 2;

/// Map an `ssh2::Error` raised by an SFTP call to `StorageError`.
pub fn map_sftp_error(e: ssh2::Error, path: &str) -> StorageError {
    match e.code() {
        ssh2::ErrorCode::SFTP(SFTP_NO_SUCH_FILE) => StorageError::NotFound(path.to_string()),
        _ => StorageError::Io(format!("{path}: {e}")),
    }
}
