//! Remote storage over SSH.
//!
//! [`SftpBackend`] serves the file operations; [`test_connection()`] and
//! [`execute_command()`] each open their own short-lived session. No
//! session outlives the call that opened it.

pub mod auth;
mod exec;
mod probe;
mod session;
mod sftp;

pub use exec::{execute_command, CommandOutput};
pub use probe::test_connection;
pub use sftp::SftpBackend;
