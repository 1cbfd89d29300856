//! Concrete [`StorageBackend`](crate::files::StorageBackend) implementations.

pub mod local;
pub mod sandbox;
pub mod ssh;

pub use local::LocalBackend;
pub use sandbox::SandboxFallback;
pub use ssh::SftpBackend;

/// Kind of a directory entry as seen by listings and tree walks.
///
/// Symlinks take the kind of their target, but `linked` directories are
/// never descended into, so a walk stays inside the real tree and always
/// terminates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Classified {
    Directory { linked: bool },
    File(u64),
}
