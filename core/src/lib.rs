//! Dual-backend file storage for filebridge.
//!
//! One operation set (list, read, write, delete, mkdir, tree, aggregate)
//! served either from a local directory or from a remote server over SFTP.
//! [`Storage`] picks the backend per call from the environment and the
//! persisted override flags.

pub mod backends;
pub mod config;
pub mod errors;
pub mod files;
pub mod mode;
pub mod paths;
pub mod storage;
pub mod tree;

pub use errors::StorageError;
pub use storage::Storage;
