//! The storage backend interface shared by the local and SFTP backends.

use crate::errors::StorageError;
use crate::files::{read_error_placeholder, AggregatedFile, FileDescriptor, FileEntry, TreeNode};
use crate::mode::StorageMode;
use crate::tree::file_paths;

/// File operations against one storage root.
///
/// Every path argument is relative to the backend's root (see
/// [`crate::paths`]); implementations resolve and validate it themselves.
/// All methods are async so the SFTP backend can offload its blocking
/// libssh2 calls.
#[async_trait::async_trait]
pub trait StorageBackend: Send + Sync {
    /// Which storage mode this backend serves.
    fn mode(&self) -> StorageMode;

    /// List the non-hidden entries of a directory.
    async fn list(&self, path: &str) -> Result<Vec<FileEntry>, StorageError>;

    /// Read a file as text.
    async fn read(&self, path: &str) -> Result<String, StorageError>;

    /// Copy a staged file into `target_dir`, creating the directory chain
    /// if needed and overwriting any existing file of the same name.
    async fn write(&self, file: &FileDescriptor, target_dir: &str) -> Result<(), StorageError>;

    /// Delete a file, or a directory with all its contents.
    ///
    /// Returns `false` when nothing exists at `path`.
    async fn delete(&self, path: &str) -> Result<bool, StorageError>;

    /// Create folder `name` inside `parent`.
    ///
    /// Returns `false` without touching anything when it already exists.
    async fn mkdir(&self, name: &str, parent: &str) -> Result<bool, StorageError>;

    /// Recursive walk of `path`, dotfiles excluded at every level.
    async fn tree(&self, path: &str) -> Result<Vec<TreeNode>, StorageError>;

    /// Every file under `path` with its content, depth-first.
    ///
    /// A file that fails to read gets an error placeholder as content so
    /// one bad entry never aborts the whole aggregate.
    async fn collect_files(&self, path: &str) -> Result<Vec<AggregatedFile>, StorageError> {
        let nodes = self.tree(path).await?;
        let mut files = Vec::new();
        for file_path in file_paths(&nodes) {
            let content = match self.read(&file_path).await {
                Ok(content) => content,
                Err(e) => read_error_placeholder(&e),
            };
            files.push(AggregatedFile {
                path: file_path,
                content,
            });
        }
        Ok(files)
    }
}
