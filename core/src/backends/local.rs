//! Local-folder backend implementing [`StorageBackend`].
//!
//! All filesystem work runs on the blocking pool via
//! `tokio::task::spawn_blocking`.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::Classified;
use crate::errors::{map_io_error, StorageError};
use crate::files::{EntryKind, FileDescriptor, FileEntry, StorageBackend, TreeNode};
use crate::mode::StorageMode;
use crate::paths::{is_hidden, join_relative, local_path, normalize_relative, validate_name};
use crate::tree::{sort_entries, sort_nodes};

/// Name of the file seeded into a freshly created root.
pub const SAMPLE_FILE_NAME: &str = "sample.js";

const SAMPLE_FILE_CONTENT: &str = "// sample.js - example file for analysis\n\
console.log(\"This is an example file for analysis.\");\n";

/// Recursion limit for tree walks.
const MAX_TREE_DEPTH: usize = 32;

/// Backend storing files under a directory on the local filesystem.
#[derive(Debug, Clone)]
pub struct LocalBackend {
    root: PathBuf,
}

impl LocalBackend {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait::async_trait]
impl StorageBackend for LocalBackend {
    fn mode(&self) -> StorageMode {
        StorageMode::Local
    }

    async fn list(&self, path: &str) -> Result<Vec<FileEntry>, StorageError> {
        let root = self.root.clone();
        let path = path.to_string();
        run_blocking(move || list_sync(&root, &path)).await
    }

    async fn read(&self, path: &str) -> Result<String, StorageError> {
        let root = self.root.clone();
        let path = path.to_string();
        run_blocking(move || read_sync(&root, &path)).await
    }

    async fn write(&self, file: &FileDescriptor, target_dir: &str) -> Result<(), StorageError> {
        let root = self.root.clone();
        let file = file.clone();
        let target_dir = target_dir.to_string();
        run_blocking(move || write_sync(&root, &file, &target_dir)).await
    }

    async fn delete(&self, path: &str) -> Result<bool, StorageError> {
        let root = self.root.clone();
        let path = path.to_string();
        run_blocking(move || delete_sync(&root, &path)).await
    }

    async fn mkdir(&self, name: &str, parent: &str) -> Result<bool, StorageError> {
        let root = self.root.clone();
        let name = name.to_string();
        let parent = parent.to_string();
        run_blocking(move || mkdir_sync(&root, &name, &parent)).await
    }

    async fn tree(&self, path: &str) -> Result<Vec<TreeNode>, StorageError> {
        let root = self.root.clone();
        let path = path.to_string();
        run_blocking(move || tree_sync(&root, &path)).await
    }
}

/// Run a blocking closure on the blocking pool and flatten the join error.
async fn run_blocking<T, F>(f: F) -> Result<T, StorageError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, StorageError> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| StorageError::Io(format!("Task join failed: {e}")))?
}

/// Create a missing directory; the root additionally gets the sample file.
fn ensure_directory(dir: &Path, is_root: bool) -> Result<(), StorageError> {
    if dir.exists() {
        return Ok(());
    }
    let shown = dir.to_string_lossy().to_string();
    std::fs::create_dir_all(dir).map_err(|e| map_io_error(e, &shown))?;
    info!(path = %shown, "Created missing local directory");

    if is_root {
        let sample = dir.join(SAMPLE_FILE_NAME);
        std::fs::write(&sample, SAMPLE_FILE_CONTENT)
            .map_err(|e| map_io_error(e, &sample.to_string_lossy()))?;
        debug!(path = %sample.display(), "Seeded sample file");
    }
    Ok(())
}

/// Classify an entry without failing on dangling symlinks.
///
/// A symlink takes the kind of its target. A link whose target cannot be
/// resolved is reported as an empty file, so reading it fails on its own.
fn classify(entry: &std::fs::DirEntry, child: &str) -> Result<Classified, StorageError> {
    let file_type = entry.file_type().map_err(|e| map_io_error(e, child))?;
    if !file_type.is_symlink() {
        if file_type.is_dir() {
            return Ok(Classified::Directory { linked: false });
        }
        let metadata = entry.metadata().map_err(|e| map_io_error(e, child))?;
        return Ok(Classified::File(metadata.len()));
    }

    match std::fs::metadata(entry.path()) {
        Ok(target) if target.is_dir() => Ok(Classified::Directory { linked: true }),
        Ok(target) => Ok(Classified::File(target.len())),
        Err(e) => {
            debug!(path = %child, "Unresolvable symlink: {e}");
            Ok(Classified::File(0))
        }
    }
}

fn list_sync(root: &Path, path: &str) -> Result<Vec<FileEntry>, StorageError> {
    let relative = normalize_relative(path)?;
    let dir = local_path(root, &relative)?;

    // Listing creates a missing directory (and seeds a missing root).
    ensure_directory(&dir, relative.is_empty())?;

    let entries = std::fs::read_dir(&dir).map_err(|e| map_io_error(e, &relative))?;
    let mut result = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| map_io_error(e, &relative))?;
        let name = entry.file_name().to_string_lossy().to_string();
        if is_hidden(&name) {
            continue;
        }

        let child = join_relative(&relative, &name);
        let (kind, size) = match classify(&entry, &child)? {
            Classified::Directory { .. } => (EntryKind::Directory, None),
            Classified::File(size) => (EntryKind::File, Some(size)),
        };

        result.push(FileEntry {
            name,
            path: child,
            kind,
            size,
        });
    }

    sort_entries(&mut result);
    Ok(result)
}

fn read_sync(root: &Path, path: &str) -> Result<String, StorageError> {
    let relative = normalize_relative(path)?;
    let file = local_path(root, &relative)?;
    if file.is_dir() {
        return Err(StorageError::Io(format!("{relative}: is a directory")));
    }
    let bytes = std::fs::read(&file).map_err(|e| map_io_error(e, &relative))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn write_sync(root: &Path, file: &FileDescriptor, target_dir: &str) -> Result<(), StorageError> {
    let name = validate_name(&file.original_name)?;
    let relative = normalize_relative(target_dir)?;
    let dir = local_path(root, &relative)?;

    std::fs::create_dir_all(&dir).map_err(|e| map_io_error(e, &relative))?;

    let dest = dir.join(name);
    if !file.local_temp_path.is_file() {
        return Err(StorageError::NotFound(
            file.local_temp_path.to_string_lossy().to_string(),
        ));
    }
    let copied = std::fs::copy(&file.local_temp_path, &dest)
        .map_err(|e| StorageError::Io(format!("copy to {}: {e}", join_relative(&relative, name))))?;
    debug!(path = %dest.display(), bytes = copied, "Stored uploaded file");
    Ok(())
}

fn delete_sync(root: &Path, path: &str) -> Result<bool, StorageError> {
    let relative = normalize_relative(path)?;
    if relative.is_empty() {
        return Err(StorageError::InvalidPath(
            "refusing to delete the storage root".to_string(),
        ));
    }
    let target = local_path(root, &relative)?;

    let metadata = match std::fs::symlink_metadata(&target) {
        Ok(m) => m,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(map_io_error(e, &relative)),
    };

    if metadata.is_dir() {
        std::fs::remove_dir_all(&target).map_err(|e| map_io_error(e, &relative))?;
    } else {
        std::fs::remove_file(&target).map_err(|e| map_io_error(e, &relative))?;
    }
    info!(path = %relative, "Deleted local entry");
    Ok(true)
}

fn mkdir_sync(root: &Path, name: &str, parent: &str) -> Result<bool, StorageError> {
    let name = validate_name(name)?;
    let relative = join_relative(&normalize_relative(parent)?, name);
    let target = local_path(root, &relative)?;

    if target.is_dir() {
        return Ok(false);
    }
    if target.exists() {
        return Err(StorageError::Io(format!(
            "{relative}: exists and is not a directory"
        )));
    }
    std::fs::create_dir_all(&target).map_err(|e| map_io_error(e, &relative))?;
    info!(path = %relative, "Created local folder");
    Ok(true)
}

fn tree_sync(root: &Path, path: &str) -> Result<Vec<TreeNode>, StorageError> {
    let relative = normalize_relative(path)?;
    let dir = local_path(root, &relative)?;

    if relative.is_empty() {
        ensure_directory(&dir, true)?;
    } else if !dir.is_dir() {
        return Err(StorageError::NotFound(relative));
    }

    let mut nodes = walk(&dir, &relative, 0)?;
    sort_nodes(&mut nodes);
    Ok(nodes)
}

fn walk(dir: &Path, relative: &str, depth: usize) -> Result<Vec<TreeNode>, StorageError> {
    if depth >= MAX_TREE_DEPTH {
        debug!(path = %relative, "Tree depth limit reached");
        return Ok(Vec::new());
    }

    let entries = std::fs::read_dir(dir).map_err(|e| map_io_error(e, relative))?;
    let mut nodes = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| map_io_error(e, relative))?;
        let name = entry.file_name().to_string_lossy().to_string();
        if is_hidden(&name) {
            continue;
        }

        let child = join_relative(relative, &name);
        match classify(&entry, &child)? {
            Classified::Directory { linked: false } => {
                let children = walk(&entry.path(), &child, depth + 1)?;
                nodes.push(TreeNode::directory(name, child, children));
            }
            Classified::Directory { linked: true } => {
                debug!(path = %child, "Not descending into symlinked directory");
                nodes.push(TreeNode::directory(name, child, Vec::new()));
            }
            Classified::File(size) => nodes.push(TreeNode::file(name, child, size)),
        }
    }
    Ok(nodes)
}
