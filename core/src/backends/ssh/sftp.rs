//! SFTP backend implementing [`StorageBackend`].
//!
//! Each operation opens its own [`SftpSession`] on the blocking pool, does
//! all of its work through that one session (a full tree walk or aggregate
//! included) and drops it before returning.

use std::io::Read;
use std::path::Path;

use ssh2::{FileStat, Sftp};
use tracing::{debug, info};

use super::session::SftpSession;
use crate::backends::Classified;
use crate::config::RemoteConfig;
use crate::errors::{map_io_error, map_sftp_error, StorageError};
use crate::files::{
    read_error_placeholder, AggregatedFile, EntryKind, FileDescriptor, FileEntry, StorageBackend,
    TreeNode,
};
use crate::mode::StorageMode;
use crate::paths::{
    ensure_trailing_slash, is_hidden, join_relative, normalize_relative, remote_path,
    validate_name,
};
use crate::tree::{file_paths, sort_entries, sort_nodes};

const MAX_TREE_DEPTH: usize = 32;
const DIR_MODE: i32 = 0o755;

/// Backend storing files under a directory on an SFTP server.
#[derive(Debug, Clone)]
pub struct SftpBackend {
    config: RemoteConfig,
    root: String,
}

impl SftpBackend {
    pub fn new(config: RemoteConfig, root: &str) -> Self {
        Self {
            config,
            root: ensure_trailing_slash(root),
        }
    }

    /// Run `op` against a fresh SFTP session on the blocking pool.
    ///
    /// The session is released when `op` returns, whatever the outcome.
    async fn with_session<T, F>(&self, op: F) -> Result<T, StorageError>
    where
        T: Send + 'static,
        F: FnOnce(&Sftp, &str) -> Result<T, StorageError> + Send + 'static,
    {
        let config = self.config.clone();
        let root = self.root.clone();
        tokio::task::spawn_blocking(move || {
            let session = SftpSession::open(&config)?;
            op(&*session, &root)
        })
        .await
        .map_err(|e| StorageError::Io(format!("Task join failed: {e}")))?
    }
}

#[async_trait::async_trait]
impl StorageBackend for SftpBackend {
    fn mode(&self) -> StorageMode {
        StorageMode::Remote
    }

    async fn list(&self, path: &str) -> Result<Vec<FileEntry>, StorageError> {
        let path = path.to_string();
        self.with_session(move |sftp, root| list_remote(sftp, root, &path))
            .await
    }

    async fn read(&self, path: &str) -> Result<String, StorageError> {
        let path = path.to_string();
        self.with_session(move |sftp, root| read_remote(sftp, root, &path))
            .await
    }

    async fn write(&self, file: &FileDescriptor, target_dir: &str) -> Result<(), StorageError> {
        let file = file.clone();
        let target_dir = target_dir.to_string();
        self.with_session(move |sftp, root| write_remote(sftp, root, &file, &target_dir))
            .await
    }

    async fn delete(&self, path: &str) -> Result<bool, StorageError> {
        let path = path.to_string();
        self.with_session(move |sftp, root| delete_remote(sftp, root, &path))
            .await
    }

    async fn mkdir(&self, name: &str, parent: &str) -> Result<bool, StorageError> {
        let name = name.to_string();
        let parent = parent.to_string();
        self.with_session(move |sftp, root| mkdir_remote(sftp, root, &name, &parent))
            .await
    }

    async fn tree(&self, path: &str) -> Result<Vec<TreeNode>, StorageError> {
        let path = path.to_string();
        self.with_session(move |sftp, root| tree_remote(sftp, root, &path))
            .await
    }

    async fn collect_files(&self, path: &str) -> Result<Vec<AggregatedFile>, StorageError> {
        let path = path.to_string();
        self.with_session(move |sftp, root| {
            let nodes = tree_remote(sftp, root, &path)?;
            let files = file_paths(&nodes)
                .into_iter()
                .map(|file_path| {
                    let content = read_remote(sftp, root, &file_path)
                        .unwrap_or_else(|e| read_error_placeholder(&e));
                    AggregatedFile {
                        path: file_path,
                        content,
                    }
                })
                .collect();
            Ok(files)
        })
        .await
    }
}

/// Classify a `readdir` item from its lstat attributes, resolving
/// symlinks with one extra `stat`.
fn classify(sftp: &Sftp, full_path: &Path, lstat: &FileStat) -> Classified {
    let target = if lstat.file_type().is_symlink() {
        sftp.stat(full_path).ok()
    } else {
        None
    };
    classify_stat(lstat, target.as_ref())
}

/// A link whose target cannot be resolved is reported as an empty file.
fn classify_stat(lstat: &FileStat, target: Option<&FileStat>) -> Classified {
    if !lstat.file_type().is_symlink() {
        return if lstat.is_dir() {
            Classified::Directory { linked: false }
        } else {
            Classified::File(lstat.size.unwrap_or(0))
        };
    }
    match target {
        Some(target) if target.is_dir() => Classified::Directory { linked: true },
        Some(target) => Classified::File(target.size.unwrap_or(0)),
        None => Classified::File(0),
    }
}

/// Non-hidden children of a remote directory as `(name, full path, stat)`.
fn read_dir_visible(
    sftp: &Sftp,
    dir: &str,
    relative: &str,
) -> Result<Vec<(String, std::path::PathBuf, FileStat)>, StorageError> {
    let entries = sftp
        .readdir(Path::new(dir))
        .map_err(|e| map_sftp_error(e, relative))?;
    Ok(entries
        .into_iter()
        .filter_map(|(full_path, stat)| {
            let name = full_path.file_name()?.to_string_lossy().to_string();
            if name == "." || name == ".." || is_hidden(&name) {
                return None;
            }
            Some((name, full_path, stat))
        })
        .collect())
}

fn list_remote(sftp: &Sftp, root: &str, path: &str) -> Result<Vec<FileEntry>, StorageError> {
    let relative = normalize_relative(path)?;
    let dir = remote_path(root, &relative)?;

    let mut result: Vec<FileEntry> = read_dir_visible(sftp, &dir, &relative)?
        .into_iter()
        .map(|(name, full_path, stat)| {
            let (kind, size) = match classify(sftp, &full_path, &stat) {
                Classified::Directory { .. } => (EntryKind::Directory, None),
                Classified::File(size) => (EntryKind::File, Some(size)),
            };
            FileEntry {
                path: join_relative(&relative, &name),
                name,
                kind,
                size,
            }
        })
        .collect();

    sort_entries(&mut result);
    debug!(path = %relative, count = result.len(), "Listed remote directory");
    Ok(result)
}

fn read_remote(sftp: &Sftp, root: &str, path: &str) -> Result<String, StorageError> {
    let relative = normalize_relative(path)?;
    let target = remote_path(root, &relative)?;

    let stat = sftp
        .stat(Path::new(&target))
        .map_err(|e| map_sftp_error(e, &relative))?;
    if stat.is_dir() {
        return Err(StorageError::Io(format!("{relative}: is a directory")));
    }

    let mut file = sftp
        .open(Path::new(&target))
        .map_err(|e| map_sftp_error(e, &relative))?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)
        .map_err(|e| map_io_error(e, &relative))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Create every missing directory of `relative` below the root.
fn ensure_remote_dirs(sftp: &Sftp, root: &str, relative: &str) -> Result<(), StorageError> {
    let mut current = String::new();
    for segment in relative.split('/').filter(|s| !s.is_empty()) {
        current = join_relative(&current, segment);
        let dir = remote_path(root, &current)?;
        match sftp.stat(Path::new(&dir)) {
            Ok(stat) if stat.is_dir() => {}
            Ok(_) => {
                return Err(StorageError::Io(format!(
                    "{current}: exists and is not a directory"
                )))
            }
            Err(_) => {
                sftp.mkdir(Path::new(&dir), DIR_MODE)
                    .map_err(|e| map_sftp_error(e, &current))?;
                debug!(path = %current, "Created remote directory");
            }
        }
    }
    Ok(())
}

fn write_remote(
    sftp: &Sftp,
    root: &str,
    file: &FileDescriptor,
    target_dir: &str,
) -> Result<(), StorageError> {
    let name = validate_name(&file.original_name)?;
    let relative = normalize_relative(target_dir)?;
    let dest_relative = join_relative(&relative, name);

    let mut source = std::fs::File::open(&file.local_temp_path)
        .map_err(|e| map_io_error(e, &file.local_temp_path.to_string_lossy()))?;

    ensure_remote_dirs(sftp, root, &relative)?;

    let dest = remote_path(root, &dest_relative)?;
    let mut remote = sftp
        .create(Path::new(&dest))
        .map_err(|e| map_sftp_error(e, &dest_relative))?;
    let copied = std::io::copy(&mut source, &mut remote)
        .map_err(|e| StorageError::Io(format!("upload to {dest_relative}: {e}")))?;
    info!(path = %dest_relative, bytes = copied, "Uploaded file to remote");
    Ok(())
}

/// Remove a remote directory and everything below it.
fn remove_tree(sftp: &Sftp, dir: &Path, relative: &str) -> Result<(), StorageError> {
    let entries = sftp
        .readdir(dir)
        .map_err(|e| map_sftp_error(e, relative))?;
    for (full_path, stat) in entries {
        let Some(name) = full_path.file_name().map(|n| n.to_string_lossy().to_string()) else {
            continue;
        };
        if name == "." || name == ".." {
            continue;
        }
        let child = join_relative(relative, &name);
        // readdir reports lstat attributes, so symlinks are unlinked, never followed.
        if stat.is_dir() {
            remove_tree(sftp, &full_path, &child)?;
        } else {
            sftp.unlink(&full_path)
                .map_err(|e| map_sftp_error(e, &child))?;
        }
    }
    sftp.rmdir(dir).map_err(|e| map_sftp_error(e, relative))
}

fn delete_remote(sftp: &Sftp, root: &str, path: &str) -> Result<bool, StorageError> {
    let relative = normalize_relative(path)?;
    if relative.is_empty() {
        return Err(StorageError::InvalidPath(
            "refusing to delete the storage root".to_string(),
        ));
    }
    let target = remote_path(root, &relative)?;

    let stat = match sftp.lstat(Path::new(&target)) {
        Ok(stat) => stat,
        Err(e) => {
            let err = map_sftp_error(e, &relative);
            if err.is_not_found() {
                return Ok(false);
            }
            return Err(err);
        }
    };

    if stat.is_dir() {
        remove_tree(sftp, Path::new(&target), &relative)?;
    } else {
        sftp.unlink(Path::new(&target))
            .map_err(|e| map_sftp_error(e, &relative))?;
    }
    info!(path = %relative, "Deleted remote entry");
    Ok(true)
}

fn mkdir_remote(sftp: &Sftp, root: &str, name: &str, parent: &str) -> Result<bool, StorageError> {
    let name = validate_name(name)?;
    let parent = normalize_relative(parent)?;
    let relative = join_relative(&parent, name);
    let target = remote_path(root, &relative)?;

    match sftp.stat(Path::new(&target)) {
        Ok(stat) if stat.is_dir() => return Ok(false),
        Ok(_) => {
            return Err(StorageError::Io(format!(
                "{relative}: exists and is not a directory"
            )))
        }
        Err(e) => {
            let err = map_sftp_error(e, &relative);
            if !err.is_not_found() {
                return Err(err);
            }
        }
    }

    ensure_remote_dirs(sftp, root, &parent)?;
    sftp.mkdir(Path::new(&target), DIR_MODE)
        .map_err(|e| map_sftp_error(e, &relative))?;
    info!(path = %relative, "Created remote folder");
    Ok(true)
}

fn tree_remote(sftp: &Sftp, root: &str, path: &str) -> Result<Vec<TreeNode>, StorageError> {
    let relative = normalize_relative(path)?;
    let dir = remote_path(root, &relative)?;
    let mut nodes = walk_remote(sftp, &dir, &relative, 0)?;
    sort_nodes(&mut nodes);
    Ok(nodes)
}

fn walk_remote(
    sftp: &Sftp,
    dir: &str,
    relative: &str,
    depth: usize,
) -> Result<Vec<TreeNode>, StorageError> {
    if depth >= MAX_TREE_DEPTH {
        debug!(path = %relative, "Tree depth limit reached");
        return Ok(Vec::new());
    }

    let mut nodes = Vec::new();
    for (name, full_path, stat) in read_dir_visible(sftp, dir, relative)? {
        let child = join_relative(relative, &name);
        match classify(sftp, &full_path, &stat) {
            Classified::Directory { linked: false } => {
                let child_dir = full_path.to_string_lossy().to_string();
                let children = walk_remote(sftp, &child_dir, &child, depth + 1)?;
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
