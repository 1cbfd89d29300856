pub mod backend;

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub use backend::StorageBackend;

/// Whether an entry is a regular file or a directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Directory,
}

/// A single entry returned by a directory listing.
///
/// `path` is relative to the storage root, forward-slash separated, with no
/// leading slash. `size` is only reported for files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    pub name: String,
    pub path: String,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

/// A node of the recursive directory tree.
///
/// `children` is only present on directories and `size` only on files.
/// A child's `path` is always `parent.path + "/" + child.name`, or the
/// bare name at the root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeNode {
    pub name: String,
    pub path: String,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<TreeNode>>,
}

impl TreeNode {
    pub fn file(name: impl Into<String>, path: impl Into<String>, size: u64) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            kind: EntryKind::File,
            size: Some(size),
            children: None,
        }
    }

    pub fn directory(
        name: impl Into<String>,
        path: impl Into<String>,
        children: Vec<TreeNode>,
    ) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            kind: EntryKind::Directory,
            size: None,
            children: Some(children),
        }
    }

    pub fn is_directory(&self) -> bool {
        self.kind == EntryKind::Directory
    }
}

/// A file staged on local disk by the upload handler, awaiting transfer
/// to the active backend.
///
/// The core only reads `local_temp_path`; removing the staged file after
/// the write (successful or not) stays with the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileDescriptor {
    pub original_name: String,
    pub local_temp_path: PathBuf,
    pub size: u64,
}

/// One file of a content aggregate.
///
/// When the file could not be read, `content` holds an error placeholder
/// instead (see [`read_error_placeholder`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregatedFile {
    pub path: String,
    pub content: String,
}

/// Placeholder stored in an [`AggregatedFile`] whose read failed.
pub fn read_error_placeholder(err: &crate::errors::StorageError) -> String {
    format!("[error reading file: {err}]")
}
