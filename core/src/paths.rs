//! Conversion between caller-facing relative paths and backend paths.
//!
//! Callers always address entries with a backend-agnostic relative path:
//! forward-slash separated, no leading slash, empty for the root. Each
//! backend turns that into its own absolute form:
//!
//! - local: `local_root.join(relative)`
//! - remote: `remote_root + relative`, where `remote_root` ends with `/`
//!
//! Both directions go through [`normalize_relative`], which rejects any
//! path that would climb above the root.

use std::path::{Path, PathBuf};

use crate::errors::StorageError;

/// Normalize a caller-supplied relative path.
///
/// Backslashes are treated as separators, leading slashes are stripped,
/// empty and `.` segments are dropped and `..` pops the previous segment.
/// A `..` with nothing left to pop escapes the root and is rejected.
pub fn normalize_relative(path: &str) -> Result<String, StorageError> {
    let unified = path.replace('\\', "/");
    let mut segments: Vec<&str> = Vec::new();

    for segment in unified.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if segments.pop().is_none() {
                    return Err(StorageError::InvalidPath(path.to_string()));
                }
            }
            other => segments.push(other),
        }
    }

    Ok(segments.join("/"))
}

/// Absolute local path for a relative path under `root`.
pub fn local_path(root: &Path, relative: &str) -> Result<PathBuf, StorageError> {
    let normalized = normalize_relative(relative)?;
    if normalized.is_empty() {
        return Ok(root.to_path_buf());
    }
    Ok(root.join(normalized))
}

/// Absolute remote path for a relative path under `root`.
pub fn remote_path(root: &str, relative: &str) -> Result<String, StorageError> {
    let normalized = normalize_relative(relative)?;
    Ok(format!("{}{}", ensure_trailing_slash(root), normalized))
}

/// Append a `/` to `root` unless it already ends with one.
pub fn ensure_trailing_slash(root: &str) -> String {
    if root.ends_with('/') {
        root.to_string()
    } else {
        format!("{root}/")
    }
}

/// Relative path of `name` inside `parent` (bare `name` at the root).
pub fn join_relative(parent: &str, name: &str) -> String {
    let parent = parent.trim_matches('/');
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{parent}/{name}")
    }
}

/// Parent of a relative path (`""` for entries at the root).
pub fn parent_relative(path: &str) -> &str {
    match path.rfind('/') {
        Some(idx) => &path[..idx],
        None => "",
    }
}

/// Validate a single entry name (folder name or uploaded file name).
pub fn validate_name(name: &str) -> Result<&str, StorageError> {
    let trimmed = name.trim();
    if trimmed.is_empty()
        || trimmed == "."
        || trimmed == ".."
        || trimmed.contains('/')
        || trimmed.contains('\\')
    {
        return Err(StorageError::InvalidPath(name.to_string()));
    }
    Ok(trimmed)
}

/// Dotfiles are hidden from listings, trees and aggregates.
pub fn is_hidden(name: &str) -> bool {
    name.starts_with('.')
}
