//! Opt-in placeholder data for an unreachable remote server.
//!
//! [`SandboxFallback`] wraps another backend. When that backend fails to
//! connect during `list` or `read`, it answers with a fixed placeholder
//! listing or extension-based placeholder content instead of the error.
//! Everything else passes through unchanged, including aggregates, which
//! run entirely on the wrapped backend. Only enabled through the
//! `sandboxFallback` config flag.

use tracing::warn;

use crate::errors::StorageError;
use crate::files::{
    AggregatedFile, EntryKind, FileDescriptor, FileEntry, StorageBackend, TreeNode,
};
use crate::mode::StorageMode;
use crate::paths::{join_relative, normalize_relative};

/// Names returned by a sandboxed listing.
pub const PLACEHOLDER_FILES: [&str; 4] = ["example.js", "test.html", "style.css", "sample.js"];

/// Backend decorator substituting placeholder data on connection failures.
#[derive(Debug, Clone)]
pub struct SandboxFallback<B> {
    inner: B,
}

impl<B: StorageBackend> SandboxFallback<B> {
    pub fn new(inner: B) -> Self {
        Self { inner }
    }
}

#[async_trait::async_trait]
impl<B: StorageBackend> StorageBackend for SandboxFallback<B> {
    fn mode(&self) -> StorageMode {
        self.inner.mode()
    }

    async fn list(&self, path: &str) -> Result<Vec<FileEntry>, StorageError> {
        match self.inner.list(path).await {
            Err(e) if e.is_connection() => {
                warn!(path, "Serving placeholder listing: {e}");
                placeholder_listing(path)
            }
            other => other,
        }
    }

    async fn read(&self, path: &str) -> Result<String, StorageError> {
        match self.inner.read(path).await {
            Err(e) if e.is_connection() => {
                warn!(path, "Serving placeholder content: {e}");
                Ok(placeholder_content(path))
            }
            other => other,
        }
    }

    async fn write(&self, file: &FileDescriptor, target_dir: &str) -> Result<(), StorageError> {
        self.inner.write(file, target_dir).await
    }

    async fn delete(&self, path: &str) -> Result<bool, StorageError> {
        self.inner.delete(path).await
    }

    async fn mkdir(&self, name: &str, parent: &str) -> Result<bool, StorageError> {
        self.inner.mkdir(name, parent).await
    }

    async fn tree(&self, path: &str) -> Result<Vec<TreeNode>, StorageError> {
        self.inner.tree(path).await
    }

    async fn collect_files(&self, path: &str) -> Result<Vec<AggregatedFile>, StorageError> {
        self.inner.collect_files(path).await
    }
}

fn placeholder_listing(path: &str) -> Result<Vec<FileEntry>, StorageError> {
    let relative = normalize_relative(path)?;
    Ok(PLACEHOLDER_FILES
        .iter()
        .map(|name| {
            let path = join_relative(&relative, name);
            FileEntry {
                size: Some(placeholder_content(&path).len() as u64),
                name: (*name).to_string(),
                path,
                kind: EntryKind::File,
            }
        })
        .collect())
}

/// Placeholder text for a file, chosen by extension.
pub fn placeholder_content(path: &str) -> String {
    let name = path.rsplit('/').next().unwrap_or(path);
    let ext = name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "js" => format!(
            "// Placeholder content for {name}\nconsole.log(\"This is a placeholder file\");"
        ),
        "html" => "<!DOCTYPE html>\n<html>\n<head>\n  <title>Placeholder</title>\n</head>\n\
                   <body>\n  <h1>Placeholder HTML Content</h1>\n</body>\n</html>"
            .to_string(),
        "css" => format!(
            "/* Placeholder CSS for {name} */\nbody {{\n  font-family: sans-serif;\n  color: #333;\n}}"
        ),
        _ => format!("Placeholder content for {name}"),
    }
}
