//! Markdown rendering of a content aggregate, used to inject full project
//! contents into chat prompts.

use crate::files::AggregatedFile;
use crate::paths::parent_relative;

/// Render the aggregate grouped by parent directory.
///
/// Groups appear in the order their first file appears in `files` (which
/// is depth-first for aggregates built by a backend). Each file becomes a
/// `### path` heading followed by a fenced block.
pub fn render_markdown(files: &[AggregatedFile]) -> String {
    let mut groups: Vec<(&str, Vec<&AggregatedFile>)> = Vec::new();
    for file in files {
        let dir = parent_relative(&file.path);
        match groups.iter_mut().find(|(name, _)| *name == dir) {
            Some((_, members)) => members.push(file),
            None => groups.push((dir, vec![file])),
        }
    }

    let mut out = format!("# Project files ({})\n", files.len());
    for (dir, members) in groups {
        let heading = if dir.is_empty() { "." } else { dir };
        out.push_str(&format!("\n## {heading}/\n"));
        for file in members {
            let fence = fence_for(&file.content);
            out.push_str(&format!(
                "\n### {}\n{fence}{}\n{}",
                file.path,
                language_for(&file.path),
                file.content
            ));
            if !file.content.ends_with('\n') {
                out.push('\n');
            }
            out.push_str(&fence);
            out.push('\n');
        }
    }
    out
}

/// A backtick fence longer than any backtick run inside `content`.
fn fence_for(content: &str) -> String {
    let mut longest = 0;
    let mut run = 0;
    for c in content.chars() {
        if c == '`' {
            run += 1;
            longest = longest.max(run);
        } else {
            run = 0;
        }
    }
    "`".repeat(longest.max(2) + 1)
}

/// Code block language tag derived from the file extension.
fn language_for(path: &str) -> &'static str {
    let ext = path
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "js" | "mjs" | "cjs" | "jsx" => "javascript",
        "ts" | "tsx" => "typescript",
        "py" => "python",
        "rs" => "rust",
        "java" => "java",
        "go" => "go",
        "rb" => "ruby",
        "php" => "php",
        "c" | "h" => "c",
        "cpp" | "cc" | "hpp" => "cpp",
        "cs" => "csharp",
        "html" | "htm" | "ejs" => "html",
        "css" => "css",
        "scss" => "scss",
        "json" => "json",
        "yml" | "yaml" => "yaml",
        "toml" => "toml",
        "md" => "markdown",
        "sh" | "bash" => "bash",
        "sql" => "sql",
        "xml" => "xml",
        _ => "",
    }
}
