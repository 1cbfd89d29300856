//! Presentations of a recursive directory walk.
//!
//! Backends produce the nested [`TreeNode`] form; this module derives the
//! flat views from it so that the tree, the outline and the aggregate
//! always describe the same set of files.

pub mod aggregate;
pub mod outline;

use std::cmp::Ordering;

use crate::files::{EntryKind, FileEntry, TreeNode};

pub use aggregate::render_markdown;
pub use outline::render_outline;

/// Directories first, then case-insensitive by name.
fn compare(a_kind: EntryKind, a_name: &str, b_kind: EntryKind, b_name: &str) -> Ordering {
    let rank = |kind: EntryKind| match kind {
        EntryKind::Directory => 0,
        EntryKind::File => 1,
    };
    rank(a_kind)
        .cmp(&rank(b_kind))
        .then_with(|| a_name.to_lowercase().cmp(&b_name.to_lowercase()))
        .then_with(|| a_name.cmp(b_name))
}

/// Sort listing entries with directories first, then by name.
pub fn sort_entries(entries: &mut [FileEntry]) {
    entries.sort_by(|a, b| compare(a.kind, &a.name, b.kind, &b.name));
}

/// Sort every level of a tree with directories first, then by name.
pub fn sort_nodes(nodes: &mut [TreeNode]) {
    nodes.sort_by(|a, b| compare(a.kind, &a.name, b.kind, &b.name));
    for node in nodes.iter_mut() {
        if let Some(children) = node.children.as_mut() {
            sort_nodes(children);
        }
    }
}

/// Relative paths of every file in the tree, depth-first.
pub fn file_paths(nodes: &[TreeNode]) -> Vec<String> {
    let mut paths = Vec::new();
    collect_paths(nodes, &mut paths);
    paths
}

fn collect_paths(nodes: &[TreeNode], out: &mut Vec<String>) {
    for node in nodes {
        if !node.is_directory() {
            out.push(node.path.clone());
        } else if let Some(children) = &node.children {
            collect_paths(children, out);
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// `docs/guide.md`, `src/a.js`, `src/nested/b.js`, `README.md`, in
    /// deliberately unsorted order.
    pub(crate) fn sample_tree() -> Vec<TreeNode> {
        vec![
            TreeNode::file("README.md", "README.md", 6),
            TreeNode::directory(
                "src",
                "src",
                vec![
                    TreeNode::directory(
                        "nested",
                        "src/nested",
                        vec![TreeNode::file("b.js", "src/nested/b.js", 2)],
                    ),
                    TreeNode::file("a.js", "src/a.js", 1),
                ],
            ),
            TreeNode::directory(
                "docs",
                "docs",
                vec![TreeNode::file("guide.md", "docs/guide.md", 3)],
            ),
        ]
    }

    #[test]
    fn sort_nodes_puts_directories_first() {
        let mut nodes = sample_tree();
        sort_nodes(&mut nodes);
        let names: Vec<&str> = nodes.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["docs", "src", "README.md"]);

        let src = nodes[1].children.as_ref().unwrap();
        assert_eq!(src[0].name, "nested");
        assert_eq!(src[1].name, "a.js");
    }

    #[test]
    fn sort_is_case_insensitive() {
        let mut nodes = vec![
            TreeNode::file("beta.txt", "beta.txt", 0),
            TreeNode::file("Alpha.txt", "Alpha.txt", 0),
        ];
        sort_nodes(&mut nodes);
        assert_eq!(nodes[0].name, "Alpha.txt");
    }

    #[test]
    fn file_paths_skips_directories() {
        let mut nodes = sample_tree();
        sort_nodes(&mut nodes);
        assert_eq!(
            file_paths(&nodes),
            vec!["docs/guide.md", "src/nested/b.js", "src/a.js", "README.md"]
        );
    }

    #[test]
    fn empty_directory_contributes_no_paths() {
        let nodes = vec![TreeNode::directory("empty", "empty", vec![])];
        assert!(file_paths(&nodes).is_empty());
    }

    #[test]
    fn sort_entries_matches_tree_order() {
        let mut entries = vec![
            FileEntry {
                name: "z.txt".into(),
                path: "z.txt".into(),
                kind: EntryKind::File,
                size: Some(1),
            },
            FileEntry {
                name: "b".into(),
                path: "b".into(),
                kind: EntryKind::Directory,
                size: None,
            },
        ];
        sort_entries(&mut entries);
        assert_eq!(entries[0].name, "b");
    }
}
