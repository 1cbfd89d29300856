//! Indented text outline of a tree, used as a lightweight project overview
//! in chat prompts.

use crate::files::TreeNode;

const INDENT: &str = "  ";
const DIRECTORY_PREFIX: &str = "📁 ";
const FILE_PREFIX: &str = "📄 ";

/// Render `nodes` as one line per entry, two spaces of indent per level.
///
/// Directories are listed before files at every level and each group is
/// sorted by name, regardless of the order of the input.
pub fn render_outline(nodes: &[TreeNode]) -> String {
    let mut sorted = nodes.to_vec();
    super::sort_nodes(&mut sorted);

    let mut lines = Vec::new();
    push_lines(&sorted, 0, &mut lines);
    lines.join("\n")
}

fn push_lines(nodes: &[TreeNode], depth: usize, lines: &mut Vec<String>) {
    let indent = INDENT.repeat(depth);
    for node in nodes {
        match &node.children {
            Some(children) => {
                lines.push(format!("{indent}{DIRECTORY_PREFIX}{}/", node.name));
                push_lines(children, depth + 1, lines);
            }
            None => lines.push(format!("{indent}{FILE_PREFIX}{}", node.name)),
        }
    }
}
