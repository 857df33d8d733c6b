//! Text tree rendering
//!
//! Produces one line per process with Unix `tree`-style connectors:
//!
//! ```text
//! └─init
//!     └─shell
//!         ├─editor
//!         └─browser
//! ```

use crate::models::{Forest, ProcessNode};

/// Connector for the last child of a parent
pub const LAST_CONNECTOR: &str = "└─";
/// Connector for any other child
pub const MID_CONNECTOR: &str = "├─";
/// Continuation below a parent that was the last sibling
pub const BLANK_SEGMENT: &str = "    ";
/// Continuation below a parent with siblings still to come
pub const BAR_SEGMENT: &str = "│   ";

/// Options for text rendering
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderOptions {
    /// Append `(pid)` after each name
    pub show_pids: bool,
}

/// One rendered line, kept in parts so callers can style each piece
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeLine<'a> {
    /// Continuation segments inherited from ancestors
    pub prefix: String,
    /// [`LAST_CONNECTOR`] or [`MID_CONNECTOR`]
    pub connector: &'static str,
    pub name: &'a str,
    /// Present when `show_pids` was requested
    pub pid: Option<u32>,
    /// Depth below the root (roots are 0)
    pub depth: usize,
}

impl std::fmt::Display for TreeLine<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}{}", self.prefix, self.connector, self.name)?;
        if let Some(pid) = self.pid {
            write!(f, "({})", pid)?;
        }
        Ok(())
    }
}

/// Walk the forest depth-first and produce structured lines
///
/// Each root starts a fresh tree with an empty prefix and the last-sibling
/// connector. The walk uses an explicit stack rather than recursion.
pub fn render_lines<'a>(forest: &'a Forest, options: &RenderOptions) -> Vec<TreeLine<'a>> {
    let mut lines = Vec::with_capacity(forest.node_count());

    for root in &forest.roots {
        // (node, prefix of its line, is last sibling, depth)
        let mut stack: Vec<(&ProcessNode, String, bool, usize)> =
            vec![(root, String::new(), true, 0)];

        while let Some((node, prefix, is_last, depth)) = stack.pop() {
            let child_prefix = format!(
                "{}{}",
                prefix,
                if is_last { BLANK_SEGMENT } else { BAR_SEGMENT }
            );
            let count = node.children.len();
            // Reverse so the first child is popped first
            for (i, child) in node.children.iter().enumerate().rev() {
                stack.push((child, child_prefix.clone(), i + 1 == count, depth + 1));
            }

            lines.push(TreeLine {
                prefix,
                connector: if is_last { LAST_CONNECTOR } else { MID_CONNECTOR },
                name: &node.name,
                pid: options.show_pids.then_some(node.pid),
                depth,
            });
        }
    }

    lines
}

/// Render the forest as plain text lines
pub fn render(forest: &Forest, options: &RenderOptions) -> Vec<String> {
    render_lines(forest, options)
        .iter()
        .map(ToString::to_string)
        .collect()
}

/// Render the forest as a single newline-terminated string
pub fn render_string(forest: &Forest, options: &RenderOptions) -> String {
    let mut out = String::new();
    for line in render_lines(forest, options) {
        out.push_str(&line.to_string());
        out.push('\n');
    }
    out
}
