//! Sibling ordering

use crate::models::{Forest, ProcessNode, SortMode};

/// Reorder siblings throughout the forest
///
/// `NumericByPid` sorts every child list, and the top-level roots, ascending by
/// PID. PIDs are unique, so the order is total and applying it twice changes
/// nothing. `Insertion` keeps the builder's order.
pub fn sort_siblings(forest: &mut Forest, mode: SortMode) {
    match mode {
        SortMode::Insertion => {}
        SortMode::NumericByPid => {
            forest.roots.sort_by_key(|node| node.pid);
            let mut stack: Vec<&mut ProcessNode> = forest.roots.iter_mut().collect();
            while let Some(node) = stack.pop() {
                node.children.sort_by_key(|child| child.pid);
                stack.extend(node.children.iter_mut());
            }
        }
    }
}
