//! Post-construction annotation passes built on the decoration chain.

use crate::error::TreeError;
use crate::node::NodeId;
use crate::tree::Tree;

/// Length of the path label from the root to the lower end of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathLength(pub usize);

/// Decorate every node except the root with its [`PathLength`].
///
/// Running it again after more insertions pushes fresh values in front of the
/// stale ones; [`crate::Decoration::find`] returns the newest.
pub fn annotate_path_lengths(tree: &mut Tree) -> Result<(), TreeError> {
    let root = tree.root();
    let visits: Vec<(NodeId, usize)> = tree
        .depth_first()
        .filter(|visit| visit.node != root)
        .map(|visit| (visit.node, visit.depth))
        .collect();
    for (node, depth) in visits {
        tree.decorate(node, PathLength(depth))?;
    }
    Ok(())
}
