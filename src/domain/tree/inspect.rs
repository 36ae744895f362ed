use super::{MerkleTree, NodeRef};
use crate::domain::{
    error::{MerkleError, Result},
    hash::HashMethod,
};

/// Size of the logical tree under a root.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shape {
    /// Nodes of the logical tree; a node referenced twice counts twice.
    pub nodes: usize,
    /// Distinct leaves reachable from the root, i.e. inputs the root commits to.
    pub leaves: usize,
}

/// Structural metrics of a tree, measured from its root.
///
/// Levels are numbered from the root (level 0) down to the leaves (level `depth`),
/// and level `l` of a balanced tree holds `2^l` nodes. A node referenced twice by
/// its parent (see [`OddNodePolicy::Duplicate`](crate::OddNodePolicy::Duplicate))
/// counts twice: the metrics describe the logical tree, not the arena.
pub trait TreeInspector {
    type Method: HashMethod;

    fn root_node(&self) -> NodeRef<'_, Self::Method>;

    /// Length of the leftmost spine, once every leaf is confirmed to sit at that depth.
    fn depth(&self) -> Result<usize> {
        let root = self.root_node();
        let expected = spine_depth(root);

        let mut stack = vec![(root, 0usize)];
        while let Some((node, depth)) = stack.pop() {
            match node.children() {
                Some((left, right)) => {
                    stack.push((left, depth + 1));
                    if right.id() != left.id() {
                        stack.push((right, depth + 1));
                    }
                }
                None if depth != expected => {
                    return Err(MerkleError::UnbalancedTree {
                        expected,
                        found: depth,
                    });
                }
                None => {}
            }
        }
        Ok(expected)
    }

    /// `2^(depth + 1) - 1` for a balanced tree.
    fn node_count(&self) -> Result<usize> {
        let depth = self.depth()?;
        // depth is bounded by log2 of the arena size, so this cannot overflow
        Ok(2usize.pow(depth as u32 + 1) - 1)
    }

    /// `2^level` for `level <= depth`, zero below the leaves.
    fn node_count_at_level(&self, level: usize) -> Result<usize> {
        let depth = self.depth()?;
        if level > depth {
            Ok(0)
        } else {
            Ok(1usize << level)
        }
    }

    /// Walks the tree; works on unbalanced trees too.
    fn shape(&self) -> Shape {
        walk_shape(self.root_node())
    }

    fn total_nodes(&self) -> usize {
        self.shape().nodes
    }
}

fn spine_depth<M: HashMethod>(mut node: NodeRef<'_, M>) -> usize {
    let mut depth = 0;
    while let Some(left) = node.left() {
        depth += 1;
        node = left;
    }
    depth
}

// Sharing only happens through a parent whose two slots hold the same node, so
// pushing that child once with doubled weight visits every arena node once.
fn walk_shape<M: HashMethod>(root: NodeRef<'_, M>) -> Shape {
    let mut shape = Shape {
        nodes: 0,
        leaves: 0,
    };
    let mut stack = vec![(root, 1usize)];
    while let Some((node, weight)) = stack.pop() {
        shape.nodes += weight;
        match node.children() {
            Some((left, right)) if left.id() == right.id() => stack.push((left, weight * 2)),
            Some((left, right)) => {
                stack.push((left, weight));
                stack.push((right, weight));
            }
            None => shape.leaves += 1,
        }
    }
    shape
}

impl<Method: HashMethod> TreeInspector for NodeRef<'_, Method> {
    type Method = Method;

    fn root_node(&self) -> NodeRef<'_, Method> {
        *self
    }
}

impl<Method: HashMethod> TreeInspector for MerkleTree<Method> {
    type Method = Method;

    fn root_node(&self) -> NodeRef<'_, Method> {
        self.root()
    }

    /// Computed once when the tree is built.
    fn shape(&self) -> Shape {
        self.shape
    }
}
