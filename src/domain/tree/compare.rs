use itertools::Itertools;
use log::debug;
use std::ops::ControlFlow;

use super::{inspect::TreeInspector, walk::walk_pairs, NodeRef};
use crate::domain::hash::{sha256::Sha256, HashMethod};

/// Outcome of comparing a candidate tree against a reference tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verification<'a, Method: HashMethod = Sha256> {
    pub matches: bool,
    /// Candidate leaves whose digest differs from the reference, in leaf order.
    /// Always empty for shallow comparisons and shape mismatches.
    pub divergent_leaves: Vec<NodeRef<'a, Method>>,
}

impl<Method: HashMethod> Verification<'_, Method> {
    fn mismatch() -> Self {
        Self {
            matches: false,
            divergent_leaves: Vec::new(),
        }
    }

    /// Input positions of the divergent leaves.
    pub fn divergent_indices(&self) -> Vec<usize> {
        self.divergent_leaves
            .iter()
            .filter_map(NodeRef::leaf_index)
            .collect()
    }
}

/// Comparison of two trees built over similar inputs.
pub trait TreeComparator: TreeInspector {
    /// Compare `self` (the candidate) against `reference`.
    ///
    /// Both trees must use the same [`HashMethod`]; digests from different methods are
    /// never comparable, so mixing them does not compile:
    ///
    /// ```compile_fail
    /// use merkle_diff::{MerkleTree, Sha256, Sha256Tagged, TreeComparator};
    ///
    /// let items = [b"a".to_vec(), b"b".to_vec()];
    /// let plain = MerkleTree::<Sha256>::from_leaves_data(&items).unwrap();
    /// let tagged = MerkleTree::<Sha256Tagged>::from_leaves_data(&items).unwrap();
    /// plain.verify(&tagged, true);
    /// ```
    ///
    /// Trees of different shape (logical node count or number of distinct leaves)
    /// never match and are not diffed. A shallow comparison (`deep = false`) only
    /// looks at the root digests. A deep comparison walks both trees together, skips
    /// every subtree whose digests agree, and reports each candidate leaf that
    /// differs, so several independent changes are all found. A leaf facing an
    /// internal node mid-walk is treated like a shape mismatch.
    fn verify<R>(&self, reference: &R, deep: bool) -> Verification<'_, Self::Method>
    where
        R: TreeInspector<Method = Self::Method> + ?Sized,
    {
        let (candidate_shape, reference_shape) = (self.shape(), reference.shape());
        if candidate_shape != reference_shape {
            debug!(
                "Shape mismatch: candidate has {} nodes over {} leaves, reference has {} over {}",
                candidate_shape.nodes,
                candidate_shape.leaves,
                reference_shape.nodes,
                reference_shape.leaves
            );
            return Verification::mismatch();
        }
        verify_nodes(self.root_node(), reference.root_node(), deep)
    }
}

impl<T: TreeInspector + ?Sized> TreeComparator for T {}

/// Compares two roots of equal shape.
fn verify_nodes<'c, M: HashMethod>(
    candidate: NodeRef<'c, M>,
    reference: NodeRef<'_, M>,
    deep: bool,
) -> Verification<'c, M> {
    if !deep {
        return Verification {
            matches: candidate.digest() == reference.digest(),
            divergent_leaves: Vec::new(),
        };
    }

    let mut divergent = Vec::new();
    let flow = walk_pairs((reference, candidate), |old, new, work| {
        if old.digest() == new.digest() {
            return ControlFlow::Continue(());
        }
        match (old.children(), new.children()) {
            (Some((old_left, old_right)), Some((new_left, new_right))) => {
                work.push_children((old_left, new_left), (old_right, new_right));
                ControlFlow::Continue(())
            }
            (None, None) => {
                divergent.push(new);
                ControlFlow::Continue(())
            }
            _ => ControlFlow::Break(new.id()),
        }
    });

    if let ControlFlow::Break(at) = flow {
        debug!("Shape mismatch at candidate node {}", at.index());
        return Verification::mismatch();
    }

    // A duplicated leaf is reached through both of its parent's slots.
    let divergent_leaves: Vec<NodeRef<'c, M>> = divergent
        .into_iter()
        .sorted_by_key(NodeRef::id)
        .dedup()
        .collect();
    debug!("Deep comparison found {} divergent leaves", divergent_leaves.len());

    Verification {
        matches: divergent_leaves.is_empty(),
        divergent_leaves,
    }
}
