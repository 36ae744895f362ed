use itertools::Itertools;
use log::{debug, trace, warn};
use rayon::prelude::*;
use std::marker::PhantomData;
use std::time::Instant;

use super::{Arena, HashNode, MerkleTree, NodeId};
use crate::domain::{
    digest::Digest,
    error::{MerkleError, Result},
    hash::{sha256::Sha256, HashMethod},
    options::{OddNodePolicy, TreeOptions},
};

/// Builds a [`MerkleTree`] bottom-up, one level at a time.
///
/// The builder owns the arena of the tree currently under construction.
/// [`build_leaves`](Self::build_leaves) starts a new arena, [`build_parents`](Self::build_parents)
/// folds one level into the next, and [`build`](Self::build) runs both until a
/// single root remains and hands the arena over to the finished tree.
#[derive(Debug)]
pub struct TreeBuilder<Method: HashMethod = Sha256> {
    options: TreeOptions,
    arena: Arena,
    method: PhantomData<Method>,
}

impl<Method: HashMethod> Default for TreeBuilder<Method> {
    fn default() -> Self {
        Self::new(TreeOptions::default())
    }
}

impl<Method: HashMethod> TreeBuilder<Method> {
    pub fn new(options: TreeOptions) -> Self {
        Self {
            options,
            arena: Arena::default(),
            method: PhantomData,
        }
    }

    pub fn options(&self) -> &TreeOptions {
        &self.options
    }

    /// Look up a node of the tree under construction.
    pub fn node(&self, id: NodeId) -> Option<&HashNode> {
        self.arena.nodes.get(id.0)
    }

    /// Hash every item into a leaf, preserving input order.
    ///
    /// Discards any partially built tree; the returned ids are `0..items.len()`.
    pub fn build_leaves<T: AsRef<[u8]> + Sync>(&mut self, items: &[T]) -> Vec<NodeId> {
        let digests: Vec<Digest> = if self.options.runs_parallel(items.len()) {
            items
                .par_iter()
                .map(|item| Method::hash_leaf(item.as_ref()))
                .collect()
        } else {
            items
                .iter()
                .map(|item| Method::hash_leaf(item.as_ref()))
                .collect()
        };
        self.start_leaves(digests)
    }

    fn start_leaves(&mut self, digests: Vec<Digest>) -> Vec<NodeId> {
        self.arena = Arena {
            nodes: Vec::with_capacity(2 * digests.len()),
            leaves: digests.len(),
        };
        digests
            .into_iter()
            .map(|digest| self.arena.push(HashNode::leaf(digest)))
            .collect()
    }

    /// Combine `level` pairwise into the next level up.
    ///
    /// A trailing unpaired node is handled per [`OddNodePolicy`]. Every id must
    /// come from the arena started by the latest `build_leaves` call; ids from an
    /// earlier arena that fall outside the current one are rejected with
    /// [`MerkleError::UnknownNode`].
    pub fn build_parents(&mut self, level: &[NodeId]) -> Result<Vec<NodeId>> {
        let arena_len = self.arena.nodes.len();
        if let Some(unknown) = level.iter().find(|id| id.0 >= arena_len) {
            return Err(MerkleError::UnknownNode {
                id: unknown.0,
                arena_len,
            });
        }

        let (paired, trailing) = match level.split_last() {
            Some((last, rest)) if level.len() % 2 == 1 => (rest, Some(*last)),
            _ => (level, None),
        };

        let mut pairs: Vec<(NodeId, NodeId)> = paired.iter().copied().tuples().collect();
        let mut promoted = None;
        match (trailing, self.options.odd_node_policy) {
            (None, _) => {}
            (Some(last), OddNodePolicy::Duplicate) => pairs.push((last, last)),
            (Some(last), OddNodePolicy::Promote) => promoted = Some(last),
            (Some(last), OddNodePolicy::Drop) => {
                warn!(
                    "Dropping unpaired node {} ({}) from a level of {} nodes",
                    last.0,
                    self.arena.get(last).digest(),
                    level.len()
                );
            }
        }

        let digests = self.hash_pairs(&pairs);
        let mut parents: Vec<NodeId> = pairs
            .into_iter()
            .zip(digests)
            .map(|((left, right), digest)| self.arena.push(HashNode::internal(digest, left, right)))
            .collect();
        parents.extend(promoted);
        Ok(parents)
    }

    fn hash_pairs(&self, pairs: &[(NodeId, NodeId)]) -> Vec<Digest> {
        let arena = &self.arena;
        let hash = |&(left, right): &(NodeId, NodeId)| {
            Method::hash_nodes(arena.get(left).digest(), arena.get(right).digest())
        };
        if self.options.runs_parallel(pairs.len()) {
            pairs.par_iter().map(hash).collect()
        } else {
            pairs.iter().map(hash).collect()
        }
    }

    /// Build a complete tree from raw items.
    pub fn build<T: AsRef<[u8]> + Sync>(&mut self, items: &[T]) -> Result<MerkleTree<Method>> {
        if items.is_empty() {
            return Err(MerkleError::EmptyInput);
        }
        let start = Instant::now();
        let leaves = self.build_leaves(items);
        debug!("Hashing {} leaves took {:?}", leaves.len(), start.elapsed());
        self.fold(leaves, start)
    }

    /// Build a complete tree from leaf digests computed elsewhere.
    pub fn build_from_hashes(&mut self, leaves: Vec<Digest>) -> Result<MerkleTree<Method>> {
        if leaves.is_empty() {
            return Err(MerkleError::EmptyInput);
        }
        let start = Instant::now();
        let leaves = self.start_leaves(leaves);
        self.fold(leaves, start)
    }

    fn fold(&mut self, mut level: Vec<NodeId>, start: Instant) -> Result<MerkleTree<Method>> {
        while level.len() > 1 {
            level = self.build_parents(&level)?;
            trace!("Folded level into {} nodes", level.len());
        }
        let root = level.first().copied().ok_or(MerkleError::EmptyInput)?;

        let tree = MerkleTree::new(std::mem::take(&mut self.arena), root);
        debug!(
            "Built tree over {} leaves ({} nodes) in {:?}, root {}",
            tree.leaf_count(),
            tree.arena_len(),
            start.elapsed(),
            tree.root_digest()
        );
        Ok(tree)
    }
}

#[cfg(test)]
mod tests {
    use crate::domain::{
        digest::Digest,
        error::MerkleError,
        hash::{
            sha256::{Sha256, Sha256Tagged},
            HashMethod,
        },
        options::{OddNodePolicy, TreeOptions},
        tree::{builder::TreeBuilder, MerkleTree, NodeRef},
    };
    use rand::Rng;

    fn init_logger() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn h(data: &[u8]) -> Digest {
        Sha256::hash_leaf(data)
    }

    fn hn(left: &Digest, right: &Digest) -> Digest {
        Sha256::hash_nodes(left, right)
    }

    fn builder(policy: OddNodePolicy) -> TreeBuilder<Sha256> {
        TreeBuilder::new(TreeOptions::default().with_odd_node_policy(policy))
    }

    // Recompute every internal digest from its children.
    fn assert_well_formed<M: HashMethod>(root: NodeRef<'_, M>) {
        let mut stack = vec![root];
        while let Some(node) = stack.pop() {
            if let Some((left, right)) = node.children() {
                assert_eq!(
                    node.digest(),
                    &M::hash_nodes(left.digest(), right.digest()),
                    "Internal node {:?} does not combine its children",
                    node.id()
                );
                stack.push(left);
                stack.push(right);
            }
        }
    }

    fn generate_random_leaves(count: usize) -> Vec<Vec<u8>> {
        let mut rng = rand::rng();
        (0..count)
            .map(|_| {
                let len = rng.random_range(1..50);
                (0..len).map(|_| rng.random()).collect()
            })
            .collect()
    }

    #[test]
    fn test_empty_leaves_error() {
        let leaves: Vec<Vec<u8>> = vec![];
        let result = TreeBuilder::<Sha256>::default().build(&leaves);
        assert_eq!(
            result.unwrap_err(),
            MerkleError::EmptyInput,
            "Building a tree from empty leaves must return an error"
        );

        let hashes = TreeBuilder::<Sha256>::default().build_from_hashes(vec![]);
        assert_eq!(hashes.unwrap_err(), MerkleError::EmptyInput);
    }

    #[test]
    fn test_build_leaves_empty_and_ordered() {
        let mut builder = TreeBuilder::<Sha256>::default();
        let none: Vec<&[u8]> = vec![];
        assert!(builder.build_leaves(&none).is_empty());

        let ids = builder.build_leaves(&[b"one", b"two", b"six"]);
        assert_eq!(ids.iter().map(|id| id.index()).collect::<Vec<_>>(), vec![0, 1, 2]);
        assert_eq!(builder.node(ids[1]).unwrap().digest(), &h(b"two"));
        assert!(builder.node(ids[2]).unwrap().is_leaf());
    }

    #[test]
    fn test_single_leaf_tree() {
        let tree = MerkleTree::<Sha256>::from_leaves_data(&[b"only_leaf"])
            .expect("Should build a single-leaf tree successfully");
        assert!(tree.root().is_leaf(), "Single leaf must be its own root");
        assert_eq!(tree.root_digest(), &h(b"only_leaf"));
        assert_eq!(tree.arena_len(), 1);
    }

    #[test]
    fn test_four_leaves_correct_root() {
        init_logger();
        let leaves = [b"leaf0", b"leaf1", b"leaf2", b"leaf3"];
        let tree =
            MerkleTree::<Sha256>::from_leaves_data(&leaves).expect("Tree creation must succeed");

        let expected = hn(
            &hn(&h(b"leaf0"), &h(b"leaf1")),
            &hn(&h(b"leaf2"), &h(b"leaf3")),
        );
        assert_eq!(tree.root_digest(), &expected);
        assert_eq!(tree.arena_len(), 7);
        assert_well_formed::<Sha256>(tree.root());
    }

    #[test]
    fn test_build_parents_pairs_in_order() {
        let mut builder = builder(OddNodePolicy::Duplicate);
        let leaves = builder.build_leaves(&[b"a", b"b", b"c", b"d"]);
        let parents = builder.build_parents(&leaves).expect("Ids come from this arena");

        assert_eq!(parents.len(), 2);
        let first = builder.node(parents[0]).unwrap();
        assert_eq!(first.children(), Some((leaves[0], leaves[1])));
        assert_eq!(first.digest(), &hn(&h(b"a"), &h(b"b")));
        let second = builder.node(parents[1]).unwrap();
        assert_eq!(second.children(), Some((leaves[2], leaves[3])));
    }

    #[test]
    fn test_stale_level_is_rejected() {
        let mut builder = builder(OddNodePolicy::Duplicate);
        let stale = builder.build_leaves(&[b"a", b"b", b"c", b"d"]);
        let fresh = builder.build_leaves(&[b"x"]);

        assert_eq!(
            builder.build_parents(&stale),
            Err(MerkleError::UnknownNode {
                id: 1,
                arena_len: 1
            }),
            "Ids from a discarded arena must be rejected, not indexed"
        );
        assert_eq!(builder.node(fresh[0]).unwrap().digest(), &h(b"x"));

        let parents = builder.build_parents(&fresh).unwrap();
        assert_eq!(parents.len(), 1);
        assert_eq!(builder.node(parents[0]).unwrap().children(), Some((fresh[0], fresh[0])));
    }

    #[test]
    fn test_odd_level_duplicate() {
        let tree = builder(OddNodePolicy::Duplicate)
            .build(&[b"a", b"b", b"c"])
            .unwrap();
        let expected = hn(&hn(&h(b"a"), &h(b"b")), &hn(&h(b"c"), &h(b"c")));
        assert_eq!(tree.root_digest(), &expected);

        let (_, right) = tree.root().children().unwrap();
        let (dup_left, dup_right) = right.children().unwrap();
        assert_eq!(dup_left, dup_right, "Duplicated node is referenced twice, not copied");
        assert_eq!(tree.arena_len(), 6);
        assert_well_formed::<Sha256>(tree.root());
    }

    #[test]
    fn test_odd_level_promote() {
        let tree = builder(OddNodePolicy::Promote)
            .build(&[b"a", b"b", b"c"])
            .unwrap();
        let expected = hn(&hn(&h(b"a"), &h(b"b")), &h(b"c"));
        assert_eq!(tree.root_digest(), &expected);

        let (_, right) = tree.root().children().unwrap();
        assert_eq!(right.leaf_index(), Some(2), "Promoted leaf keeps its position");
        assert_eq!(tree.arena_len(), 5);
    }

    #[test]
    fn test_odd_level_drop() {
        init_logger();
        let three = builder(OddNodePolicy::Drop)
            .build(&[b"a", b"b", b"c"])
            .unwrap();
        assert_eq!(three.root_digest(), &hn(&h(b"a"), &h(b"b")));
        assert_eq!(three.leaf_count(), 3, "Dropped items still count as input");

        let five = builder(OddNodePolicy::Drop)
            .build(&[b"a", b"b", b"c", b"d", b"e"])
            .unwrap();
        let four = builder(OddNodePolicy::Drop)
            .build(&[b"a", b"b", b"c", b"d"])
            .unwrap();
        assert_eq!(
            five.root_digest(),
            four.root_digest(),
            "Trailing dropped item must not affect the root"
        );
    }

    #[test]
    fn test_policies_agree_on_power_of_two() {
        let leaves = generate_random_leaves(16);
        let roots: Vec<Digest> = [
            OddNodePolicy::Duplicate,
            OddNodePolicy::Promote,
            OddNodePolicy::Drop,
        ]
        .into_iter()
        .map(|policy| *builder(policy).build(&leaves).unwrap().root_digest())
        .collect();
        assert!(roots.iter().all(|root| root == &roots[0]));
    }

    #[test]
    fn test_root_depends_on_value_and_position() {
        let base = [b"w".to_vec(), b"x".to_vec(), b"y".to_vec(), b"z".to_vec()];
        let root = *MerkleTree::<Sha256>::from_leaves_data(&base).unwrap().root_digest();

        for i in 0..base.len() {
            let mut changed = base.clone();
            changed[i].push(b'!');
            let other = MerkleTree::<Sha256>::from_leaves_data(&changed).unwrap();
            assert_ne!(other.root_digest(), &root, "Changing item {i} must change the root");
        }

        let mut swapped = base.clone();
        swapped.swap(1, 2);
        let other = MerkleTree::<Sha256>::from_leaves_data(&swapped).unwrap();
        assert_ne!(other.root_digest(), &root, "Swapping items must change the root");
    }

    #[test]
    fn test_rebuild_is_identical_but_distinct() {
        let leaves = generate_random_leaves(13);
        let first = MerkleTree::<Sha256>::from_leaves_data(&leaves).unwrap();
        let second = MerkleTree::<Sha256>::from_leaves_data(&leaves).unwrap();

        assert_eq!(first, second, "Digests must match at every arena position");
        assert!(!std::ptr::eq(first.root().node(), second.root().node()));
    }

    #[test]
    fn test_parallel_matches_sequential() {
        init_logger();
        for size in [2, 5, 33, 1500] {
            let leaves = generate_random_leaves(size);
            let sequential = TreeOptions::default().with_parallel(false);
            let parallel = TreeOptions::default().with_parallel_threshold(1);

            let sequential = TreeBuilder::<Sha256>::new(sequential).build(&leaves).unwrap();
            let parallel = TreeBuilder::<Sha256>::new(parallel).build(&leaves).unwrap();
            assert_eq!(sequential, parallel, "Parallel build diverged for {size} leaves");
        }
    }

    #[test]
    fn test_from_leaves_hashes_matches_data() {
        let raw: Vec<Vec<u8>> = generate_random_leaves(9);
        let hashed: Vec<Digest> = raw.iter().map(|l| Sha256Tagged::hash_leaf(l)).collect();

        let from_data = MerkleTree::<Sha256Tagged>::from_leaves_data(&raw).unwrap();
        let from_hashes = MerkleTree::<Sha256Tagged>::from_leaves_hashes(hashed).unwrap();
        assert_eq!(from_data, from_hashes);
        assert_well_formed::<Sha256Tagged>(from_hashes.root());
    }

    #[test]
    fn test_builder_is_reusable() {
        let mut builder = TreeBuilder::<Sha256>::default();
        let first = builder.build(&[b"p", b"q"]).unwrap();
        let second = builder.build(&[b"p", b"q"]).unwrap();
        assert_eq!(first, second);
        assert_eq!(second.arena_len(), 3, "Second build must not inherit nodes");
    }

    #[test]
    fn test_random_sizes_are_well_formed() {
        for size in [1, 2, 3, 7, 16, 33] {
            let leaves = generate_random_leaves(size);
            for policy in [OddNodePolicy::Duplicate, OddNodePolicy::Promote, OddNodePolicy::Drop] {
                let tree = builder(policy).build(&leaves).unwrap();
                assert_well_formed::<Sha256>(tree.root());
            }
        }
    }
}
