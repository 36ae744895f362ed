use std::marker::PhantomData;

use super::{
    digest::Digest,
    error::Result,
    hash::{sha256::Sha256, HashMethod},
    options::TreeOptions,
};

pub mod builder;
pub mod compare;
pub mod inspect;
mod walk;

use builder::TreeBuilder;
use compare::{TreeComparator, Verification};
use inspect::{Shape, TreeInspector};

/// Index of a node inside its tree's arena.
///
/// Leaves are allocated first, so for a leaf the id equals its input position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// One immutable node: a digest plus, for internal nodes, its two children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashNode {
    digest: Digest,
    children: Option<(NodeId, NodeId)>,
}

impl HashNode {
    pub(crate) fn leaf(digest: Digest) -> Self {
        Self {
            digest,
            children: None,
        }
    }

    pub(crate) fn internal(digest: Digest, left: NodeId, right: NodeId) -> Self {
        Self {
            digest,
            children: Some((left, right)),
        }
    }

    pub fn digest(&self) -> &Digest {
        &self.digest
    }

    pub fn children(&self) -> Option<(NodeId, NodeId)> {
        self.children
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_none()
    }
}

/// Flat node storage for a single tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Arena {
    pub(crate) nodes: Vec<HashNode>,
    pub(crate) leaves: usize,
}

impl Arena {
    pub(crate) fn get(&self, id: NodeId) -> &HashNode {
        &self.nodes[id.0]
    }

    pub(crate) fn push(&mut self, node: HashNode) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(node);
        id
    }
}

/// Borrowed handle to a node and the arena that holds its descendants.
///
/// Tagged with the tree's hash method, so nodes hashed differently cannot be compared.
pub struct NodeRef<'a, Method: HashMethod = Sha256> {
    arena: &'a Arena,
    id: NodeId,
    method: PhantomData<fn() -> Method>,
}

impl<Method: HashMethod> Clone for NodeRef<'_, Method> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<Method: HashMethod> Copy for NodeRef<'_, Method> {}

impl<'a, Method: HashMethod> NodeRef<'a, Method> {
    pub(crate) fn new(arena: &'a Arena, id: NodeId) -> Self {
        Self {
            arena,
            id,
            method: PhantomData,
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn node(&self) -> &'a HashNode {
        self.arena.get(self.id)
    }

    pub fn digest(&self) -> &'a Digest {
        &self.node().digest
    }

    pub fn is_leaf(&self) -> bool {
        self.node().is_leaf()
    }

    pub fn children(&self) -> Option<(Self, Self)> {
        self.node()
            .children
            .map(|(left, right)| (Self::new(self.arena, left), Self::new(self.arena, right)))
    }

    pub fn left(&self) -> Option<Self> {
        self.children().map(|(left, _)| left)
    }

    /// Input position of this node, if it is a leaf.
    pub fn leaf_index(&self) -> Option<usize> {
        (self.is_leaf() && self.id.0 < self.arena.leaves).then_some(self.id.0)
    }
}

impl<Method: HashMethod> std::fmt::Debug for NodeRef<'_, Method> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeRef")
            .field("id", &self.id)
            .field("digest", self.digest())
            .field("leaf", &self.is_leaf())
            .finish()
    }
}

impl<Method: HashMethod> PartialEq for NodeRef<'_, Method> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.arena, other.arena) && self.id == other.id
    }
}

impl<Method: HashMethod> Eq for NodeRef<'_, Method> {}

/// An immutable binary Merkle tree stored as an arena.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MerkleTree<Method: HashMethod = Sha256> {
    pub(crate) arena: Arena,
    pub(crate) root: NodeId,
    shape: Shape,
    method: PhantomData<Method>,
}

impl<Method: HashMethod> MerkleTree<Method> {
    pub(crate) fn new(arena: Arena, root: NodeId) -> Self {
        let shape = NodeRef::<Method>::new(&arena, root).shape();
        Self {
            arena,
            root,
            shape,
            method: PhantomData,
        }
    }

    /// Build a tree from raw leaf data with default options.
    pub fn from_leaves_data<T: AsRef<[u8]> + Sync>(leaves: &[T]) -> Result<Self> {
        TreeBuilder::<Method>::new(TreeOptions::default()).build(leaves)
    }

    /// Build a tree from already-hashed leaves with default options.
    pub fn from_leaves_hashes(leaves: Vec<Digest>) -> Result<Self> {
        TreeBuilder::<Method>::new(TreeOptions::default()).build_from_hashes(leaves)
    }

    pub fn root(&self) -> NodeRef<'_, Method> {
        NodeRef::new(&self.arena, self.root)
    }

    pub fn root_digest(&self) -> &Digest {
        self.arena.get(self.root).digest()
    }

    /// Root digest as `0x`-prefixed hex.
    pub fn root_hex(&self) -> String {
        format!("0x{}", self.root_digest().to_hex())
    }

    /// Number of input items, including any discarded by `OddNodePolicy::Drop`.
    pub fn leaf_count(&self) -> usize {
        self.arena.leaves
    }

    /// Leaves in input order.
    pub fn leaves(&self) -> impl Iterator<Item = NodeRef<'_, Method>> {
        (0..self.arena.leaves).map(|i| NodeRef::new(&self.arena, NodeId(i)))
    }

    pub fn node(&self, id: NodeId) -> Option<NodeRef<'_, Method>> {
        (id.0 < self.arena.nodes.len()).then(|| NodeRef::new(&self.arena, id))
    }

    /// Distinct nodes held in the arena.
    pub fn arena_len(&self) -> usize {
        self.arena.nodes.len()
    }

    /// Compare this tree (the candidate) against a previously built `reference`.
    pub fn verify_against(
        &self,
        reference: &MerkleTree<Method>,
        deep: bool,
    ) -> Verification<'_, Method> {
        self.verify(reference, deep)
    }
}
