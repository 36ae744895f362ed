use thiserror::Error;

/// Errors raised while building or inspecting a Merkle tree.
///
/// A shape mismatch between two compared trees is deliberately not an error;
/// see [`TreeComparator::verify`](crate::TreeComparator::verify).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MerkleError {
    /// No input items were supplied, so there is no root.
    #[error("cannot build a Merkle tree from zero leaves")]
    EmptyInput,

    /// A leaf sits at a different distance from the root than the leftmost leaf.
    #[error("unbalanced tree: leftmost leaf at depth {expected}, another leaf at depth {found}")]
    UnbalancedTree {
        /// Depth measured along the leftmost spine.
        expected: usize,
        /// Depth of the first leaf that disagrees.
        found: usize,
    },

    /// A level handed to the builder names a node outside its current arena,
    /// typically one left over from an earlier `build_leaves` call.
    #[error("unknown node {id}: builder arena holds {arena_len} nodes")]
    UnknownNode { id: usize, arena_len: usize },

    /// Raw bytes could not be turned into a digest.
    #[error("invalid digest length: expected {expected} bytes, got {actual}")]
    InvalidDigestLength { expected: usize, actual: usize },
}

pub type Result<T> = std::result::Result<T, MerkleError>;
