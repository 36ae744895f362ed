#![deny(clippy::all)]

//! Binary Merkle trees with leaf-level divergence detection.
//!
//! Build a tree from an ordered list of byte items, inspect its shape, and
//! compare it against another tree to find exactly which leaves changed.

pub mod domain;

pub use domain::{
    digest::{Digest, DIGEST_LEN},
    error::{MerkleError, Result},
    hash::{
        sha256::{Sha256, Sha256Tagged},
        HashMethod,
    },
    options::{OddNodePolicy, TreeOptions},
    tree::{
        builder::TreeBuilder,
        compare::{TreeComparator, Verification},
        inspect::{Shape, TreeInspector},
        HashNode, MerkleTree, NodeId, NodeRef,
    },
};
