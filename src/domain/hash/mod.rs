use super::digest::Digest;

pub mod sha256;

/// Hash strategy shared by every node of one tree.
pub trait HashMethod {
    /// Hash a leaf's raw data.
    fn hash_leaf(data: &[u8]) -> Digest;

    /// Hash two child digests together, left first.
    fn hash_nodes(left: &Digest, right: &Digest) -> Digest;
}
