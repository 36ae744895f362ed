use super::HashMethod;
use crate::domain::digest::{Digest, DIGEST_LEN};
use sha2::{digest::FixedOutput, Digest as _};

const LEAF_PREFIX: u8 = 0x00;
const NODE_PREFIX: u8 = 0x01;

fn finish(hasher: sha2::Sha256) -> Digest {
    let mut bytes = [0u8; DIGEST_LEN];
    bytes.copy_from_slice(&hasher.finalize_fixed());
    Digest::new(bytes)
}

/// Plain SHA-256: `H(data)` for leaves, `H(left ++ right)` for nodes.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Sha256;

impl HashMethod for Sha256 {
    fn hash_leaf(data: &[u8]) -> Digest {
        let mut hasher = sha2::Sha256::new();
        hasher.update(data);
        finish(hasher)
    }

    fn hash_nodes(left: &Digest, right: &Digest) -> Digest {
        let mut hasher = sha2::Sha256::new();
        hasher.update(left.as_bytes());
        hasher.update(right.as_bytes());
        finish(hasher)
    }
}

/// SHA-256 with RFC 6962 domain separation, so a leaf digest can never be
/// replayed as an internal node.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Sha256Tagged;

impl HashMethod for Sha256Tagged {
    fn hash_leaf(data: &[u8]) -> Digest {
        let mut hasher = sha2::Sha256::new();
        hasher.update([LEAF_PREFIX]);
        hasher.update(data);
        finish(hasher)
    }

    fn hash_nodes(left: &Digest, right: &Digest) -> Digest {
        let mut hasher = sha2::Sha256::new();
        hasher.update([NODE_PREFIX]);
        hasher.update(left.as_bytes());
        hasher.update(right.as_bytes());
        finish(hasher)
    }
}
