//! # Merkle Proofs

use alloy_primitives::{hex, B256};
use serde::{Deserialize, Serialize};

use crate::leaf::hash_pair;

/// Sibling hashes from a leaf up to the root.
///
/// Serializes as a plain JSON array of `0x` hashes.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MerkleProof(Vec<B256>);

impl MerkleProof {
    /// Wraps sibling hashes, bottom-up.
    #[must_use]
    pub const fn new(siblings: Vec<B256>) -> Self {
        Self(siblings)
    }

    /// Number of siblings.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True for the proof of a single-leaf tree.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Sibling hashes, bottom-up.
    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[B256] {
        &self.0
    }

    /// `0x`-prefixed hex per sibling, the `bytes32[]` argument of `mintWhitelist`.
    #[must_use]
    pub fn to_hex(&self) -> Vec<String> {
        self.0.iter().map(hex::encode_prefixed).collect()
    }

    /// Root this proof rebuilds from `leaf`.
    #[must_use]
    pub fn compute_root(&self, leaf: B256) -> B256 {
        self.0.iter().fold(leaf, |node, sibling| hash_pair(&node, sibling))
    }

    /// Whether this proof rebuilds `root` from `leaf`.
    #[must_use]
    pub fn verify(&self, leaf: B256, root: B256) -> bool {
        self.compute_root(leaf) == root
    }
}

impl From<Vec<B256>> for MerkleProof {
    fn from(siblings: Vec<B256>) -> Self {
        Self(siblings)
    }
}

/// Free-standing check, same fold as the contract's `MerkleProof.verify`.
#[must_use]
pub fn verify(proof: &[B256], leaf: B256, root: B256) -> bool {
    proof.iter().fold(leaf, |node, sibling| hash_pair(&node, sibling)) == root
}
