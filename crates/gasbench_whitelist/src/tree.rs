//! # Sorted-Pair Merkle Tree
//!
//! Leaves are sorted and de-duplicated before the first level is built, so
//! the same address set always yields the same tree regardless of input
//! order or repeats. An odd node at any level moves up unchanged.

use alloy_primitives::{Address, B256};
use tracing::debug;

use crate::error::{WhitelistError, WhitelistResult};
use crate::leaf::{hash_pair, leaf_hash};
use crate::proof::MerkleProof;

/// A built tree; all levels kept so proofs are lookups.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MerkleTree {
    /// `levels[0]` are the leaves, the last level holds only the root.
    levels: Vec<Vec<B256>>,
    root: B256,
}

impl MerkleTree {
    /// Builds the tree over the leaves of `addresses`.
    ///
    /// # Errors
    ///
    /// `EmptyWhitelist` if there are no addresses.
    pub fn from_addresses<'a>(addresses: impl IntoIterator<Item = &'a Address>) -> WhitelistResult<Self> {
        Self::from_leaves(addresses.into_iter().map(leaf_hash))
    }

    /// Builds the tree over precomputed leaf hashes.
    ///
    /// # Errors
    ///
    /// `EmptyWhitelist` if there are no leaves.
    pub fn from_leaves(leaves: impl IntoIterator<Item = B256>) -> WhitelistResult<Self> {
        let mut current: Vec<B256> = leaves.into_iter().collect();
        current.sort_unstable();
        current.dedup();
        if current.is_empty() {
            return Err(WhitelistError::EmptyWhitelist);
        }

        let mut levels = Vec::new();
        while current.len() > 1 {
            let next: Vec<B256> = current
                .chunks(2)
                .map(|pair| pair.get(1).map_or(pair[0], |right| hash_pair(&pair[0], right)))
                .collect();
            levels.push(std::mem::replace(&mut current, next));
        }
        let root = current[0];
        levels.push(current);

        debug!(leaves = levels[0].len(), depth = levels.len() - 1, %root, "built merkle tree");
        Ok(Self { levels, root })
    }

    /// The root, as stored by `setWhitelist(bytes32)`.
    #[inline]
    #[must_use]
    pub const fn root(&self) -> B256 {
        self.root
    }

    /// Number of distinct leaves.
    #[inline]
    #[must_use]
    pub fn leaf_count(&self) -> usize {
        self.levels[0].len()
    }

    /// Levels above the leaves; the length of the longest proof.
    #[inline]
    #[must_use]
    pub fn depth(&self) -> usize {
        self.levels.len() - 1
    }

    /// Sorted leaf hashes.
    #[must_use]
    pub fn leaves(&self) -> &[B256] {
        &self.levels[0]
    }

    /// Whether `address` has a leaf.
    #[must_use]
    pub fn contains(&self, address: &Address) -> bool {
        self.levels[0].binary_search(&leaf_hash(address)).is_ok()
    }

    /// Proof for `address`.
    ///
    /// # Errors
    ///
    /// `AddressNotInWhitelist` if no leaf matches.
    pub fn proof(&self, address: &Address) -> WhitelistResult<MerkleProof> {
        let mut index = self.levels[0]
            .binary_search(&leaf_hash(address))
            .map_err(|_| WhitelistError::AddressNotInWhitelist(*address))?;

        let mut siblings = Vec::with_capacity(self.depth());
        for level in &self.levels[..self.depth()] {
            if let Some(sibling) = level.get(index ^ 1) {
                siblings.push(*sibling);
            }
            index /= 2;
        }
        Ok(MerkleProof::new(siblings))
    }

    /// Checks `proof` for `address` against this tree's root.
    ///
    /// # Errors
    ///
    /// `InvalidProof` if the proof does not rebuild the root.
    pub fn verify_membership(&self, address: &Address, proof: &MerkleProof) -> WhitelistResult<()> {
        if proof.verify(leaf_hash(address), self.root) {
            Ok(())
        } else {
            Err(WhitelistError::InvalidProof {
                address: *address,
                root: self.root,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addresses(bytes: &[u8]) -> Vec<Address> {
        bytes.iter().map(|&b| Address::repeat_byte(b)).collect()
    }

    #[test]
    fn test_empty_is_rejected() {
        assert_eq!(
            MerkleTree::from_addresses(&Vec::new()),
            Err(WhitelistError::EmptyWhitelist)
        );
    }

    #[test]
    fn test_single_leaf_is_root() {
        let address = Address::repeat_byte(9);
        let tree = MerkleTree::from_addresses(&[address]).unwrap();

        assert_eq!(tree.root(), leaf_hash(&address));
        assert_eq!(tree.depth(), 0);
        assert!(tree.proof(&address).unwrap().is_empty());
    }

    #[test]
    fn test_two_leaves() {
        let list = addresses(&[1, 2]);
        let tree = MerkleTree::from_addresses(&list).unwrap();

        assert_eq!(tree.root(), hash_pair(&leaf_hash(&list[0]), &leaf_hash(&list[1])));
        assert_eq!(tree.proof(&list[0]).unwrap().as_slice(), &[leaf_hash(&list[1])]);
    }

    #[test]
    fn test_duplicates_collapse() {
        let once = MerkleTree::from_addresses(&addresses(&[1, 2, 3])).unwrap();
        let twice = MerkleTree::from_addresses(&addresses(&[3, 1, 2, 1, 3])).unwrap();

        assert_eq!(once, twice);
        assert_eq!(twice.leaf_count(), 3);
        assert!(twice.leaves().windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn test_every_proof_verifies() {
        let list = addresses(&[1, 2, 3, 4, 5, 6, 7]);
        let tree = MerkleTree::from_addresses(&list).unwrap();

        assert_eq!(tree.depth(), 3);
        for address in &list {
            let proof = tree.proof(address).unwrap();
            assert!(proof.len() <= tree.depth());
            tree.verify_membership(address, &proof).unwrap();
        }
    }

    #[test]
    fn test_wrong_address_fails_verification() {
        let list = addresses(&[1, 2, 3, 4]);
        let tree = MerkleTree::from_addresses(&list).unwrap();
        let proof = tree.proof(&list[0]).unwrap();

        assert_eq!(
            tree.verify_membership(&list[1], &proof),
            Err(WhitelistError::InvalidProof {
                address: list[1],
                root: tree.root()
            })
        );
    }

    #[test]
    fn test_outsider_has_no_proof() {
        let tree = MerkleTree::from_addresses(&addresses(&[1, 2])).unwrap();
        let outsider = Address::repeat_byte(0xee);

        assert!(!tree.contains(&outsider));
        assert_eq!(
            tree.proof(&outsider),
            Err(WhitelistError::AddressNotInWhitelist(outsider))
        );
    }
}
