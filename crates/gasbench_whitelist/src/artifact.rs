//! # Whitelist Artifact
//!
//! What a mint frontend needs: the root handed to `setWhitelist` and the
//! proof each member passes to `mintWhitelist`.
//!
//! ```json
//! {
//!   "root": "0x...",
//!   "leaf_count": 1003,
//!   "proofs": [{ "address": "0x...", "leaf": "0x...", "proof": ["0x..."] }]
//! }
//! ```

use std::collections::BTreeSet;

use alloy_primitives::{Address, B256};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{WhitelistError, WhitelistResult};
use crate::leaf::leaf_hash;
use crate::proof::MerkleProof;
use crate::tree::MerkleTree;
use crate::whitelist::Whitelist;

/// One member's proof.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofEntry {
    /// The member.
    pub address: Address,
    /// `keccak256(address)`.
    pub leaf: B256,
    /// Siblings up to the root.
    pub proof: MerkleProof,
}

/// Root plus every member's proof, ordered by address.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WhitelistArtifact {
    /// Tree root.
    pub root: B256,
    /// Distinct leaves in the tree.
    pub leaf_count: usize,
    /// One entry per distinct member.
    pub proofs: Vec<ProofEntry>,
}

impl WhitelistArtifact {
    /// Builds the tree once and issues a proof for every member.
    ///
    /// # Errors
    ///
    /// `EmptyWhitelist` if there are no addresses.
    pub fn build(whitelist: &Whitelist) -> WhitelistResult<Self> {
        let tree = whitelist.tree()?;
        Self::from_tree(&tree, whitelist.addresses())
    }

    /// Issues proofs for `members` from an already built tree.
    ///
    /// # Errors
    ///
    /// `AddressNotInWhitelist` for a member the tree has no leaf for.
    pub fn from_tree<'a>(tree: &MerkleTree, members: impl IntoIterator<Item = &'a Address>) -> WhitelistResult<Self> {
        let members: BTreeSet<Address> = members.into_iter().copied().collect();
        let proofs = members
            .into_iter()
            .map(|address| {
                Ok(ProofEntry {
                    address,
                    leaf: leaf_hash(&address),
                    proof: tree.proof(&address)?,
                })
            })
            .collect::<WhitelistResult<Vec<_>>>()?;

        info!(root = %tree.root(), members = proofs.len(), depth = tree.depth(), "built whitelist artifact");
        Ok(Self {
            root: tree.root(),
            leaf_count: tree.leaf_count(),
            proofs,
        })
    }

    /// Entry for `address`, if it is a member.
    #[must_use]
    pub fn proof_for(&self, address: &Address) -> Option<&ProofEntry> {
        self.proofs
            .binary_search_by(|entry| entry.address.cmp(address))
            .ok()
            .map(|index| &self.proofs[index])
    }

    /// Re-checks every entry against `root`.
    ///
    /// # Errors
    ///
    /// `InvalidProof` for the first entry whose leaf or proof is wrong.
    pub fn verify_all(&self) -> WhitelistResult<()> {
        for entry in &self.proofs {
            let leaf = leaf_hash(&entry.address);
            if entry.leaf != leaf || !entry.proof.verify(leaf, self.root) {
                return Err(WhitelistError::InvalidProof {
                    address: entry.address,
                    root: self.root,
                });
            }
        }
        Ok(())
    }

    /// Pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// `Artifact` if serialization fails.
    pub fn to_json(&self) -> WhitelistResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parses an artifact written by [`to_json`](Self::to_json).
    ///
    /// # Errors
    ///
    /// `Artifact` for malformed JSON.
    pub fn from_json(text: &str) -> WhitelistResult<Self> {
        Ok(serde_json::from_str(text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn artifact() -> WhitelistArtifact {
        let whitelist: Whitelist = (1..=5u8).rev().map(Address::repeat_byte).collect();
        WhitelistArtifact::build(&whitelist).unwrap()
    }

    #[test]
    fn test_entries_sorted_and_verified() {
        let artifact = artifact();

        assert_eq!(artifact.leaf_count, 5);
        assert!(artifact.proofs.windows(2).all(|w| w[0].address < w[1].address));
        artifact.verify_all().unwrap();
        assert!(artifact.proof_for(&Address::repeat_byte(3)).is_some());
        assert!(artifact.proof_for(&Address::repeat_byte(9)).is_none());
    }

    #[test]
    fn test_json_round_trip_stays_valid() {
        let artifact = artifact();
        let json = artifact.to_json().unwrap();
        let parsed = WhitelistArtifact::from_json(&json).unwrap();

        assert_eq!(parsed, artifact);
        assert_eq!(parsed.to_json().unwrap(), json);
        parsed.verify_all().unwrap();
    }

    #[test]
    fn test_tampered_entry_is_caught() {
        let mut artifact = artifact();
        artifact.proofs[2].leaf = B256::ZERO;

        assert!(matches!(
            artifact.verify_all(),
            Err(WhitelistError::InvalidProof { .. })
        ));
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(
            WhitelistArtifact::from_json("{\"root\": 1}"),
            Err(WhitelistError::Artifact(_))
        ));
    }
}
