//! # Ownership Snapshot
//!
//! Complete token → owner mapping at one point in chain history.

use std::collections::{BTreeMap, BTreeSet};

use alloy_primitives::Address;
use gasbench_chain::{OwnerIndex, TokenId};

/// Every live token and its owner, ordered by token id.
///
/// Only builders and the artifact parser construct snapshots; once handed
/// out a snapshot is never mutated.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OwnershipSnapshot {
    owners: BTreeMap<TokenId, Address>,
}

impl OwnershipSnapshot {
    pub(crate) fn from_map(owners: BTreeMap<TokenId, Address>) -> Self {
        Self { owners }
    }

    /// Number of tokens in the snapshot.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.owners.len()
    }

    /// Whether the collection had no live tokens.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }

    /// Owner of `token_id`, if it is live in this snapshot.
    #[inline]
    #[must_use]
    pub fn owner_of(&self, token_id: TokenId) -> Option<Address> {
        self.owners.get(&token_id).copied()
    }

    /// `(token_id, owner)` pairs, ascending by id.
    pub fn iter(&self) -> impl Iterator<Item = (TokenId, Address)> + '_ {
        self.owners.iter().map(|(&token_id, &owner)| (token_id, owner))
    }

    /// Token ids, ascending.
    pub fn token_ids(&self) -> impl Iterator<Item = TokenId> + '_ {
        self.owners.keys().copied()
    }

    /// Lowest and highest live token id.
    #[must_use]
    pub fn id_range(&self) -> Option<(TokenId, TokenId)> {
        let first = *self.owners.keys().next()?;
        let last = *self.owners.keys().next_back()?;
        Some((first, last))
    }

    /// Reverse index from owner to held tokens.
    #[must_use]
    pub fn owner_index(&self) -> OwnerIndex {
        self.iter().collect()
    }

    /// Every token on which `self` and `other` disagree, ascending by id.
    #[must_use]
    pub fn diff(&self, other: &Self) -> Vec<Discrepancy> {
        let ids: BTreeSet<TokenId> = self.owners.keys().chain(other.owners.keys()).copied().collect();
        ids.into_iter()
            .filter_map(|token_id| match (self.owner_of(token_id), other.owner_of(token_id)) {
                (Some(left), Some(right)) if left == right => None,
                (Some(left), Some(right)) => Some(Discrepancy::OwnerMismatch { token_id, left, right }),
                (Some(owner), None) => Some(Discrepancy::OnlyLeft { token_id, owner }),
                (None, Some(owner)) => Some(Discrepancy::OnlyRight { token_id, owner }),
                (None, None) => None,
            })
            .collect()
    }
}

/// One token on which two snapshots disagree.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Discrepancy {
    /// Present only in the left snapshot.
    OnlyLeft {
        /// The token.
        token_id: TokenId,
        /// Its owner on the left.
        owner: Address,
    },
    /// Present only in the right snapshot.
    OnlyRight {
        /// The token.
        token_id: TokenId,
        /// Its owner on the right.
        owner: Address,
    },
    /// Present in both with different owners.
    OwnerMismatch {
        /// The token.
        token_id: TokenId,
        /// Owner on the left.
        left: Address,
        /// Owner on the right.
        right: Address,
    },
}

impl Discrepancy {
    /// The token this discrepancy is about.
    #[must_use]
    pub const fn token_id(&self) -> TokenId {
        match self {
            Self::OnlyLeft { token_id, .. }
            | Self::OnlyRight { token_id, .. }
            | Self::OwnerMismatch { token_id, .. } => *token_id,
        }
    }
}
