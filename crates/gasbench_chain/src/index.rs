//! # Owner Index
//!
//! Token ids held by each address, kept in ascending order.

use std::collections::{BTreeSet, HashMap};

use alloy_primitives::Address;

use crate::client::TokenId;

/// Reverse lookup from owner to the ordered set of tokens it holds.
///
/// - O(1) lookup by owner
/// - O(log n) insertion and removal by token id
/// - Owners with no tokens are dropped, so `owner_count` is the number of
///   distinct current holders
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OwnerIndex {
    tokens: HashMap<Address, BTreeSet<TokenId>>,
}

impl OwnerIndex {
    /// Records that `owner` holds `token_id`.
    ///
    /// Returns `false` if the pair was already present.
    pub fn insert(&mut self, owner: Address, token_id: TokenId) -> bool {
        self.tokens.entry(owner).or_default().insert(token_id)
    }

    /// Forgets that `owner` holds `token_id`.
    ///
    /// Returns `false` if the pair was not present.
    pub fn remove(&mut self, owner: &Address, token_id: TokenId) -> bool {
        let Some(held) = self.tokens.get_mut(owner) else {
            return false;
        };
        let removed = held.remove(&token_id);
        if held.is_empty() {
            self.tokens.remove(owner);
        }
        removed
    }

    /// Moves `token_id` from `from` to `to`.
    pub fn move_token(&mut self, from: &Address, to: Address, token_id: TokenId) {
        self.remove(from, token_id);
        self.insert(to, token_id);
    }

    /// Tokens held by `owner`, ascending.
    pub fn tokens_of(&self, owner: &Address) -> impl Iterator<Item = TokenId> + '_ {
        self.tokens.get(owner).into_iter().flatten().copied()
    }

    /// Number of tokens held by `owner`.
    #[must_use]
    pub fn balance_of(&self, owner: &Address) -> usize {
        self.tokens.get(owner).map_or(0, BTreeSet::len)
    }

    /// Number of distinct holders.
    #[must_use]
    pub fn owner_count(&self) -> usize {
        self.tokens.len()
    }

    /// Holders sorted ascending, for deterministic reporting.
    #[must_use]
    pub fn owners(&self) -> Vec<Address> {
        let mut owners: Vec<Address> = self.tokens.keys().copied().collect();
        owners.sort_unstable();
        owners
    }
}

impl FromIterator<(TokenId, Address)> for OwnerIndex {
    fn from_iter<I: IntoIterator<Item = (TokenId, Address)>>(iter: I) -> Self {
        let mut index = Self::default();
        for (token_id, owner) in iter {
            index.insert(owner, token_id);
        }
        index
    }
}
