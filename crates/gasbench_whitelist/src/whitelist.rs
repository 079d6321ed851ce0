//! # Whitelist Input
//!
//! The ordered address list as supplied. Duplicates are kept here and only
//! collapse once the tree is built.

use alloy_primitives::Address;

use crate::error::WhitelistResult;
use crate::generate::generate_addresses;
use crate::leaf::parse_address;
use crate::tree::MerkleTree;

/// Addresses eligible for the whitelist mint, in input order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Whitelist {
    addresses: Vec<Address>,
}

impl Whitelist {
    /// Wraps an address list.
    #[must_use]
    pub const fn new(addresses: Vec<Address>) -> Self {
        Self { addresses }
    }

    /// Parses one address per line. Blank lines and `#` comments are ignored.
    ///
    /// # Errors
    ///
    /// `InvalidAddress` for the first line that is not an address.
    pub fn parse(text: &str) -> WhitelistResult<Self> {
        text.lines()
            .map(|line| line.split('#').next().unwrap_or_default().trim())
            .filter(|line| !line.is_empty())
            .map(parse_address)
            .collect::<WhitelistResult<Vec<_>>>()
            .map(Self::new)
    }

    /// Appends `count` seeded synthetic addresses.
    pub fn extend_generated(&mut self, count: usize, seed: u64) {
        self.addresses.extend(generate_addresses(count, seed));
    }

    /// Input addresses, duplicates included.
    #[must_use]
    pub fn addresses(&self) -> &[Address] {
        &self.addresses
    }

    /// Number of input entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.addresses.len()
    }

    /// Whether no addresses were supplied.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }

    /// Builds the tree.
    ///
    /// # Errors
    ///
    /// `EmptyWhitelist` if no addresses were supplied.
    pub fn tree(&self) -> WhitelistResult<MerkleTree> {
        MerkleTree::from_addresses(&self.addresses)
    }
}

impl FromIterator<Address> for Whitelist {
    fn from_iter<I: IntoIterator<Item = Address>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl Extend<Address> for Whitelist {
    fn extend<I: IntoIterator<Item = Address>>(&mut self, iter: I) {
        self.addresses.extend(iter);
    }
}
