//! # Contract Definitions
//!
//! Solidity ABIs for the benchmarked collections, plus calldata helpers.

// The sol! macro generates code that we can't document, so allow missing_docs
#![allow(missing_docs)]

use alloy_primitives::{Address, B256, U256};
use alloy_sol_types::{sol, SolCall};

use crate::client::TokenId;
use crate::error::{ChainError, ChainResult};

sol! {
    /// The surface shared by every benchmarked ERC-721 variant.
    ///
    /// `setWhitelist` / `mintWhitelist` only exist on the Merkle whitelist
    /// variant; the proof is checked on-chain against the stored root.
    #[derive(Debug)]
    interface IWhitelistCollection {
        /// Emitted on every mint, transfer and burn.
        event Transfer(
            address indexed from,
            address indexed to,
            uint256 indexed tokenId
        );

        /// Number of live tokens.
        function totalSupply() external view returns (uint256);

        /// Owner of a token. Reverts for nonexistent tokens.
        function ownerOf(uint256 tokenId) external view returns (address);

        /// Stores the Merkle root of the whitelist.
        function setWhitelist(bytes32 root) external;

        /// Mints if `proof` proves `msg.sender` against the stored root.
        function mintWhitelist(bytes32[] calldata proof) external payable;
    }
}

pub use IWhitelistCollection::Transfer;

/// Calldata for `totalSupply()`.
#[must_use]
pub fn encode_total_supply() -> Vec<u8> {
    IWhitelistCollection::totalSupplyCall {}.abi_encode()
}

/// Calldata for `ownerOf(tokenId)`.
#[must_use]
pub fn encode_owner_of(token_id: TokenId) -> Vec<u8> {
    IWhitelistCollection::ownerOfCall {
        tokenId: U256::from(token_id),
    }
    .abi_encode()
}

/// Calldata for `setWhitelist(root)`.
#[must_use]
pub fn encode_set_whitelist(root: B256) -> Vec<u8> {
    IWhitelistCollection::setWhitelistCall { root }.abi_encode()
}

/// Calldata for `mintWhitelist(proof)`.
#[must_use]
pub fn encode_mint_whitelist(proof: &[B256]) -> Vec<u8> {
    IWhitelistCollection::mintWhitelistCall {
        proof: proof.to_vec(),
    }
    .abi_encode()
}

/// Decodes the return data of `totalSupply()`.
///
/// # Errors
///
/// `Malformed` if the data is not a single word or exceeds `u64`.
pub fn decode_total_supply(data: &[u8]) -> ChainResult<u64> {
    let ret = IWhitelistCollection::totalSupplyCall::abi_decode_returns(data, true)
        .map_err(|e| ChainError::Malformed(format!("totalSupply: {e}")))?;
    u256_to_u64(ret._0).ok_or_else(|| ChainError::Malformed(format!("totalSupply {} exceeds u64", ret._0)))
}

/// Decodes the return data of `ownerOf(tokenId)`.
///
/// # Errors
///
/// `Malformed` if the data is not an ABI-encoded address.
pub fn decode_owner_of(data: &[u8]) -> ChainResult<Address> {
    IWhitelistCollection::ownerOfCall::abi_decode_returns(data, true)
        .map(|ret| ret._0)
        .map_err(|e| ChainError::Malformed(format!("ownerOf: {e}")))
}

/// Narrows a `uint256` to `u64`, returning `None` if any high limb is set.
#[inline]
#[must_use]
pub fn u256_to_u64(value: U256) -> Option<u64> {
    let limbs = value.as_limbs();
    if limbs[1..].iter().any(|limb| *limb != 0) {
        None
    } else {
        Some(limbs[0])
    }
}
