//! # Leaf and Node Hashing
//!
//! Must match the collection contract bit for bit:
//!
//! - leaf = `keccak256(abi.encodePacked(address))`
//! - node = `keccak256(min(a, b) ++ max(a, b))`

use std::str::FromStr;

use alloy_primitives::{keccak256, Address, B256};

use crate::error::{WhitelistError, WhitelistResult};

/// Parses a `0x`-prefixed hex address in any letter case.
///
/// # Errors
///
/// `InvalidAddress` with the trimmed input.
pub fn parse_address(text: &str) -> WhitelistResult<Address> {
    let text = text.trim();
    Address::from_str(text).map_err(|_| WhitelistError::InvalidAddress(text.to_string()))
}

/// Leaf hash for `address`: keccak256 of its 20 raw bytes.
#[inline]
#[must_use]
pub fn leaf_hash(address: &Address) -> B256 {
    keccak256(address.as_slice())
}

/// Parent of two nodes, smaller child first.
#[inline]
#[must_use]
pub fn hash_pair(a: &B256, b: &B256) -> B256 {
    let (low, high) = if a <= b { (a, b) } else { (b, a) };
    let mut buf = [0u8; 64];
    buf[..32].copy_from_slice(low.as_slice());
    buf[32..].copy_from_slice(high.as_slice());
    keccak256(buf)
}
