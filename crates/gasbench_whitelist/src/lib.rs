//! # GASBENCH Merkle Whitelist
//!
//! Compact membership proofs for a fixed set of addresses, in the form the
//! collection's `mintWhitelist(bytes32[] proof)` checks on chain.
//!
//! ## Construction
//!
//! ```text
//!  leaves (sorted, unique):  L0    L1    L2    L3    L4
//!                             \    /      \    /     |
//!  level 1:                  H(L0,L1)   H(L2,L3)    L4     odd node carried
//!                                 \      /          |
//!  level 2:                       H(..)            L4
//!                                     \           /
//!  root:                               H(.., L4)
//! ```
//!
//! `H(a, b)` hashes the smaller child first, so verification never needs to
//! know which side a sibling was on.

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod artifact;
pub mod error;
pub mod generate;
pub mod leaf;
pub mod proof;
pub mod tree;
pub mod whitelist;

pub use alloy_primitives::{Address, B256};
pub use artifact::{ProofEntry, WhitelistArtifact};
pub use error::{WhitelistError, WhitelistResult};
pub use generate::generate_addresses;
pub use leaf::{hash_pair, leaf_hash, parse_address};
pub use proof::{verify, MerkleProof};
pub use tree::MerkleTree;
pub use whitelist::Whitelist;
