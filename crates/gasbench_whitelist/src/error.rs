//! # Whitelist Error Types

use alloy_primitives::{Address, B256};
use thiserror::Error;

/// Whitelist engine errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WhitelistError {
    /// A tree needs at least one leaf.
    #[error("whitelist is empty")]
    EmptyWhitelist,

    /// No leaf matches the address.
    #[error("address {0} is not in the whitelist")]
    AddressNotInWhitelist(Address),

    /// The proof does not rebuild the root.
    #[error("proof for {address} does not reproduce root {root}")]
    InvalidProof {
        /// The claimed member.
        address: Address,
        /// The root checked against.
        root: B256,
    },

    /// Input text is not a 20-byte hex address.
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// The JSON artifact could not be read or written.
    #[error("artifact error: {0}")]
    Artifact(String),
}

impl From<serde_json::Error> for WhitelistError {
    fn from(e: serde_json::Error) -> Self {
        Self::Artifact(e.to_string())
    }
}

/// Result type for whitelist operations.
pub type WhitelistResult<T> = Result<T, WhitelistError>;
