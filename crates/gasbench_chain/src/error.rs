//! # Chain Error Types
//!
//! All errors that can surface from a single ledger query.

use alloy_primitives::Address;
use thiserror::Error;

use crate::client::TokenId;

/// Errors that can occur while querying the remote ledger.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChainError {
    /// Network failure, timeout or rate limiting. Safe to retry.
    #[error("transient rpc error: {0}")]
    Transient(String),

    /// Misconfiguration or a revert unrelated to token existence.
    #[error("fatal query error: {0}")]
    Fatal(String),

    /// `ownerOf` was asked about a token that does not exist.
    #[error("token {0} does not exist")]
    TokenNotFound(TokenId),

    /// The endpoint answered with something we could not decode.
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl ChainError {
    /// Whether a caller-supplied retry policy may try the same call again.
    #[inline]
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

/// Result type for chain queries.
pub type ChainResult<T> = Result<T, ChainError>;

/// Errors raised by the simulated collection when a mutation would revert.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// Transfer attempted by an address that does not own the token.
    #[error("token {token_id} is owned by {actual}, not {claimed}")]
    NotOwner {
        /// The token being moved.
        token_id: TokenId,
        /// The address that claimed ownership.
        claimed: Address,
        /// The actual owner.
        actual: Address,
    },

    /// The token was never minted or has been burned.
    #[error("token {0} does not exist")]
    NonexistentToken(TokenId),

    /// Mints and transfers to the zero address are rejected; use burn.
    #[error("cannot transfer to the zero address")]
    ZeroAddress,

    /// Mint quantity of zero.
    #[error("mint quantity must be positive")]
    EmptyMint,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_transient_is_retryable() {
        assert!(ChainError::Transient("timeout".into()).is_retryable());
        assert!(!ChainError::Fatal("revert".into()).is_retryable());
        assert!(!ChainError::TokenNotFound(7).is_retryable());
        assert!(!ChainError::Malformed("bad hex".into()).is_retryable());
    }

    #[test]
    fn test_messages_carry_context() {
        assert_eq!(ChainError::TokenNotFound(42).to_string(), "token 42 does not exist");
    }
}
