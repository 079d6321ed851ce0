//! # Snapshot Error Types

use gasbench_chain::{ChainError, TokenId};
use thiserror::Error;

/// Errors that abort a snapshot build.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SnapshotError {
    /// A query failed mid-build; nothing was returned.
    #[error("{}", describe_reconstruction(.operation, .token_id, .cause))]
    ReconstructionFailed {
        /// The operation that failed, e.g. `ownerOf` or `transferEvents[0..=latest]`.
        operation: String,
        /// The token being resolved, when the failure is per token.
        token_id: Option<TokenId>,
        /// The underlying chain failure.
        cause: ChainError,
    },

    /// Builder configuration cannot describe a valid run.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

fn describe_reconstruction(operation: &str, token_id: &Option<TokenId>, cause: &ChainError) -> String {
    match token_id {
        Some(token_id) => format!("reconstruction failed: {operation} for token {token_id}: {cause}"),
        None => format!("reconstruction failed: {operation}: {cause}"),
    }
}

impl SnapshotError {
    /// Wraps a chain failure with the operation and token that hit it.
    #[must_use]
    pub fn reconstruction(operation: impl Into<String>, token_id: Option<TokenId>, cause: ChainError) -> Self {
        Self::ReconstructionFailed {
            operation: operation.into(),
            token_id,
            cause,
        }
    }

    /// Whether re-running the whole build might succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::ReconstructionFailed { cause, .. } => cause.is_retryable(),
            Self::InvalidConfig(_) => false,
        }
    }
}

/// Result type for snapshot builds.
pub type SnapshotResult<T> = Result<T, SnapshotError>;

/// Errors reading or writing the text artifact.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SerializeError {
    /// A line is not `<tokenId> <address>`.
    #[error("line {line}: {reason}")]
    MalformedLine {
        /// 1-based line number.
        line: usize,
        /// What was wrong.
        reason: String,
    },

    /// The same token id appears twice.
    #[error("line {line}: duplicate token {token_id}")]
    DuplicateToken {
        /// 1-based line number of the second occurrence.
        line: usize,
        /// The repeated id.
        token_id: TokenId,
    },

    /// Token ids are not ascending.
    #[error("line {line}: token ids are not ascending")]
    Unsorted {
        /// 1-based line number of the first out-of-order id.
        line: usize,
    },

    /// Filesystem failure.
    #[error("io error: {0}")]
    Io(String),
}

impl From<std::io::Error> for SerializeError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}

/// Result type for artifact I/O.
pub type SerializeResult<T> = Result<T, SerializeError>;
