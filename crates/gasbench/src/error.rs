//! # Harness Error Types

use gasbench_chain::{ChainError, LedgerError};
use gasbench_snapshot::{SerializeError, SnapshotError};
use gasbench_whitelist::WhitelistError;
use thiserror::Error;

/// Everything a harness task can fail with.
#[derive(Error, Debug)]
pub enum HarnessError {
    /// The config file or a CLI override is unusable.
    #[error("config error: {0}")]
    Config(String),

    /// Node setup or query failure outside a builder.
    #[error(transparent)]
    Chain(#[from] ChainError),

    /// A snapshot build aborted.
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),

    /// The ownership artifact could not be read or written.
    #[error(transparent)]
    Serialize(#[from] SerializeError),

    /// Whitelist construction or verification failed.
    #[error(transparent)]
    Whitelist(#[from] WhitelistError),

    /// A simulated transaction reverted.
    #[error("simulated ledger: {0}")]
    Ledger(#[from] LedgerError),

    /// The two builders disagree.
    #[error("builders disagree on {0} tokens")]
    Mismatch(usize),

    /// Filesystem failure.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for harness tasks.
pub type HarnessResult<T> = Result<T, HarnessError>;
