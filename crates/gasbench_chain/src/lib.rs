//! # GASBENCH Chain Boundary
//!
//! Everything the ownership and whitelist tooling needs from a remote ledger.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐   eth_call    ┌─────────────────┐
//! │  ERC-721        │ ◀──────────── │  RpcClient      │
//! │  Contract       │   eth_getLogs │  (ChainQuery)   │
//! └─────────────────┘ ────────────▶ └────────┬────────┘
//!                                            │
//!                         ┌──────────────────┼──────────────────┐
//!                         ▼                  ▼                  ▼
//!                  Retrying<C>        Snapshot builders   SimulatedLedger
//!                  (retry policy)     (any ChainQuery)    (in-memory)
//! ```
//!
//! ## Failure Contract
//!
//! - Every call returns one typed [`ChainError`] per attempt.
//! - Retries are never performed here; wrap a client in [`Retrying`] instead.

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod client;
pub mod contracts;
pub mod error;
pub mod events;
pub mod index;
pub mod retry;
pub mod rpc;
pub mod simulated;

pub use alloy_primitives::{Address, B256, U256};
pub use client::{ChainQuery, TokenId};
pub use error::{ChainError, ChainResult, LedgerError};
pub use events::{EventParser, TransferEvent};
pub use index::OwnerIndex;
pub use retry::{RetryPolicy, Retrying};
pub use rpc::{RpcClient, RpcConfig};
pub use simulated::SimulatedLedger;
