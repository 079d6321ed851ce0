//! # Chain Query Contract
//!
//! The reads every ownership reconstruction is built from.

use std::future::Future;

use alloy_primitives::Address;

use crate::error::ChainResult;
use crate::events::TransferEvent;

/// Token identifier within a single collection.
pub type TokenId = u64;

/// Read access to a single ERC-721 collection.
///
/// Implementations surface exactly one typed failure per attempt and never
/// retry internally. Builders take the client as a generic parameter, so any
/// implementation (JSON-RPC, simulated, retrying wrapper) can be injected.
///
/// Point reads take `at_block`; `None` reads the latest state.
pub trait ChainQuery: Send + Sync {
    /// Latest block number.
    ///
    /// # Errors
    ///
    /// `Transient` on network trouble, `Malformed` on a bad quantity.
    fn block_number(&self) -> impl Future<Output = ChainResult<u64>> + Send;

    /// Number of live tokens in the collection at `at_block`.
    ///
    /// # Errors
    ///
    /// `Transient` on network trouble, `Fatal` if the call reverts.
    fn total_supply_at(&self, at_block: Option<u64>) -> impl Future<Output = ChainResult<u64>> + Send;

    /// Owner of `token_id` at `at_block`.
    ///
    /// # Errors
    ///
    /// `TokenNotFound` if the token was not minted yet or had been burned.
    fn owner_of_at(
        &self,
        token_id: TokenId,
        at_block: Option<u64>,
    ) -> impl Future<Output = ChainResult<Address>> + Send;

    /// All `Transfer` events in `[from_block, to_block]`, ascending by
    /// `(block_number, log_index)`.
    ///
    /// `to_block = None` means the latest block known at call time.
    ///
    /// # Errors
    ///
    /// Any page failing fails the whole call.
    fn transfer_events(
        &self,
        from_block: u64,
        to_block: Option<u64>,
    ) -> impl Future<Output = ChainResult<Vec<TransferEvent>>> + Send;

    /// Number of live tokens in the collection now.
    ///
    /// # Errors
    ///
    /// As [`ChainQuery::total_supply_at`].
    fn total_supply(&self) -> impl Future<Output = ChainResult<u64>> + Send {
        self.total_supply_at(None)
    }

    /// Current owner of `token_id`.
    ///
    /// # Errors
    ///
    /// As [`ChainQuery::owner_of_at`].
    fn owner_of(&self, token_id: TokenId) -> impl Future<Output = ChainResult<Address>> + Send {
        self.owner_of_at(token_id, None)
    }
}

impl<C: ChainQuery> ChainQuery for &C {
    fn block_number(&self) -> impl Future<Output = ChainResult<u64>> + Send {
        (**self).block_number()
    }

    fn total_supply_at(&self, at_block: Option<u64>) -> impl Future<Output = ChainResult<u64>> + Send {
        (**self).total_supply_at(at_block)
    }

    fn owner_of_at(
        &self,
        token_id: TokenId,
        at_block: Option<u64>,
    ) -> impl Future<Output = ChainResult<Address>> + Send {
        (**self).owner_of_at(token_id, at_block)
    }

    fn transfer_events(
        &self,
        from_block: u64,
        to_block: Option<u64>,
    ) -> impl Future<Output = ChainResult<Vec<TransferEvent>>> + Send {
        (**self).transfer_events(from_block, to_block)
    }
}
