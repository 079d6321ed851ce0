//! # Transfer Events
//!
//! The `Transfer` log as the replay builder consumes it, and the parser that
//! produces it from raw topics.

use alloy_primitives::{Address, B256, U256};
use alloy_sol_types::SolEvent;

use crate::client::TokenId;
use crate::contracts::{u256_to_u64, Transfer};

/// A single ERC-721 `Transfer(from, to, tokenId)` log.
///
/// Chain order is `(block_number, log_index)`; see [`TransferEvent::position`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TransferEvent {
    /// Block where this occurred.
    pub block_number: u64,
    /// Log index within the block.
    pub log_index: u64,
    /// The token that moved.
    pub token_id: TokenId,
    /// Previous owner (zero for mints).
    pub from: Address,
    /// New owner (zero for burns).
    pub to: Address,
}

impl TransferEvent {
    /// Position of this event in chain history.
    #[inline]
    #[must_use]
    pub const fn position(&self) -> (u64, u64) {
        (self.block_number, self.log_index)
    }

    /// A mint: `from` is the zero address.
    #[inline]
    #[must_use]
    pub fn is_mint(&self) -> bool {
        self.from == Address::ZERO
    }

    /// A burn: `to` is the zero address.
    #[inline]
    #[must_use]
    pub fn is_burn(&self) -> bool {
        self.to == Address::ZERO
    }
}

/// Event parser for raw log data.
///
/// ERC-721 indexes all three `Transfer` arguments, so everything lives in
/// the topics and the data section is empty.
pub struct EventParser;

impl EventParser {
    /// Parses a Transfer event from raw log topics.
    ///
    /// # Returns
    ///
    /// `None` if the topics are not an ERC-721 `Transfer` (wrong signature,
    /// ERC-20 style three-topic layout, or a token id above `u64::MAX`).
    #[must_use]
    pub fn parse_transfer(topics: &[B256], block_number: u64, log_index: u64) -> Option<TransferEvent> {
        // Transfer has 4 topics: event sig, from, to, tokenId
        if topics.len() != 4 || topics[0] != Transfer::SIGNATURE_HASH {
            return None;
        }

        let from = Address::from_slice(&topics[1][12..32]);
        let to = Address::from_slice(&topics[2][12..32]);
        let token_id = u256_to_u64(U256::from_be_bytes(topics[3].0))?;

        Some(TransferEvent {
            block_number,
            log_index,
            token_id,
            from,
            to,
        })
    }

    /// Builds the topic list a node would attach to `event`.
    #[must_use]
    pub fn encode_topics(event: &TransferEvent) -> [B256; 4] {
        [
            Transfer::SIGNATURE_HASH,
            event.from.into_word(),
            event.to.into_word(),
            B256::from(U256::from(event.token_id).to_be_bytes::<32>()),
        ]
    }
}
