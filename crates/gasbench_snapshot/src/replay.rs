//! # Event-Replay Snapshot Builder
//!
//! Reconstructs ownership from the `Transfer` history alone: one logical log
//! fetch instead of one call per token.

use std::collections::BTreeMap;

use gasbench_chain::{ChainQuery, TransferEvent};
use tracing::info;

use crate::error::{SnapshotError, SnapshotResult};
use crate::snapshot::OwnershipSnapshot;

/// Replays `events` with last-writer-wins per token.
///
/// Events are stably sorted by `(block_number, log_index)` first, so callers
/// may pass pages in any order. A transfer to the zero address is a burn and
/// removes the token.
#[must_use]
pub fn replay_events(mut events: Vec<TransferEvent>) -> OwnershipSnapshot {
    events.sort_by_key(TransferEvent::position);

    let mut owners = BTreeMap::new();
    for event in &events {
        if event.is_burn() {
            owners.remove(&event.token_id);
        } else {
            owners.insert(event.token_id, event.to);
        }
    }
    OwnershipSnapshot::from_map(owners)
}

/// Block range for the history fetch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReplayConfig {
    /// First block to scan. Zero scans from genesis.
    pub from_block: u64,
    /// Last block to scan. `None` means latest at fetch time.
    pub to_block: Option<u64>,
}

impl ReplayConfig {
    /// Starts the scan at the collection's deployment block.
    #[must_use]
    pub const fn with_from_block(mut self, block: u64) -> Self {
        self.from_block = block;
        self
    }

    /// Pins the snapshot to `block`.
    #[must_use]
    pub const fn with_to_block(mut self, block: u64) -> Self {
        self.to_block = Some(block);
        self
    }

    fn describe(&self) -> String {
        match self.to_block {
            Some(to) => format!("transferEvents[{}..={to}]", self.from_block),
            None => format!("transferEvents[{}..=latest]", self.from_block),
        }
    }
}

/// Builds a snapshot from the full Transfer history.
pub struct EventReplayBuilder<'a, C> {
    client: &'a C,
    config: ReplayConfig,
}

impl<'a, C: ChainQuery> EventReplayBuilder<'a, C> {
    /// Creates a builder over `client`.
    #[must_use]
    pub const fn new(client: &'a C, config: ReplayConfig) -> Self {
        Self { client, config }
    }

    /// Runs the build.
    ///
    /// # Errors
    ///
    /// `ReconstructionFailed` with the block range if the history fetch
    /// fails; a partial history is never replayed.
    pub async fn build(&self) -> SnapshotResult<OwnershipSnapshot> {
        let events = self
            .client
            .transfer_events(self.config.from_block, self.config.to_block)
            .await
            .map_err(|cause| SnapshotError::reconstruction(self.config.describe(), None, cause))?;

        let event_count = events.len();
        let snapshot = replay_events(events);
        info!(events = event_count, live_tokens = snapshot.len(), "replayed transfer history");
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gasbench_chain::{Address, ChainError, SimulatedLedger};

    fn event(block_number: u64, log_index: u64, token_id: u64, from: u8, to: u8) -> TransferEvent {
        let addr = |byte: u8| if byte == 0 { Address::ZERO } else { Address::repeat_byte(byte) };
        TransferEvent {
            block_number,
            log_index,
            token_id,
            from: addr(from),
            to: addr(to),
        }
    }

    #[test]
    fn test_last_writer_wins() {
        let snapshot = replay_events(vec![
            event(1, 0, 1, 0, 1),
            event(1, 1, 2, 0, 1),
            event(3, 0, 1, 1, 2),
            event(4, 0, 1, 2, 3),
        ]);

        assert_eq!(snapshot.owner_of(1), Some(Address::repeat_byte(3)));
        assert_eq!(snapshot.owner_of(2), Some(Address::repeat_byte(1)));
    }

    #[test]
    fn test_out_of_order_pages_are_sorted() {
        let snapshot = replay_events(vec![
            event(9, 0, 1, 2, 3),
            event(1, 0, 1, 0, 1),
            event(5, 2, 1, 1, 2),
        ]);

        assert_eq!(snapshot.owner_of(1), Some(Address::repeat_byte(3)));
    }

    #[test]
    fn test_log_index_breaks_ties_within_block() {
        let snapshot = replay_events(vec![event(7, 1, 4, 1, 2), event(7, 0, 4, 0, 1)]);
        assert_eq!(snapshot.owner_of(4), Some(Address::repeat_byte(2)));
    }

    #[test]
    fn test_burn_removes_token() {
        let snapshot = replay_events(vec![event(1, 0, 1, 0, 1), event(1, 1, 2, 0, 1), event(2, 0, 2, 1, 0)]);

        assert_eq!(snapshot.token_ids().collect::<Vec<_>>(), vec![1]);
    }

    #[tokio::test]
    async fn test_builder_replays_ledger() {
        let ledger = SimulatedLedger::new(1);
        let alice = Address::repeat_byte(0xa1);
        let bob = Address::repeat_byte(0xb0);
        ledger.mint(alice, 3).unwrap();
        ledger.transfer(alice, bob, 2).unwrap();

        let snapshot = EventReplayBuilder::new(&ledger, ReplayConfig::default())
            .build()
            .await
            .unwrap();

        assert_eq!(snapshot.iter().collect::<Vec<_>>(), vec![(1, alice), (2, bob), (3, alice)]);
    }

    #[tokio::test]
    async fn test_pinned_block_ignores_later_history() {
        let ledger = SimulatedLedger::new(1);
        let alice = Address::repeat_byte(0xa1);
        ledger.mint(alice, 1).unwrap();
        let pinned = ledger.block_number();
        ledger.transfer(alice, Address::repeat_byte(0xb0), 1).unwrap();

        let config = ReplayConfig::default().with_to_block(pinned);
        let snapshot = EventReplayBuilder::new(&ledger, config).build().await.unwrap();

        assert_eq!(snapshot.owner_of(1), Some(alice));
    }

    #[tokio::test]
    async fn test_fetch_failure_aborts() {
        let ledger = SimulatedLedger::new(1);
        ledger.mint(Address::repeat_byte(1), 2).unwrap();
        ledger.fail_transfer_events(ChainError::Transient("query timeout".into()), 1);

        let err = EventReplayBuilder::new(&ledger, ReplayConfig::default())
            .build()
            .await
            .unwrap_err();

        assert!(err.is_retryable());
        assert!(err.to_string().contains("transferEvents[0..=latest]"));
    }
}
