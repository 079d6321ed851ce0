//! Both builders must agree on the same ledger.

use gasbench_chain::{Address, ChainError, SimulatedLedger, TokenId};
use gasbench_snapshot::serialize::render;
use gasbench_snapshot::{
    DirectQueryBuilder, DirectQueryConfig, EventReplayBuilder, IdOrigin, OwnershipSnapshot, ReplayConfig,
    SnapshotError,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

fn holders(count: u8) -> Vec<Address> {
    (1..=count).map(Address::repeat_byte).collect()
}

/// Mints `per_holder` to each holder, then shuffles tokens between them.
fn busy_ledger(first_token_id: TokenId, per_holder: u64, transfers: usize, seed: u64) -> SimulatedLedger {
    let ledger = SimulatedLedger::new(first_token_id);
    let holders = holders(6);
    for holder in &holders {
        ledger.mint(*holder, per_holder).unwrap();
    }

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let live: Vec<(TokenId, Address)> = ledger.live_tokens();
    for _ in 0..transfers {
        let (token_id, _) = live[rng.gen_range(0..live.len())];
        let from = ledger
            .live_tokens()
            .into_iter()
            .find(|&(id, _)| id == token_id)
            .map(|(_, owner)| owner)
            .unwrap();
        let to = holders[rng.gen_range(0..holders.len())];
        ledger.transfer(from, to, token_id).unwrap();
    }
    ledger
}

async fn direct(ledger: &SimulatedLedger, batch_size: usize) -> Result<OwnershipSnapshot, SnapshotError> {
    let config = DirectQueryConfig::default().with_batch_size(batch_size);
    DirectQueryBuilder::new(ledger, config)?.build().await
}

async fn replay(ledger: &SimulatedLedger) -> OwnershipSnapshot {
    EventReplayBuilder::new(ledger, ReplayConfig::default())
        .build()
        .await
        .unwrap()
}

#[tokio::test]
async fn test_builders_render_identically() {
    let ledger = busy_ledger(1, 40, 300, 0x5eed);

    let by_query = direct(&ledger, 17).await.unwrap();
    let by_events = replay(&ledger).await;

    assert_eq!(by_query.len(), 240);
    assert!(by_query.diff(&by_events).is_empty());
    assert_eq!(render(&by_query), render(&by_events));
}

#[tokio::test]
async fn test_zero_based_collection_agrees() {
    let ledger = busy_ledger(0, 10, 50, 7);

    let by_query = direct(&ledger, 500).await.unwrap();
    let by_events = replay(&ledger).await;

    assert_eq!(by_query.id_range(), Some((0, 59)));
    assert_eq!(render(&by_query), render(&by_events));
}

#[tokio::test]
async fn test_owner_index_matches_ledger() {
    let ledger = busy_ledger(1, 25, 120, 42);

    let snapshot = replay(&ledger).await;
    let index = snapshot.owner_index();

    for holder in holders(6) {
        assert_eq!(index.tokens_of(&holder).collect::<Vec<_>>(), ledger.tokens_of(&holder));
    }
}

#[tokio::test]
async fn test_burn_is_excluded_by_replay_and_fails_direct() {
    let ledger = busy_ledger(1, 5, 10, 3);
    ledger.burn(4).unwrap();

    let by_events = replay(&ledger).await;
    assert_eq!(by_events.len(), 29);
    assert_eq!(by_events.owner_of(4), None);

    let err = direct(&ledger, 8).await.unwrap_err();
    assert!(matches!(
        err,
        SnapshotError::ReconstructionFailed {
            cause: ChainError::TokenNotFound(_),
            ..
        }
    ));
}

#[tokio::test]
async fn test_pinned_origin_skips_probe() {
    let ledger = busy_ledger(1, 3, 0, 1);
    let config = DirectQueryConfig::default().with_id_origin(IdOrigin::OneBased);

    let snapshot = DirectQueryBuilder::new(&ledger, config)
        .unwrap()
        .build()
        .await
        .unwrap();

    assert_eq!(snapshot.len(), 18);
    assert_eq!(ledger.owner_of_calls(), 18);
}
