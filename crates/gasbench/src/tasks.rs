//! # Harness Tasks
//!
//! One function per subcommand, generic over [`ChainQuery`] so the same
//! code runs against a node or a [`SimulatedLedger`].

use std::path::Path;

use alloy_primitives::Bytes;
use crossbeam_channel::Sender;
use futures::future::join;
use gasbench_chain::contracts::encode_set_whitelist;
use gasbench_chain::{Address, ChainError, ChainQuery, SimulatedLedger, TokenId};
use gasbench_snapshot::{
    Discrepancy, DirectQueryBuilder, DirectQueryConfig, EventReplayBuilder, OwnershipSnapshot, Progress,
    ReplayConfig, SnapshotError,
};
use gasbench_whitelist::{generate_addresses, Whitelist, WhitelistArtifact};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{info, warn};

use crate::error::{HarnessError, HarnessResult};

/// `owners-direct`: one `ownerOf` per token in bounded batches.
///
/// # Errors
///
/// Any builder failure.
pub async fn owners_direct<C: ChainQuery>(
    client: &C,
    config: DirectQueryConfig,
    progress: Option<Sender<Progress>>,
) -> HarnessResult<OwnershipSnapshot> {
    let mut builder = DirectQueryBuilder::new(client, config)?;
    if let Some(sender) = progress {
        builder = builder.with_progress(sender);
    }
    Ok(builder.build().await?)
}

/// `owners-replay`: last-writer-wins over the Transfer history.
///
/// # Errors
///
/// Any builder failure.
pub async fn owners_replay<C: ChainQuery>(client: &C, config: ReplayConfig) -> HarnessResult<OwnershipSnapshot> {
    Ok(EventReplayBuilder::new(client, config).build().await?)
}

/// Both snapshots of one collection and where they disagree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Comparison {
    /// Block both snapshots describe.
    pub block: u64,
    /// Direct-query result.
    pub direct: OwnershipSnapshot,
    /// Event-replay result.
    pub replay: OwnershipSnapshot,
    /// Tokens on which they differ.
    pub discrepancies: Vec<Discrepancy>,
}

impl Comparison {
    /// Whether both builders agree on every token.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.discrepancies.is_empty()
    }
}

/// `compare`: runs both builders side by side at one block.
///
/// The block is `replay.to_block`, else `direct.at_block`, else the latest
/// block when the call starts. Both builders are pinned to it.
///
/// # Errors
///
/// `Config` if the two configs pin different blocks, otherwise the first
/// failure, direct before replay.
pub async fn compare<C: ChainQuery>(
    client: &C,
    direct: DirectQueryConfig,
    replay: ReplayConfig,
) -> HarnessResult<Comparison> {
    let block = match (direct.at_block, replay.to_block) {
        (Some(at), Some(to)) if at != to => {
            return Err(HarnessError::Config(format!(
                "direct reads block {at} but replay stops at block {to}"
            )))
        }
        (_, Some(block)) | (Some(block), None) => block,
        (None, None) => client.block_number().await?,
    };
    info!(block, "comparing builders");

    let (direct, replay) = join(
        owners_direct(client, direct.with_at_block(block), None),
        owners_replay(client, replay.with_to_block(block)),
    )
    .await;
    let (direct, replay) = (direct?, replay?);

    let discrepancies = direct.diff(&replay);
    if discrepancies.is_empty() {
        info!(tokens = direct.len(), "builders agree");
    } else {
        warn!(count = discrepancies.len(), "builders disagree");
    }
    Ok(Comparison {
        block,
        direct,
        replay,
        discrepancies,
    })
}

/// Reads the member file, if any, then appends `generated` seeded addresses.
///
/// # Errors
///
/// `Io` for an unreadable file, `Whitelist` for a bad address line.
pub fn load_whitelist(input: Option<&Path>, generated: usize, seed: u64) -> HarnessResult<Whitelist> {
    let mut whitelist = match input {
        Some(path) => Whitelist::parse(&std::fs::read_to_string(path)?)?,
        None => Whitelist::default(),
    };
    whitelist.extend_generated(generated, seed);
    Ok(whitelist)
}

/// `whitelist`: root, per-member proofs, and a self-check of every proof.
///
/// # Errors
///
/// `EmptyWhitelist`, or `InvalidProof` if the self-check fails.
pub fn whitelist(members: &Whitelist) -> HarnessResult<WhitelistArtifact> {
    let artifact = WhitelistArtifact::build(members)?;
    artifact.verify_all()?;

    let calldata = Bytes::from(encode_set_whitelist(artifact.root));
    info!(root = %artifact.root, members = artifact.proofs.len(), %calldata, "whitelist ready");
    Ok(artifact)
}

/// Shape of a simulated collection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SimulationParams {
    /// First token id, 0 or 1.
    pub first_token_id: TokenId,
    /// Distinct holders.
    pub holders: usize,
    /// Tokens minted to each holder.
    pub per_holder: u64,
    /// Random transfers after minting.
    pub transfers: usize,
    /// Random burns after the transfers.
    pub burns: usize,
    /// Seed for holders and the transfer schedule.
    pub seed: u64,
    /// Direct-query batch size.
    pub batch_size: usize,
}

impl Default for SimulationParams {
    fn default() -> Self {
        Self {
            first_token_id: 1,
            holders: 6,
            per_holder: 40,
            transfers: 300,
            burns: 0,
            seed: 0,
            batch_size: DirectQueryConfig::default().batch_size,
        }
    }
}

/// What the direct builder made of the simulated collection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DirectOutcome {
    /// Identical to the replay snapshot.
    Matched,
    /// Built, but differs from the replay snapshot.
    Diverged(Vec<Discrepancy>),
    /// Stopped at a burned id inside the supply range.
    RejectedBurned(TokenId),
}

/// Result of `simulate`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SimulationReport {
    /// Transfer events emitted.
    pub events: usize,
    /// Event-replay snapshot.
    pub replay: OwnershipSnapshot,
    /// Direct-query outcome.
    pub direct: DirectOutcome,
    /// Highest observed `ownerOf` concurrency.
    pub max_in_flight: usize,
}

/// Mints, shuffles and burns tokens on a fresh ledger.
///
/// # Errors
///
/// `Ledger` if a simulated transaction reverts.
pub fn populate(params: &SimulationParams) -> HarnessResult<SimulatedLedger> {
    let ledger = SimulatedLedger::new(params.first_token_id);
    let holders = generate_addresses(params.holders.max(1), params.seed);
    if params.per_holder > 0 {
        for holder in &holders {
            ledger.mint(*holder, params.per_holder)?;
        }
    }

    let mut live = ledger.live_tokens();
    if live.is_empty() {
        return Ok(ledger);
    }

    let mut rng = ChaCha8Rng::seed_from_u64(params.seed);
    for _ in 0..params.transfers {
        let index = rng.gen_range(0..live.len());
        let to = holders[rng.gen_range(0..holders.len())];
        let (token_id, from) = live[index];
        ledger.transfer(from, to, token_id)?;
        live[index].1 = to;
    }

    for _ in 0..params.burns.min(live.len()) {
        let (token_id, _) = live.swap_remove(rng.gen_range(0..live.len()));
        ledger.burn(token_id)?;
    }

    info!(tokens = live.len(), events = ledger.events().len(), "populated simulated collection");
    Ok(ledger)
}

/// `simulate`: builds both snapshots of a simulated collection.
///
/// # Errors
///
/// `Ledger` during population, or any builder failure other than a burned
/// id reaching the direct builder.
pub async fn simulate(params: &SimulationParams) -> HarnessResult<SimulationReport> {
    let ledger = populate(params)?;
    let replay = owners_replay(&ledger, ReplayConfig::default()).await?;

    let direct_config = DirectQueryConfig::default().with_batch_size(params.batch_size);
    let direct = match owners_direct(&ledger, direct_config, None).await {
        Ok(snapshot) => {
            let discrepancies = snapshot.diff(&replay);
            if discrepancies.is_empty() {
                DirectOutcome::Matched
            } else {
                DirectOutcome::Diverged(discrepancies)
            }
        }
        Err(HarnessError::Snapshot(SnapshotError::ReconstructionFailed {
            cause: ChainError::TokenNotFound(token_id),
            ..
        })) => DirectOutcome::RejectedBurned(token_id),
        Err(other) => return Err(other),
    };

    Ok(SimulationReport {
        events: ledger.events().len(),
        replay,
        direct,
        max_in_flight: ledger.max_in_flight(),
    })
}

/// Per-holder token lists, the way the transfer simulation reports them.
#[must_use]
pub fn holdings(snapshot: &OwnershipSnapshot) -> Vec<(Address, Vec<TokenId>)> {
    let index = snapshot.owner_index();
    index
        .owners()
        .into_iter()
        .map(|owner| (owner, index.tokens_of(&owner).collect()))
        .collect()
}
