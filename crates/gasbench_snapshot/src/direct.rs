//! # Direct-Query Snapshot Builder
//!
//! Resolves every id in `[first, first + totalSupply - 1]` with `ownerOf`.
//!
//! ## Backpressure
//!
//! ```text
//!  batch 0: ownerOf(1) .. ownerOf(500)   ── all concurrent ──▶ join
//!  batch 1: ownerOf(501) .. ownerOf(1000) ── all concurrent ──▶ join
//!  ...
//! ```
//!
//! At most `batch_size` calls are ever in flight and the next batch starts
//! only after the previous one fully resolved.
//!
//! With `at_block` set, every call reads the state at that block, so a
//! build spanning many blocks still describes a single snapshot point.

use std::collections::BTreeMap;

use crossbeam_channel::Sender;
use futures::future::try_join_all;
use gasbench_chain::{Address, ChainError, ChainQuery, ChainResult, TokenId};
use tracing::info;

use crate::error::{SnapshotError, SnapshotResult};
use crate::snapshot::OwnershipSnapshot;

/// Reference batch size.
pub const DEFAULT_BATCH_SIZE: usize = 500;

/// Where a collection starts numbering its tokens.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum IdOrigin {
    /// First token is id 0.
    ZeroBased,
    /// First token is id 1.
    OneBased,
}

impl IdOrigin {
    /// Detects the origin by asking for the owner of token 0 at `at_block`.
    ///
    /// Assumes token 0 was not burned in a zero-based collection.
    ///
    /// # Errors
    ///
    /// Any failure other than `TokenNotFound` is propagated unchanged.
    pub async fn probe<C: ChainQuery>(client: &C, at_block: Option<u64>) -> ChainResult<Self> {
        match client.owner_of_at(0, at_block).await {
            Ok(_) => Ok(Self::ZeroBased),
            Err(ChainError::TokenNotFound(_)) => Ok(Self::OneBased),
            Err(other) => Err(other),
        }
    }

    /// Id of the first token.
    #[inline]
    #[must_use]
    pub const fn first_token_id(self) -> TokenId {
        match self {
            Self::ZeroBased => 0,
            Self::OneBased => 1,
        }
    }
}

/// Progress after a batch completes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Progress {
    /// Ids resolved so far.
    pub resolved: u64,
    /// Ids to resolve in total.
    pub total: u64,
}

/// Configuration for the direct-query builder.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DirectQueryConfig {
    /// Concurrent `ownerOf` calls per batch. The single concurrency knob.
    pub batch_size: usize,
    /// Skip the `ownerOf(0)` probe when the origin is already known.
    pub id_origin: Option<IdOrigin>,
    /// Block every call reads at; `None` reads the latest state.
    pub at_block: Option<u64>,
}

impl Default for DirectQueryConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            id_origin: None,
            at_block: None,
        }
    }
}

impl DirectQueryConfig {
    /// Sets the batch size.
    #[must_use]
    pub const fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Pins the id origin instead of probing.
    #[must_use]
    pub const fn with_id_origin(mut self, origin: IdOrigin) -> Self {
        self.id_origin = Some(origin);
        self
    }

    /// Reads every owner at `block`.
    #[must_use]
    pub const fn with_at_block(mut self, block: u64) -> Self {
        self.at_block = Some(block);
        self
    }
}

/// Builds a snapshot with one `ownerOf` call per token.
pub struct DirectQueryBuilder<'a, C> {
    client: &'a C,
    batch_size: u64,
    id_origin: Option<IdOrigin>,
    at_block: Option<u64>,
    progress: Option<Sender<Progress>>,
}

impl<'a, C: ChainQuery> DirectQueryBuilder<'a, C> {
    /// Creates a builder over `client`.
    ///
    /// # Errors
    ///
    /// `InvalidConfig` for a zero batch size.
    pub fn new(client: &'a C, config: DirectQueryConfig) -> SnapshotResult<Self> {
        if config.batch_size == 0 {
            return Err(SnapshotError::InvalidConfig("batch size must be positive".into()));
        }
        Ok(Self {
            client,
            batch_size: config.batch_size as u64,
            id_origin: config.id_origin,
            at_block: config.at_block,
            progress: None,
        })
    }

    /// Reports a [`Progress`] after every batch on `sender`.
    ///
    /// A full or disconnected channel never stalls the build.
    #[must_use]
    pub fn with_progress(mut self, sender: Sender<Progress>) -> Self {
        self.progress = Some(sender);
        self
    }

    /// Runs the build.
    ///
    /// # Errors
    ///
    /// `ReconstructionFailed` naming the first failing call; no partial
    /// snapshot is returned.
    pub async fn build(&self) -> SnapshotResult<OwnershipSnapshot> {
        let origin = match self.id_origin {
            Some(origin) => origin,
            None => IdOrigin::probe(self.client, self.at_block)
                .await
                .map_err(|cause| SnapshotError::reconstruction("ownerOf probe", Some(0), cause))?,
        };
        let total = self
            .client
            .total_supply_at(self.at_block)
            .await
            .map_err(|cause| SnapshotError::reconstruction("totalSupply", None, cause))?;

        let first = origin.first_token_id();
        let mut owners = BTreeMap::new();
        if total == 0 {
            info!(?origin, "collection is empty");
            return Ok(OwnershipSnapshot::from_map(owners));
        }
        let last = first.checked_add(total - 1).ok_or_else(|| {
            SnapshotError::reconstruction(
                "totalSupply",
                None,
                ChainError::Malformed(format!("supply {total} overflows the id space")),
            )
        })?;

        info!(
            ?origin,
            first,
            last,
            batch_size = self.batch_size,
            at_block = ?self.at_block,
            "resolving owners"
        );

        let mut batch_start = first;
        loop {
            let batch_end = batch_start.saturating_add(self.batch_size - 1).min(last);
            let resolved = self.resolve_batch(batch_start, batch_end).await?;
            owners.extend(resolved);

            let progress = Progress {
                resolved: owners.len() as u64,
                total,
            };
            info!("Processed: {}/{}", progress.resolved, progress.total);
            if let Some(sender) = &self.progress {
                let _ = sender.try_send(progress);
            }

            if batch_end == last {
                break;
            }
            batch_start = batch_end + 1;
        }

        Ok(OwnershipSnapshot::from_map(owners))
    }

    /// Resolves `[start, end]` concurrently; the first failure cancels the rest.
    async fn resolve_batch(&self, start: TokenId, end: TokenId) -> SnapshotResult<Vec<(TokenId, Address)>> {
        let calls = (start..=end).map(|token_id| async move {
            self.client
                .owner_of_at(token_id, self.at_block)
                .await
                .map(|owner| (token_id, owner))
                .map_err(|cause| SnapshotError::reconstruction("ownerOf", Some(token_id), cause))
        });
        try_join_all(calls).await
    }
}
