//! # Simulated Ledger
//!
//! An in-memory ERC-721A style collection that answers [`ChainQuery`]
//! exactly like a node would. Used by the transfer simulation task and by
//! every builder test.
//!
//! Each mutating call is mined as its own block; the logs it emits get
//! consecutive log indices within that block.

use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use alloy_primitives::Address;
use parking_lot::Mutex;

use crate::client::{ChainQuery, TokenId};
use crate::error::{ChainError, ChainResult, LedgerError};
use crate::events::TransferEvent;
use crate::index::OwnerIndex;

/// A failure injected into the next `remaining` calls of one operation.
#[derive(Clone, Debug)]
struct Fault {
    error: ChainError,
    remaining: u32,
}

impl Fault {
    /// Consumes one injection, returning the error if any were left.
    fn take(slot: &mut Option<Self>) -> Option<ChainError> {
        let fault = slot.as_mut()?;
        let error = fault.error.clone();
        fault.remaining -= 1;
        if fault.remaining == 0 {
            *slot = None;
        }
        Some(error)
    }
}

/// Mutable collection state behind the lock.
#[derive(Debug, Default)]
struct LedgerState {
    next_token_id: TokenId,
    owners: BTreeMap<TokenId, Address>,
    index: OwnerIndex,
    events: Vec<TransferEvent>,
    block_number: u64,
    total_supply_fault: Option<Fault>,
    transfer_events_fault: Option<Fault>,
    owner_of_faults: HashMap<TokenId, Fault>,
}

impl LedgerState {
    /// Starts a new block and returns its number.
    fn mine(&mut self) -> u64 {
        self.block_number += 1;
        self.block_number
    }

    fn emit(&mut self, block_number: u64, log_index: u64, token_id: TokenId, from: Address, to: Address) {
        self.events.push(TransferEvent {
            block_number,
            log_index,
            token_id,
            from,
            to,
        });
    }

    /// Owners as of the end of `block`, rebuilt from the event log.
    fn owners_at(&self, block: Option<u64>) -> Cow<'_, BTreeMap<TokenId, Address>> {
        match block {
            Some(block) if block < self.block_number => {
                let mut owners = BTreeMap::new();
                for event in self.events.iter().take_while(|event| event.block_number <= block) {
                    if event.is_burn() {
                        owners.remove(&event.token_id);
                    } else {
                        owners.insert(event.token_id, event.to);
                    }
                }
                Cow::Owned(owners)
            }
            _ => Cow::Borrowed(&self.owners),
        }
    }

    fn owner(&self, token_id: TokenId) -> Result<Address, LedgerError> {
        self.owners
            .get(&token_id)
            .copied()
            .ok_or(LedgerError::NonexistentToken(token_id))
    }
}

/// In-memory collection implementing [`ChainQuery`].
///
/// `total_supply` counts live tokens (mints minus burns), as ERC-721A does.
/// Reads pinned to an earlier block are answered from the event log.
#[derive(Debug)]
pub struct SimulatedLedger {
    /// Collection state.
    state: Mutex<LedgerState>,
    /// `owner_of` calls currently awaiting completion.
    in_flight: AtomicUsize,
    /// Highest observed `in_flight`.
    max_in_flight: AtomicUsize,
    /// Total `owner_of` calls served.
    owner_of_calls: AtomicU64,
}

impl SimulatedLedger {
    /// Creates an empty collection whose ids start at `first_token_id`.
    #[must_use]
    pub fn new(first_token_id: TokenId) -> Self {
        Self {
            state: Mutex::new(LedgerState {
                next_token_id: first_token_id,
                ..LedgerState::default()
            }),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            owner_of_calls: AtomicU64::new(0),
        }
    }

    /// Mints `quantity` consecutive tokens to `to` in one block.
    ///
    /// # Errors
    ///
    /// Rejects a zero quantity or the zero address.
    pub fn mint(&self, to: Address, quantity: u64) -> Result<Vec<TokenId>, LedgerError> {
        if quantity == 0 {
            return Err(LedgerError::EmptyMint);
        }
        if to == Address::ZERO {
            return Err(LedgerError::ZeroAddress);
        }

        let mut state = self.state.lock();
        let block_number = state.mine();
        let first = state.next_token_id;
        let minted: Vec<TokenId> = (first..first + quantity).collect();
        for (log_index, &token_id) in (0u64..).zip(&minted) {
            state.owners.insert(token_id, to);
            state.index.insert(to, token_id);
            state.emit(block_number, log_index, token_id, Address::ZERO, to);
        }
        state.next_token_id = first + quantity;
        Ok(minted)
    }

    /// Transfers `token_id` from `from` to `to`.
    ///
    /// # Errors
    ///
    /// Reverts if the token does not exist or `from` does not own it.
    pub fn transfer(&self, from: Address, to: Address, token_id: TokenId) -> Result<(), LedgerError> {
        if to == Address::ZERO {
            return Err(LedgerError::ZeroAddress);
        }

        let mut state = self.state.lock();
        let actual = state.owner(token_id)?;
        if actual != from {
            return Err(LedgerError::NotOwner {
                token_id,
                claimed: from,
                actual,
            });
        }

        let block_number = state.mine();
        state.owners.insert(token_id, to);
        state.index.move_token(&from, to, token_id);
        state.emit(block_number, 0, token_id, from, to);
        Ok(())
    }

    /// Burns `token_id`, emitting a transfer to the zero address.
    ///
    /// # Errors
    ///
    /// Reverts if the token does not exist.
    pub fn burn(&self, token_id: TokenId) -> Result<(), LedgerError> {
        let mut state = self.state.lock();
        let owner = state.owner(token_id)?;

        let block_number = state.mine();
        state.owners.remove(&token_id);
        state.index.remove(&owner, token_id);
        state.emit(block_number, 0, token_id, owner, Address::ZERO);
        Ok(())
    }

    /// Mines an empty block and returns its number.
    pub fn advance_block(&self) -> u64 {
        self.state.lock().mine()
    }

    /// Latest mined block.
    #[must_use]
    pub fn block_number(&self) -> u64 {
        self.state.lock().block_number
    }

    /// Every emitted Transfer event, in chain order.
    #[must_use]
    pub fn events(&self) -> Vec<TransferEvent> {
        self.state.lock().events.clone()
    }

    /// Tokens currently held by `owner`, ascending.
    #[must_use]
    pub fn tokens_of(&self, owner: &Address) -> Vec<TokenId> {
        self.state.lock().index.tokens_of(owner).collect()
    }

    /// Live tokens and their owners, ascending by id.
    #[must_use]
    pub fn live_tokens(&self) -> Vec<(TokenId, Address)> {
        self.state
            .lock()
            .owners
            .iter()
            .map(|(&token_id, &owner)| (token_id, owner))
            .collect()
    }

    /// Makes the next `times` `total_supply` calls fail with `error`.
    pub fn fail_total_supply(&self, error: ChainError, times: u32) {
        self.state.lock().total_supply_fault = (times > 0).then_some(Fault { error, remaining: times });
    }

    /// Makes the next `times` `transfer_events` calls fail with `error`.
    pub fn fail_transfer_events(&self, error: ChainError, times: u32) {
        self.state.lock().transfer_events_fault = (times > 0).then_some(Fault { error, remaining: times });
    }

    /// Makes the next `times` `owner_of(token_id)` calls fail with `error`.
    pub fn fail_owner_of(&self, token_id: TokenId, error: ChainError, times: u32) {
        let mut state = self.state.lock();
        if times == 0 {
            state.owner_of_faults.remove(&token_id);
        } else {
            state.owner_of_faults.insert(token_id, Fault { error, remaining: times });
        }
    }

    /// `owner_of` calls currently awaiting completion.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Highest number of `owner_of` calls observed in flight at once.
    #[must_use]
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::Relaxed)
    }

    /// Total `owner_of` calls served.
    #[must_use]
    pub fn owner_of_calls(&self) -> u64 {
        self.owner_of_calls.load(Ordering::Relaxed)
    }

    fn lookup_owner(&self, token_id: TokenId, at_block: Option<u64>) -> ChainResult<Address> {
        let mut state = self.state.lock();
        let mut slot = state.owner_of_faults.remove(&token_id);
        if let Some(error) = Fault::take(&mut slot) {
            if let Some(fault) = slot {
                state.owner_of_faults.insert(token_id, fault);
            }
            return Err(error);
        }
        state
            .owners_at(at_block)
            .get(&token_id)
            .copied()
            .ok_or(ChainError::TokenNotFound(token_id))
    }
}

/// Counts one `owner_of` call as in flight until dropped, so calls
/// cancelled by a failing sibling are released too.
struct InFlight<'a>(&'a AtomicUsize);

impl<'a> InFlight<'a> {
    fn enter(counter: &'a AtomicUsize, max: &AtomicUsize) -> Self {
        let now = counter.fetch_add(1, Ordering::SeqCst) + 1;
        max.fetch_max(now, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl Default for SimulatedLedger {
    fn default() -> Self {
        Self::new(1)
    }
}

impl ChainQuery for SimulatedLedger {
    async fn block_number(&self) -> ChainResult<u64> {
        Ok(self.state.lock().block_number)
    }

    async fn total_supply_at(&self, at_block: Option<u64>) -> ChainResult<u64> {
        let mut state = self.state.lock();
        if let Some(error) = Fault::take(&mut state.total_supply_fault) {
            return Err(error);
        }
        Ok(state.owners_at(at_block).len() as u64)
    }

    async fn owner_of_at(&self, token_id: TokenId, at_block: Option<u64>) -> ChainResult<Address> {
        self.owner_of_calls.fetch_add(1, Ordering::Relaxed);
        let _in_flight = InFlight::enter(&self.in_flight, &self.max_in_flight);

        // Suspend once so concurrently issued calls overlap like network round trips.
        tokio::task::yield_now().await;

        self.lookup_owner(token_id, at_block)
    }

    async fn transfer_events(&self, from_block: u64, to_block: Option<u64>) -> ChainResult<Vec<TransferEvent>> {
        let mut state = self.state.lock();
        if let Some(error) = Fault::take(&mut state.transfer_events_fault) {
            return Err(error);
        }
        let to_block = to_block.unwrap_or(state.block_number);
        Ok(state
            .events
            .iter()
            .filter(|event| (from_block..=to_block).contains(&event.block_number))
            .copied()
            .collect())
    }
}
