//! # Retry Layer
//!
//! Caller-supplied retry policy, layered around any [`ChainQuery`] without
//! the builders knowing about it.

use std::future::Future;
use std::time::Duration;

use alloy_primitives::Address;
use tracing::warn;

use crate::client::{ChainQuery, TokenId};
use crate::error::ChainResult;
use crate::events::TransferEvent;

/// Exponential backoff for transient failures.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts per call, including the first. One disables retries.
    pub max_attempts: u32,
    /// Delay before the second attempt.
    pub initial_backoff: Duration,
    /// Upper bound on any single delay.
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            initial_backoff: Duration::from_millis(250),
            max_backoff: Duration::from_secs(8),
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            max_attempts: 1,
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
        }
    }

    /// Sets the attempt budget. Zero is clamped to one.
    #[must_use]
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    /// Sets the first backoff delay.
    #[must_use]
    pub const fn with_initial_backoff(mut self, delay: Duration) -> Self {
        self.initial_backoff = delay;
        self
    }

    /// Caps every backoff delay.
    #[must_use]
    pub const fn with_max_backoff(mut self, delay: Duration) -> Self {
        self.max_backoff = delay;
        self
    }

    /// Delay to wait after failed attempt number `attempt` (1-based).
    #[must_use]
    pub fn backoff_after(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.initial_backoff.saturating_mul(factor).min(self.max_backoff)
    }
}

/// A [`ChainQuery`] that retries transient failures of the wrapped client.
///
/// Non-transient errors (`Fatal`, `TokenNotFound`, `Malformed`) pass through
/// on the first attempt.
#[derive(Debug)]
pub struct Retrying<C> {
    inner: C,
    policy: RetryPolicy,
}

impl<C: ChainQuery> Retrying<C> {
    /// Wraps `inner` with `policy`.
    #[must_use]
    pub const fn new(inner: C, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    async fn run<T, F, Fut>(&self, operation: &str, mut attempt_fn: F) -> ChainResult<T>
    where
        F: FnMut() -> Fut + Send,
        Fut: Future<Output = ChainResult<T>> + Send,
        T: Send,
    {
        let mut attempt = 1;
        loop {
            match attempt_fn().await {
                Err(error) if error.is_retryable() && attempt < self.policy.max_attempts => {
                    let delay = self.policy.backoff_after(attempt);
                    warn!(
                        operation,
                        attempt,
                        max_attempts = self.policy.max_attempts,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        %error,
                        "retrying transient failure"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                outcome => return outcome,
            }
        }
    }
}

impl<C: ChainQuery> ChainQuery for Retrying<C> {
    async fn block_number(&self) -> ChainResult<u64> {
        self.run("blockNumber", || self.inner.block_number()).await
    }

    async fn total_supply_at(&self, at_block: Option<u64>) -> ChainResult<u64> {
        self.run("totalSupply", || self.inner.total_supply_at(at_block)).await
    }

    async fn owner_of_at(&self, token_id: TokenId, at_block: Option<u64>) -> ChainResult<Address> {
        self.run("ownerOf", || self.inner.owner_of_at(token_id, at_block))
            .await
    }

    async fn transfer_events(&self, from_block: u64, to_block: Option<u64>) -> ChainResult<Vec<TransferEvent>> {
        self.run("transferEvents", || self.inner.transfer_events(from_block, to_block))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ChainError;
    use crate::simulated::SimulatedLedger;

    fn fast_policy(attempts: u32) -> RetryPolicy {
        RetryPolicy::default()
            .with_max_attempts(attempts)
            .with_initial_backoff(Duration::from_millis(1))
    }

    #[test]
    fn test_backoff_grows_and_caps() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff_after(1), Duration::from_millis(250));
        assert_eq!(policy.backoff_after(2), Duration::from_millis(500));
        assert_eq!(policy.backoff_after(30), Duration::from_secs(8));
    }

    #[tokio::test]
    async fn test_transient_failures_are_retried() {
        let ledger = SimulatedLedger::new(1);
        ledger.mint(Address::repeat_byte(1), 3).unwrap();
        ledger.fail_total_supply(ChainError::Transient("503".into()), 2);

        let client = Retrying::new(&ledger, fast_policy(3));
        assert_eq!(client.total_supply().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_budget_exhaustion_surfaces_last_error() {
        let ledger = SimulatedLedger::new(1);
        ledger.fail_total_supply(ChainError::Transient("503".into()), 5);

        let client = Retrying::new(&ledger, fast_policy(3));
        let err = client.total_supply().await.unwrap_err();
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_token_not_found_is_not_retried() {
        let ledger = SimulatedLedger::new(1);
        ledger.mint(Address::repeat_byte(1), 1).unwrap();

        let client = Retrying::new(&ledger, fast_policy(5));
        assert_eq!(client.owner_of(0).await, Err(ChainError::TokenNotFound(0)));
        assert_eq!(client.owner_of(1).await, Ok(Address::repeat_byte(1)));
    }
}
