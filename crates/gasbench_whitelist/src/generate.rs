//! # Synthetic Members
//!
//! Padding addresses for large whitelists. Seeded, so a benchmark run can
//! be repeated with the exact same tree.

use alloy_primitives::Address;
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// `count` pseudo-random addresses derived from `seed`.
#[must_use]
pub fn generate_addresses(count: usize, seed: u64) -> Vec<Address> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..count)
        .map(|_| {
            let mut bytes = [0u8; 20];
            rng.fill_bytes(&mut bytes);
            Address::from(bytes)
        })
        .collect()
}
