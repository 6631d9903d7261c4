//! Deterministic hasher for k-mer keys using ahash.
//!
//! This uses AHasher with explicit seeds so that every rank computes the
//! same hash for the same packed key. The partition function is built on
//! top of this hash, so determinism across ranks and across runs is a
//! correctness requirement, not an optimization.

use ahash::RandomState;
use std::hash::{BuildHasher, Hasher};

/// A deterministic hasher with a seeded state
#[derive(Clone)]
pub struct DeterministicHasher {
    seed: u64,
    state: RandomState,
}

impl DeterministicHasher {
    /// Create a new deterministic hasher with the given seed
    pub fn new(seed: u64) -> Self {
        let state = RandomState::with_seeds(seed, !seed, seed, !seed);
        Self { seed, state }
    }

    /// Hash the packed bits of a k-mer key
    #[inline]
    pub fn hash_key(&self, bits: u128) -> u64 {
        let mut hasher = self.state.build_hasher();
        hasher.write_u128(bits);
        hasher.finish()
    }

    /// Get the seed value
    pub fn seed(&self) -> u64 {
        self.seed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deterministic_hashing() {
        let hasher1 = DeterministicHasher::new(42);
        let hasher2 = DeterministicHasher::new(42);
        let hasher3 = DeterministicHasher::new(43);

        let value = 0x123456789abcdef0u128;

        // Same seed should produce same hash
        assert_eq!(hasher1.hash_key(value), hasher2.hash_key(value));

        // Different seed should produce different hash
        assert_ne!(hasher1.hash_key(value), hasher3.hash_key(value));
    }

    #[test]
    fn test_different_values_produce_different_hashes() {
        let hasher = DeterministicHasher::new(1);
        assert_ne!(hasher.hash_key(100), hasher.hash_key(101));
    }
}
