//! Key placement across ranks
//!
//! The partitioner is the only glue between the per-rank slot tables:
//! it maps a key's hash to the rank that owns it and to the probe origin
//! inside that rank's table. It is a pure function of the construction
//! parameters (rank count, table size, seed) and must be identical on
//! every rank.

use crate::hasher::DeterministicHasher;
use crate::kmer::{Kmer, KmerBits};

/// Deterministic mapping from k-mer keys to `(owner rank, home slot)`
#[derive(Clone)]
pub struct Partitioner {
    n_ranks: u32,
    slots_per_rank: u64,
    hasher: DeterministicHasher,
}

impl Partitioner {
    /// Create a partitioner for `n_ranks` ranks whose tables each hold
    /// `slots_per_rank` slots.
    pub fn new(n_ranks: u32, slots_per_rank: u64, seed: u64) -> Self {
        assert!(n_ranks > 0, "rank count must be positive");
        assert!(slots_per_rank > 0, "table size must be positive");
        Self {
            n_ranks,
            slots_per_rank,
            hasher: DeterministicHasher::new(seed),
        }
    }

    /// Number of participating ranks
    #[inline]
    pub fn n_ranks(&self) -> u32 {
        self.n_ranks
    }

    /// Slots per rank-local table
    #[inline]
    pub fn slots_per_rank(&self) -> u64 {
        self.slots_per_rank
    }

    /// The rank owning this key
    #[inline]
    pub fn owner<const K: usize>(&self, kmer: &Kmer<K>) -> u32
    where
        Kmer<K>: KmerBits,
    {
        (self.hasher.hash_key(kmer.as_u128()) % self.n_ranks as u64) as u32
    }

    /// Probe origin inside the owner's table
    #[inline]
    pub fn home_slot<const K: usize>(&self, kmer: &Kmer<K>) -> usize
    where
        Kmer<K>: KmerBits,
    {
        ((self.hasher.hash_key(kmer.as_u128()) / self.n_ranks as u64) % self.slots_per_rank) as usize
    }
}
