//! Constants and configuration defaults for kasm
//!
//! This module defines compile-time and runtime constants used throughout
//! the library, including valid k-mer sizes and sizing parameters for the
//! distributed hash table and the send buffer pool.

/// Terminal extension character: "no neighbor on this side"
pub const TERMINAL_EXT: u8 = b'F';

/// Default seed for the partition hash function
pub const DEFAULT_SEED: u64 = 1;

/// Default over-provisioning of local slot tables relative to a perfectly
/// balanced share of the key space. Must stay >= 1.2 so linear probing
/// terminates well before the table fills.
pub const DEFAULT_RESERVE_FACTOR: f64 = 1.2;

/// Default fraction of K/N used to size the per-destination send pool.
/// Exhaustion of the pool is fatal, so this is exposed as a tunable.
pub const DEFAULT_BUFFER_FACTOR: f64 = 0.2;

/// Lower bound on per-destination send pool capacity, in records.
/// Keeps tiny inputs from degenerating to zero-capacity channels.
pub const MIN_BUFFER_RECORDS: usize = 16;

/// Version number
pub const VERSION: (u8, u8, u8) = (0, 1, 0);

/// All valid k-mer sizes (odd numbers from 3 to 63)
/// This is the single source of truth for supported K values
pub const VALID_K_VALUES: &[usize] = &[
    3, 5, 7, 9, 11, 13, 15, 17, 19, 21, 23, 25, 27, 29, 31, 33, 35, 37, 39, 41, 43, 45, 47, 49,
    51, 53, 55, 57, 59, 61, 63,
];

/// Check if a k-mer size is valid
#[inline]
pub const fn is_valid_k(k: usize) -> bool {
    k >= 3 && k <= 63 && k % 2 == 1
}

/// Maximum k-mer size supported
pub const MAX_K: usize = 63;

/// Minimum k-mer size supported
pub const MIN_K: usize = 3;
