// kasm: distributed contig assembly from k-mer fragments
//
// Reconstructs linear DNA contigs from a multiset of fixed-length k-mers
// spread across N share-nothing ranks. Each rank owns a shard of one
// logical hash table; inserts and successor lookups travel between ranks
// as fixed-size records over a buffered point-to-point mesh.

#![warn(missing_docs)]
#![doc = include_str!("../README.md")]

pub mod comm;
pub mod constants;
pub mod contig;
pub mod encoding;
pub mod error;
pub mod hasher;
pub mod insert;
pub mod kmer;
pub mod partition;
pub mod pipeline;
pub mod reader;
pub mod table;
pub mod walk;
pub mod wire;

// Re-export common types at crate root
pub use comm::{CommError, Endpoint, Mesh};
pub use contig::Contig;
pub use error::AssemblyError;
pub use insert::{InsertCoordinator, InsertStats};
pub use kmer::{Kmer, KmerBits, KmerEntry};
pub use partition::Partitioner;
pub use pipeline::{run_rank, run_threaded, AssemblyConfig, AssemblyReport, RunMode};
pub use table::{InsertOutcome, SlotTable};
pub use walk::{WalkCoordinator, WalkStats};
pub use wire::{Frame, Message, WIRE_RECORD_LEN};

/// Dispatch a runtime k-mer length to a const-generic `K`.
///
/// Expands to a match over every supported K; the unsupported arm
/// evaluates to `Err(AssemblyError::UnsupportedKmerLength(k).into())`,
/// so the surrounding expression must be a `Result` whose error type
/// converts from [`AssemblyError`].
///
/// ```ignore
/// let k = reader::kmer_size(&path)?;
/// kasm_lib::dispatch_on_k!(k, K => run_with_k::<K>(&config))
/// ```
#[macro_export]
macro_rules! dispatch_on_k {
    ($k:expr, $K:ident => $body:expr) => {{
        match $k {
            3 => { const $K: usize = 3; $body }
            5 => { const $K: usize = 5; $body }
            7 => { const $K: usize = 7; $body }
            9 => { const $K: usize = 9; $body }
            11 => { const $K: usize = 11; $body }
            13 => { const $K: usize = 13; $body }
            15 => { const $K: usize = 15; $body }
            17 => { const $K: usize = 17; $body }
            19 => { const $K: usize = 19; $body }
            21 => { const $K: usize = 21; $body }
            23 => { const $K: usize = 23; $body }
            25 => { const $K: usize = 25; $body }
            27 => { const $K: usize = 27; $body }
            29 => { const $K: usize = 29; $body }
            31 => { const $K: usize = 31; $body }
            33 => { const $K: usize = 33; $body }
            35 => { const $K: usize = 35; $body }
            37 => { const $K: usize = 37; $body }
            39 => { const $K: usize = 39; $body }
            41 => { const $K: usize = 41; $body }
            43 => { const $K: usize = 43; $body }
            45 => { const $K: usize = 45; $body }
            47 => { const $K: usize = 47; $body }
            49 => { const $K: usize = 49; $body }
            51 => { const $K: usize = 51; $body }
            53 => { const $K: usize = 53; $body }
            55 => { const $K: usize = 55; $body }
            57 => { const $K: usize = 57; $body }
            59 => { const $K: usize = 59; $body }
            61 => { const $K: usize = 61; $body }
            63 => { const $K: usize = 63; $body }
            other => Err($crate::AssemblyError::UnsupportedKmerLength(other).into()),
        }
    }};
}

/// Version information
pub fn version() -> (u8, u8, u8) {
    constants::VERSION
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        let (major, minor, patch) = version();
        assert_eq!(major, 0);
        assert_eq!(minor, 1);
        assert_eq!(patch, 0);
    }

    #[test]
    fn test_dispatch_on_supported_k() {
        fn probe<const K: usize>() -> Result<usize, AssemblyError>
        where
            Kmer<K>: KmerBits,
        {
            Ok(K)
        }

        let got: Result<usize, AssemblyError> = dispatch_on_k!(19usize, K => probe::<K>());
        assert_eq!(got.unwrap(), 19);
    }

    #[test]
    fn test_dispatch_on_unsupported_k() {
        fn probe<const K: usize>() -> Result<usize, AssemblyError>
        where
            Kmer<K>: KmerBits,
        {
            Ok(K)
        }

        let got: Result<usize, AssemblyError> = dispatch_on_k!(4usize, K => probe::<K>());
        assert!(matches!(got, Err(AssemblyError::UnsupportedKmerLength(4))));
    }
}
