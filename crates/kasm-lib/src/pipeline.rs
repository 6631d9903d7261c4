//! Per-rank assembly orchestration
//!
//! Ties the phases together for one rank: verify the input's k-mer
//! length, size the table and the send pool, read the local stripe,
//! run the insertion phase to quiescence, walk the start nodes, and
//! cross the closing barrier. [`run_threaded`] is the in-process
//! launcher: it builds the mesh and drives one rank per thread, which is
//! also how the integration tests exercise multi-rank behavior.

use crate::comm::{Endpoint, Mesh};
use crate::constants::{
    DEFAULT_BUFFER_FACTOR, DEFAULT_RESERVE_FACTOR, DEFAULT_SEED, MIN_BUFFER_RECORDS,
};
use crate::contig::Contig;
use crate::error::AssemblyError;
use crate::insert::{InsertCoordinator, InsertStats};
use crate::kmer::{Kmer, KmerBits};
use crate::partition::Partitioner;
use crate::reader;
use crate::table::SlotTable;
use crate::walk::{WalkCoordinator, WalkStats};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::info;

/// What the run reports and writes
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RunMode {
    /// Summary counters only
    #[default]
    Silent,
    /// Per-phase and per-rank diagnostics
    Verbose,
    /// Write `test_<rank>.dat` contig files for checking
    Test,
}

/// Configuration parameters for one assembly run
#[derive(Debug, Clone)]
pub struct AssemblyConfig {
    /// Path to the k-mer input file
    pub input: PathBuf,

    /// Output behavior
    pub mode: RunMode,

    /// Seed for the partition hash; must agree across ranks
    pub seed: u64,

    /// Slot-table over-provisioning relative to `K / N` (>= 1.2)
    pub reserve_factor: f64,

    /// Send pool sizing as a fraction of `K / N` (> 0)
    pub buffer_factor: f64,
}

impl Default for AssemblyConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::new(),
            mode: RunMode::Silent,
            seed: DEFAULT_SEED,
            reserve_factor: DEFAULT_RESERVE_FACTOR,
            buffer_factor: DEFAULT_BUFFER_FACTOR,
        }
    }
}

impl AssemblyConfig {
    /// Create a configuration for `input` with default tuning
    pub fn new(input: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            ..Self::default()
        }
    }

    /// Validate the configuration parameters
    pub fn validate(&self) -> Result<(), String> {
        if self.input.as_os_str().is_empty() {
            return Err("input path must not be empty".to_string());
        }
        if self.reserve_factor < 1.2 {
            return Err(format!(
                "reserve_factor must be >= 1.2 so probing terminates, got {}",
                self.reserve_factor
            ));
        }
        if self.buffer_factor <= 0.0 {
            return Err(format!(
                "buffer_factor must be positive, got {}",
                self.buffer_factor
            ));
        }
        Ok(())
    }

    /// Log configuration parameters via tracing
    pub fn print(&self) {
        tracing::info!("Assembly configuration:");
        tracing::info!("  input = {}", self.input.display());
        tracing::info!("  mode = {:?}", self.mode);
        tracing::debug!("  seed = {}", self.seed);
        tracing::debug!("  reserve_factor = {}", self.reserve_factor);
        tracing::debug!("  buffer_factor = {}", self.buffer_factor);
    }
}

/// Wall-clock cost of each phase on one rank
#[derive(Clone, Copy, Debug, Default)]
pub struct PhaseTimings {
    /// Insertion phase, including quiescence
    pub insert: Duration,
    /// Walk phase, including termination detection
    pub walk: Duration,
    /// Both phases plus the closing barrier
    pub total: Duration,
}

/// Everything one rank produced and observed in a run
#[derive(Debug)]
pub struct AssemblyReport<const K: usize>
where
    Kmer<K>: KmerBits,
{
    /// This rank's id
    pub rank: u32,
    /// Contigs whose start nodes this rank read
    pub contigs: Vec<Contig<K>>,
    /// Insertion phase counters
    pub insert_stats: InsertStats,
    /// Walk phase counters
    pub walk_stats: WalkStats,
    /// Phase timings
    pub timings: PhaseTimings,
    /// FILLED slots in this rank's shard after quiescence
    pub table_len: usize,
    /// Record count of the whole input file
    pub total_kmers: u64,
}

impl<const K: usize> AssemblyReport<K>
where
    Kmer<K>: KmerBits,
{
    /// Total k-mers across this rank's contigs
    pub fn contig_kmers(&self) -> u64 {
        self.contigs.iter().map(|c| c.len() as u64).sum()
    }
}

/// Slot count for one rank's table
pub fn table_slots(total_kmers: u64, n_ranks: u32, reserve_factor: f64) -> usize {
    let per_rank = (total_kmers as f64 * reserve_factor / n_ranks as f64).ceil() as usize;
    per_rank.max(1)
}

/// Record capacity of each per-destination send pool
pub fn buffer_pool_records(total_kmers: u64, n_ranks: u32, buffer_factor: f64) -> usize {
    let per_rank = (total_kmers as f64 * buffer_factor / n_ranks as f64).ceil() as usize;
    per_rank.max(MIN_BUFFER_RECORDS)
}

/// Run the assembly pipeline as one rank of an existing mesh.
///
/// # Errors
/// Any [`AssemblyError`]; the k-mer length check runs before the table
/// or any buffer is allocated.
pub fn run_rank<const K: usize>(
    config: &AssemblyConfig,
    mut endpoint: Endpoint,
) -> Result<AssemblyReport<K>, AssemblyError>
where
    Kmer<K>: KmerBits,
{
    let rank = endpoint.rank();
    let n_ranks = endpoint.n_ranks();

    let file_k = reader::kmer_size(&config.input)?;
    if file_k != K {
        return Err(AssemblyError::KmerLengthMismatch {
            expected: K,
            actual: file_k,
        });
    }
    let total_kmers = reader::line_count(&config.input)?;

    if rank == 0 {
        info!("Assembling {} {}-mers across {} ranks", total_kmers, K, n_ranks);
    }

    let slots = table_slots(total_kmers, n_ranks, config.reserve_factor);
    let partitioner = Partitioner::new(n_ranks, slots as u64, config.seed);
    let mut table = SlotTable::<K>::new(slots);

    let kmers = reader::read_kmers::<K, _>(&config.input, n_ranks, rank)?;

    let start = Instant::now();

    let insert = InsertCoordinator::new(&mut table, &mut endpoint, &partitioner);
    let (start_nodes, insert_stats) = insert.run(&kmers, total_kmers)?;
    let insert_elapsed = start.elapsed();
    drop(kmers);

    if rank == 0 {
        info!("Insertion quiesced in {:.3}s", insert_elapsed.as_secs_f64());
    }

    let walk_start = Instant::now();
    let walk = WalkCoordinator::new(&table, &mut endpoint, &partitioner);
    let (contigs, walk_stats) = walk.run(start_nodes)?;
    let walk_elapsed = walk_start.elapsed();

    endpoint.barrier()?;
    let total_elapsed = start.elapsed();

    if rank == 0 {
        info!("Assembled in {:.3}s total", total_elapsed.as_secs_f64());
    }
    if config.mode == RunMode::Verbose {
        info!(
            "Rank {} reconstructed {} contigs with {} k-mers from {} start nodes ({:.3}s walk, {:.3}s insert)",
            rank,
            contigs.len(),
            contigs.iter().map(|c| c.len()).sum::<usize>(),
            walk_stats.cursors,
            walk_elapsed.as_secs_f64(),
            insert_elapsed.as_secs_f64(),
        );
    }

    Ok(AssemblyReport {
        rank,
        contigs,
        insert_stats,
        walk_stats,
        timings: PhaseTimings {
            insert: insert_elapsed,
            walk: walk_elapsed,
            total: total_elapsed,
        },
        table_len: table.len(),
        total_kmers,
    })
}

/// Build a mesh and run every rank on its own thread.
///
/// Ranks share nothing but the mesh; reports come back in rank order.
///
/// # Errors
/// The k-mer length check runs once up front, before the mesh is built;
/// any per-rank error is propagated (lowest rank first).
pub fn run_threaded<const K: usize>(
    config: &AssemblyConfig,
    n_ranks: u32,
) -> Result<Vec<AssemblyReport<K>>, AssemblyError>
where
    Kmer<K>: KmerBits,
{
    let file_k = reader::kmer_size(&config.input)?;
    if file_k != K {
        return Err(AssemblyError::KmerLengthMismatch {
            expected: K,
            actual: file_k,
        });
    }
    let total_kmers = reader::line_count(&config.input)?;
    let pool_records = buffer_pool_records(total_kmers, n_ranks, config.buffer_factor);

    let endpoints = Mesh::build(n_ranks, pool_records);

    std::thread::scope(|scope| {
        let handles: Vec<_> = endpoints
            .into_iter()
            .map(|endpoint| scope.spawn(move || run_rank::<K>(config, endpoint)))
            .collect();

        let mut reports = Vec::with_capacity(n_ranks as usize);
        let mut first_err = None;
        for handle in handles {
            match handle.join() {
                Ok(Ok(report)) => reports.push(report),
                Ok(Err(err)) => {
                    if first_err.is_none() {
                        first_err = Some(err);
                    }
                }
                Err(panic) => std::panic::resume_unwind(panic),
            }
        }
        match first_err {
            Some(err) => Err(err),
            None => Ok(reports),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AssemblyConfig::new("kmers.dat");
        assert_eq!(config.mode, RunMode::Silent);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_reserve_factor() {
        let config = AssemblyConfig {
            reserve_factor: 1.0,
            ..AssemblyConfig::new("kmers.dat")
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_buffer_factor() {
        let config = AssemblyConfig {
            buffer_factor: 0.0,
            ..AssemblyConfig::new("kmers.dat")
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_empty_input() {
        let config = AssemblyConfig::default();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_sizing_helpers() {
        // 100 k-mers over 4 ranks at 1.2 reserve: ceil(30) slots each
        assert_eq!(table_slots(100, 4, 1.2), 30);
        assert_eq!(table_slots(1, 8, 1.2), 1);

        // The pool never shrinks below the floor
        assert_eq!(buffer_pool_records(10, 2, 0.2), MIN_BUFFER_RECORDS);
        assert_eq!(buffer_pool_records(10_000, 2, 0.2), 1_000);
    }
}
