//! Insertion phase coordinator
//!
//! Routes every locally-read k-mer to its owning rank: keys that hash
//! home are stored directly, the rest are posted as INSERT records.
//! Between consecutive routes the coordinator drains incoming inserts so
//! remote traffic makes progress while the local stripe is consumed.
//!
//! The phase ends with a quiescence loop: the ranks repeatedly sum their
//! `applied` counters until the total reaches the file's record count,
//! which proves no INSERT record is still in flight. The applied counter
//! counts duplicate keys too, so the predicate stays correct when the
//! input repeats a k-mer.

use crate::comm::Endpoint;
use crate::error::AssemblyError;
use crate::kmer::{Kmer, KmerBits, KmerEntry};
use crate::partition::Partitioner;
use crate::table::{InsertOutcome, SlotTable};
use crate::wire::Message;
use tracing::{debug, warn};

/// Counters accumulated over the insertion phase
#[derive(Clone, Copy, Debug, Default)]
pub struct InsertStats {
    /// Records read from the local stripe
    pub kmers_read: u64,
    /// Keys stored without leaving this rank
    pub local_inserts: u64,
    /// INSERT records posted to other ranks
    pub remote_posts: u64,
    /// INSERT records received and applied for other ranks
    pub remote_applies: u64,
    /// Applied keys that were already present
    pub duplicates: u64,
    /// Collective rounds spent waiting for quiescence
    pub quiescence_rounds: u64,
}

/// Per-rank driver of the insertion phase
pub struct InsertCoordinator<'a, const K: usize>
where
    Kmer<K>: KmerBits,
{
    table: &'a mut SlotTable<K>,
    comm: &'a mut Endpoint,
    partitioner: &'a Partitioner,
    applied: u64,
    stats: InsertStats,
}

impl<'a, const K: usize> InsertCoordinator<'a, K>
where
    Kmer<K>: KmerBits,
{
    /// Create a coordinator over this rank's table and mesh endpoint
    pub fn new(
        table: &'a mut SlotTable<K>,
        comm: &'a mut Endpoint,
        partitioner: &'a Partitioner,
    ) -> Self {
        Self {
            table,
            comm,
            partitioner,
            applied: 0,
            stats: InsertStats::default(),
        }
    }

    /// Insert the local stripe, drive remote traffic to quiescence, and
    /// return the start nodes found in the stripe.
    ///
    /// On return the global table holds every input k-mer exactly once
    /// and no INSERT record is in flight; all ranks have passed the
    /// closing barrier.
    pub fn run(
        mut self,
        kmers: &[KmerEntry<K>],
        total_kmers: u64,
    ) -> Result<(Vec<KmerEntry<K>>, InsertStats), AssemblyError> {
        let mut start_nodes = Vec::new();

        for &entry in kmers {
            self.drain_inserts()?;
            self.route(entry)?;
            if entry.is_start() {
                start_nodes.push(entry);
            }
            self.stats.kmers_read += 1;
        }

        loop {
            let applied_global = self.comm.allreduce_sum(self.applied)?;
            if applied_global >= total_kmers {
                debug_assert_eq!(applied_global, total_kmers);
                break;
            }
            self.stats.quiescence_rounds += 1;
            self.drain_inserts()?;
        }
        self.comm.flush();
        self.comm.barrier()?;

        debug!(
            rank = self.comm.rank(),
            local = self.stats.local_inserts,
            posted = self.stats.remote_posts,
            applied_for_peers = self.stats.remote_applies,
            duplicates = self.stats.duplicates,
            "insert phase quiesced"
        );

        Ok((start_nodes, self.stats))
    }

    /// Store a stripe k-mer locally or post it to its owner
    fn route(&mut self, entry: KmerEntry<K>) -> Result<(), AssemblyError> {
        let owner = self.partitioner.owner(&entry.kmer);
        if owner == self.comm.rank() {
            self.apply(entry)?;
            self.stats.local_inserts += 1;
        } else {
            let msg = Message::Insert {
                src_rank: self.comm.rank(),
                entry,
            };
            self.comm.post(owner, msg.encode())?;
            self.stats.remote_posts += 1;
        }
        Ok(())
    }

    /// Apply an insert on the owning side, counting duplicates as applied
    fn apply(&mut self, entry: KmerEntry<K>) -> Result<(), AssemblyError> {
        let home = self.partitioner.home_slot(&entry.kmer);
        match self.table.try_insert(home, entry) {
            InsertOutcome::Inserted => {
                self.applied += 1;
                Ok(())
            }
            InsertOutcome::Duplicate => {
                self.applied += 1;
                self.stats.duplicates += 1;
                Ok(())
            }
            InsertOutcome::Full => Err(AssemblyError::TableFull {
                rank: self.comm.rank(),
                slots: self.table.capacity(),
            }),
        }
    }

    /// Apply every pending incoming INSERT record
    fn drain_inserts(&mut self) -> Result<(), AssemblyError> {
        while let Some(frame) = self.comm.poll()? {
            match Message::<K>::decode(&frame)? {
                Message::Insert { entry, .. } => {
                    self.apply(entry)?;
                    self.stats.remote_applies += 1;
                }
                other => {
                    // The walk phase starts only after the closing
                    // barrier, so nothing else can be in flight here.
                    warn!(rank = self.comm.rank(), ?other, "unexpected record during insert phase");
                }
            }
        }
        Ok(())
    }
}
