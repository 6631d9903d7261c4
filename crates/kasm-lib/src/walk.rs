//! Walk phase coordinator
//!
//! Grows one cursor per locally-read start node by chaining forward
//! extensions. A successor owned by this rank is resolved against the
//! local table; a remote successor turns the cursor WAITING and posts a
//! LOOKUP_REQ to the owner, whose reply re-arms the cursor. Incoming
//! traffic is serviced every iteration, so this rank answers peers'
//! lookups while its own cursors wait.
//!
//! Termination is counted, not inferred: once every local cursor is
//! DONE, the rank broadcasts a DONE record to all ranks including
//! itself, and the phase ends when records from all N ranks have
//! arrived. A rank with no start nodes broadcasts immediately and keeps
//! serving lookups until then.

use crate::comm::Endpoint;
use crate::contig::Contig;
use crate::error::AssemblyError;
use crate::kmer::{Kmer, KmerBits, KmerEntry};
use crate::partition::Partitioner;
use crate::table::SlotTable;
use crate::wire::Message;
use tracing::{debug, warn};

/// Counters accumulated over the walk phase
#[derive(Clone, Copy, Debug, Default)]
pub struct WalkStats {
    /// Cursors created (start nodes read by this rank)
    pub cursors: u64,
    /// LOOKUP_REQ records posted to other ranks
    pub lookup_reqs_sent: u64,
    /// LOOKUP_REQ records answered for other ranks
    pub lookup_reqs_served: u64,
    /// LOOKUP_REPLY records applied to local cursors
    pub replies_received: u64,
    /// Successors resolved without leaving this rank
    pub local_advances: u64,
    /// DONE records received (equals the rank count on success)
    pub done_tokens_received: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum CursorState {
    /// The tail may be advanced now
    Ready,
    /// A lookup for the tail's successor is in flight
    Waiting,
    /// The tail's forward extension is terminal
    Done,
}

/// Per-start-node walk state
struct Cursor<const K: usize>
where
    Kmer<K>: KmerBits,
{
    chain: Vec<KmerEntry<K>>,
    state: CursorState,
}

/// Per-rank driver of the walk phase
pub struct WalkCoordinator<'a, const K: usize>
where
    Kmer<K>: KmerBits,
{
    table: &'a SlotTable<K>,
    comm: &'a mut Endpoint,
    partitioner: &'a Partitioner,
    cursors: Vec<Cursor<K>>,
    local_done: usize,
    broadcast_sent: bool,
    ranks_done: u32,
    stats: WalkStats,
}

impl<'a, const K: usize> WalkCoordinator<'a, K>
where
    Kmer<K>: KmerBits,
{
    /// Create a coordinator over this rank's (now read-only) table
    pub fn new(table: &'a SlotTable<K>, comm: &'a mut Endpoint, partitioner: &'a Partitioner) -> Self {
        Self {
            table,
            comm,
            partitioner,
            cursors: Vec::new(),
            local_done: 0,
            broadcast_sent: false,
            ranks_done: 0,
            stats: WalkStats::default(),
        }
    }

    /// Walk every start node to its terminal k-mer and return the
    /// reconstructed contigs, in start-node order.
    pub fn run(
        mut self,
        start_nodes: Vec<KmerEntry<K>>,
    ) -> Result<(Vec<Contig<K>>, WalkStats), AssemblyError> {
        self.cursors = start_nodes
            .into_iter()
            .map(|entry| Cursor {
                chain: vec![entry],
                state: CursorState::Ready,
            })
            .collect();
        self.stats.cursors = self.cursors.len() as u64;

        // A rank without start nodes is done before it begins; it still
        // participates by answering lookups until every rank reports in.
        self.maybe_broadcast_done()?;

        while self.ranks_done < self.comm.n_ranks() {
            let serviced = self.service_traffic()?;
            let advanced = self.advance_cursors()?;
            self.maybe_broadcast_done()?;
            if !serviced && !advanced {
                std::thread::yield_now();
            }
        }

        debug!(
            rank = self.comm.rank(),
            contigs = self.cursors.len(),
            reqs_sent = self.stats.lookup_reqs_sent,
            reqs_served = self.stats.lookup_reqs_served,
            "walk phase complete"
        );

        let contigs = self
            .cursors
            .into_iter()
            .map(|cursor| {
                debug_assert_eq!(cursor.state, CursorState::Done);
                Contig::new(cursor.chain)
            })
            .collect();
        Ok((contigs, self.stats))
    }

    /// Receive and dispatch every pending record; true if any arrived
    fn service_traffic(&mut self) -> Result<bool, AssemblyError> {
        let mut any = false;
        while let Some(frame) = self.comm.poll()? {
            any = true;
            match Message::<K>::decode(&frame)? {
                Message::LookupReq {
                    src_rank,
                    cursor_id,
                    key,
                } => {
                    let entry = self.table.try_find(self.partitioner.home_slot(&key), &key);
                    let reply = Message::LookupReply {
                        src_rank: self.comm.rank(),
                        cursor_id,
                        entry,
                    };
                    self.comm.post(src_rank, reply.encode())?;
                    self.stats.lookup_reqs_served += 1;
                }
                Message::LookupReply {
                    cursor_id, entry, ..
                } => {
                    self.stats.replies_received += 1;
                    let cursor = &mut self.cursors[cursor_id as usize];
                    debug_assert_eq!(cursor.state, CursorState::Waiting);
                    match entry {
                        Some(found) => {
                            cursor.chain.push(found);
                            cursor.state = CursorState::Ready;
                        }
                        None => {
                            let key = cursor
                                .chain
                                .last()
                                .and_then(|tail| tail.next_kmer())
                                .map(|k| k.to_string())
                                .unwrap_or_default();
                            return Err(AssemblyError::BrokenChain { key, cursor_id });
                        }
                    }
                }
                Message::Done { .. } => {
                    self.ranks_done += 1;
                    self.stats.done_tokens_received += 1;
                }
                Message::Insert { .. } => {
                    // Inserts cannot cross the barrier between phases
                    warn!(rank = self.comm.rank(), "unexpected INSERT record during walk phase");
                }
            }
        }
        Ok(any)
    }

    /// Advance every READY cursor by one k-mer; true if any moved
    fn advance_cursors(&mut self) -> Result<bool, AssemblyError> {
        let table = self.table;
        let partitioner = self.partitioner;
        let comm: &Endpoint = self.comm;
        let mut moved = false;

        for (idx, cursor) in self.cursors.iter_mut().enumerate() {
            if cursor.state != CursorState::Ready {
                continue;
            }
            let tail = match cursor.chain.last() {
                Some(tail) => *tail,
                None => continue,
            };

            if tail.is_terminal() {
                cursor.state = CursorState::Done;
                self.local_done += 1;
                moved = true;
                continue;
            }

            let cursor_id = idx as u64;
            let succ = match tail.next_kmer() {
                Some(succ) => succ,
                None => {
                    return Err(AssemblyError::BrokenChain {
                        key: tail.kmer.to_string(),
                        cursor_id,
                    })
                }
            };

            let owner = partitioner.owner(&succ);
            if owner == comm.rank() {
                match table.try_find(partitioner.home_slot(&succ), &succ) {
                    Some(found) => {
                        cursor.chain.push(found);
                        self.stats.local_advances += 1;
                        moved = true;
                    }
                    None => {
                        return Err(AssemblyError::BrokenChain {
                            key: succ.to_string(),
                            cursor_id,
                        })
                    }
                }
            } else {
                cursor.state = CursorState::Waiting;
                let req = Message::LookupReq {
                    src_rank: comm.rank(),
                    cursor_id,
                    key: succ,
                };
                comm.post(owner, req.encode())?;
                self.stats.lookup_reqs_sent += 1;
                moved = true;
            }
        }
        Ok(moved)
    }

    /// Once every local cursor is done, tell every rank (self included)
    fn maybe_broadcast_done(&mut self) -> Result<(), AssemblyError> {
        if self.broadcast_sent || self.local_done < self.cursors.len() {
            return Ok(());
        }
        let done = Message::<K>::Done {
            src_rank: self.comm.rank(),
        };
        let frame = done.encode();
        for dst in 0..self.comm.n_ranks() {
            self.comm.post(dst, frame)?;
        }
        self.broadcast_sent = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comm::Mesh;
    use crate::table::InsertOutcome;

    fn entry(s: &str, b: u8, f: u8) -> KmerEntry<3> {
        KmerEntry::from_parts(s, b, f).unwrap()
    }

    fn load_table(part: &Partitioner, entries: &[KmerEntry<3>]) -> SlotTable<3> {
        let mut table = SlotTable::new(part.slots_per_rank() as usize);
        for &e in entries {
            assert_eq!(
                table.try_insert(part.home_slot(&e.kmer), e),
                InsertOutcome::Inserted
            );
        }
        table
    }

    #[test]
    fn test_single_rank_walk() {
        let chain = [
            entry("ACT", b'F', b'G'),
            entry("CTG", b'A', b'T'),
            entry("TGT", b'C', b'F'),
        ];
        let part = Partitioner::new(1, 16, 1);
        let table = load_table(&part, &chain);
        let mut eps = Mesh::build(1, 16);
        let mut ep = eps.pop().unwrap();

        let coord = WalkCoordinator::new(&table, &mut ep, &part);
        let (contigs, stats) = coord.run(vec![chain[0]]).unwrap();

        assert_eq!(contigs.len(), 1);
        assert_eq!(contigs[0].to_string(), "ACTGT");
        assert_eq!(stats.local_advances, 2);
        assert_eq!(stats.lookup_reqs_sent, 0);
        assert_eq!(stats.done_tokens_received, 1);
    }

    #[test]
    fn test_walk_with_no_start_nodes_terminates() {
        let part = Partitioner::new(1, 16, 1);
        let table = SlotTable::<3>::new(16);
        let mut eps = Mesh::build(1, 16);
        let mut ep = eps.pop().unwrap();

        let coord = WalkCoordinator::new(&table, &mut ep, &part);
        let (contigs, stats) = coord.run(Vec::new()).unwrap();
        assert!(contigs.is_empty());
        assert_eq!(stats.done_tokens_received, 1);
    }

    #[test]
    fn test_broken_chain_is_fatal() {
        // ACT names a successor CTG that was never inserted
        let chain = [entry("ACT", b'F', b'G')];
        let part = Partitioner::new(1, 16, 1);
        let table = load_table(&part, &chain);
        let mut eps = Mesh::build(1, 16);
        let mut ep = eps.pop().unwrap();

        let coord = WalkCoordinator::new(&table, &mut ep, &part);
        let err = coord.run(vec![chain[0]]).unwrap_err();
        match err {
            AssemblyError::BrokenChain { key, cursor_id } => {
                assert_eq!(key, "CTG");
                assert_eq!(cursor_id, 0);
            }
            other => panic!("expected BrokenChain, got {other}"),
        }
    }

    #[test]
    fn test_two_rank_walk_resolves_remote_successors() {
        let chain = [
            entry("ACT", b'F', b'G'),
            entry("CTG", b'A', b'T'),
            entry("TGT", b'C', b'F'),
            entry("GGA", b'F', b'T'),
            entry("GAT", b'G', b'F'),
        ];
        let part = Partitioner::new(2, 16, 1);
        let eps = Mesh::build(2, 16);

        // Shard the table by ownership; stripe the start nodes by rank
        let shards: Vec<Vec<KmerEntry<3>>> = (0..2u32)
            .map(|rank| {
                chain
                    .iter()
                    .copied()
                    .filter(|e| part.owner(&e.kmer) == rank)
                    .collect()
            })
            .collect();
        let starts: Vec<Vec<KmerEntry<3>>> = vec![vec![chain[0]], vec![chain[3]]];

        let results: Vec<_> = std::thread::scope(|s| {
            eps.into_iter()
                .zip(shards)
                .zip(starts)
                .map(|((mut ep, shard), start)| {
                    let part = part.clone();
                    s.spawn(move || {
                        let table = load_table(&part, &shard);
                        let coord = WalkCoordinator::new(&table, &mut ep, &part);
                        coord.run(start)
                    })
                })
                .collect::<Vec<_>>()
                .into_iter()
                .map(|h| h.join().unwrap().unwrap())
                .collect()
        });

        let mut rendered: Vec<String> = results
            .iter()
            .flat_map(|(contigs, _)| contigs.iter().map(|c| c.to_string()))
            .collect();
        rendered.sort();
        assert_eq!(rendered, vec!["ACTGT".to_string(), "GGAT".to_string()]);

        // Every request was served and every reply applied
        let sent: u64 = results.iter().map(|(_, s)| s.lookup_reqs_sent).sum();
        let served: u64 = results.iter().map(|(_, s)| s.lookup_reqs_served).sum();
        let replied: u64 = results.iter().map(|(_, s)| s.replies_received).sum();
        assert_eq!(sent, served);
        assert_eq!(served, replied);

        for (_, stats) in &results {
            assert_eq!(stats.done_tokens_received, 2);
        }
    }
}
