//! Rank-to-rank transport
//!
//! Point-to-point messaging between ranks over a full mesh of bounded
//! channels, one channel per ordered rank pair. The channel bound is the
//! send buffer pool: a [`Endpoint::post`] that cannot enqueue fails with
//! [`CommError::BufferExhausted`], which callers treat as fatal. One
//! channel per ordered pair gives per-sender FIFO delivery; nothing is
//! guaranteed across different senders.
//!
//! A separate control-plane mesh carries the two blocking collectives
//! (sum all-reduce and barrier) so collective values never interleave
//! with data records. Collectives are the only blocking calls; `post`
//! and `poll` never wait.

use crate::wire::Frame;
use crossbeam_channel::{bounded, Receiver, Sender, TryRecvError, TrySendError};
use thiserror::Error;

/// Capacity of each control-plane channel. A rank can run at most one
/// collective round ahead of the slowest peer, so a small constant bound
/// is enough to keep collective sends from blocking in practice.
const CTL_CHANNEL_CAP: usize = 8;

/// Error type for transport operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommError {
    /// The bounded send pool toward `dst` is full
    #[error("send buffer pool exhausted posting to rank {dst}")]
    BufferExhausted {
        /// Destination rank of the failed post
        dst: u32,
    },
    /// A peer endpoint was dropped (its rank failed and unwound)
    #[error("lost connection to rank {rank}")]
    Disconnected {
        /// The vanished peer
        rank: u32,
    },
}

/// One rank's connection to the mesh
///
/// Endpoints are created together by [`Mesh::build`] and then moved onto
/// their rank threads; after that the mesh is the only thing ranks share.
pub struct Endpoint {
    rank: u32,
    n_ranks: u32,
    data_tx: Vec<Sender<Frame>>,
    data_rx: Vec<Receiver<Frame>>,
    ctl_tx: Vec<Sender<u64>>,
    ctl_rx: Vec<Receiver<u64>>,
    // Rotating poll origin so no source can starve the others
    poll_cursor: usize,
}

/// Builder for the rank mesh
pub struct Mesh;

impl Mesh {
    /// Build a full mesh for `n_ranks` ranks where each ordered pair's
    /// data channel holds up to `pool_records` in-flight records.
    ///
    /// The self-loop channels are part of the mesh: a rank may post to
    /// itself (the walk phase's done-token broadcast relies on it).
    pub fn build(n_ranks: u32, pool_records: usize) -> Vec<Endpoint> {
        assert!(n_ranks > 0, "rank count must be positive");
        assert!(pool_records > 0, "send pool must hold at least one record");
        let n = n_ranks as usize;

        // data_tx[src][dst] pairs with data_rx[dst][src]
        let mut data_tx: Vec<Vec<Sender<Frame>>> = (0..n).map(|_| Vec::with_capacity(n)).collect();
        let mut data_rx: Vec<Vec<Receiver<Frame>>> = (0..n).map(|_| Vec::with_capacity(n)).collect();
        let mut ctl_tx: Vec<Vec<Sender<u64>>> = (0..n).map(|_| Vec::with_capacity(n)).collect();
        let mut ctl_rx: Vec<Vec<Receiver<u64>>> = (0..n).map(|_| Vec::with_capacity(n)).collect();

        // The outer loop is src-major, so data_tx[src] collects senders
        // in dst order and data_rx[dst] collects receivers in src order.
        for src in 0..n {
            for dst in 0..n {
                let (tx, rx) = bounded::<Frame>(pool_records);
                data_tx[src].push(tx);
                data_rx[dst].push(rx);
                let (ctx, crx) = bounded::<u64>(CTL_CHANNEL_CAP);
                ctl_tx[src].push(ctx);
                ctl_rx[dst].push(crx);
            }
        }

        data_tx
            .into_iter()
            .zip(ctl_tx)
            .zip(data_rx)
            .zip(ctl_rx)
            .enumerate()
            .map(|(rank, (((dtx, ctx), drx), crx))| Endpoint {
                rank: rank as u32,
                n_ranks,
                data_tx: dtx,
                data_rx: drx,
                ctl_tx: ctx,
                ctl_rx: crx,
                poll_cursor: 0,
            })
            .collect()
    }
}

impl Endpoint {
    /// This endpoint's rank
    #[inline]
    pub fn rank(&self) -> u32 {
        self.rank
    }

    /// Number of ranks in the mesh
    #[inline]
    pub fn n_ranks(&self) -> u32 {
        self.n_ranks
    }

    /// Enqueue one record toward `dst` without blocking.
    ///
    /// # Errors
    /// [`CommError::BufferExhausted`] when the pool toward `dst` is full,
    /// [`CommError::Disconnected`] when `dst` has unwound.
    pub fn post(&self, dst: u32, frame: Frame) -> Result<(), CommError> {
        match self.data_tx[dst as usize].try_send(frame) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => Err(CommError::BufferExhausted { dst }),
            Err(TrySendError::Disconnected(_)) => Err(CommError::Disconnected { rank: dst }),
        }
    }

    /// Probe for one incoming record from any source without blocking.
    ///
    /// Sources are scanned round-robin from a rotating origin so a
    /// chatty source cannot starve the others. Returns `Ok(None)` when
    /// no record is pending anywhere.
    ///
    /// # Errors
    /// [`CommError::Disconnected`] when a drained source has unwound.
    pub fn poll(&mut self) -> Result<Option<Frame>, CommError> {
        let n = self.n_ranks as usize;
        for i in 0..n {
            let src = (self.poll_cursor + i) % n;
            match self.data_rx[src].try_recv() {
                Ok(frame) => {
                    self.poll_cursor = (src + 1) % n;
                    return Ok(Some(frame));
                }
                Err(TryRecvError::Empty) => {}
                Err(TryRecvError::Disconnected) => {
                    return Err(CommError::Disconnected { rank: src as u32 })
                }
            }
        }
        Ok(None)
    }

    /// Wait until all locally posted records have been released to the
    /// transport.
    ///
    /// A channel-backed post hands its record to the transport the
    /// moment it is enqueued, so there is never anything left to wait
    /// for here.
    pub fn flush(&self) {}

    /// Blocking sum all-reduce over every rank.
    ///
    /// Each rank contributes `value`; all ranks return the same total.
    /// Alignment across consecutive collectives follows from per-pair
    /// FIFO: the j-th value received from a peer belongs to the j-th
    /// collective round.
    pub fn allreduce_sum(&self, value: u64) -> Result<u64, CommError> {
        for dst in 0..self.n_ranks as usize {
            if dst == self.rank as usize {
                continue;
            }
            self.ctl_tx[dst]
                .send(value)
                .map_err(|_| CommError::Disconnected { rank: dst as u32 })?;
        }

        let mut total = value;
        for src in 0..self.n_ranks as usize {
            if src == self.rank as usize {
                continue;
            }
            total += self.ctl_rx[src]
                .recv()
                .map_err(|_| CommError::Disconnected { rank: src as u32 })?;
        }
        Ok(total)
    }

    /// Blocking barrier over every rank
    pub fn barrier(&self) -> Result<(), CommError> {
        self.allreduce_sum(0).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::WIRE_RECORD_LEN;

    fn frame(tag: u8) -> Frame {
        let mut f = [0u8; WIRE_RECORD_LEN];
        f[0] = tag;
        f
    }

    #[test]
    fn test_post_then_poll() {
        let mut eps = Mesh::build(2, 4);
        let mut b = eps.pop().unwrap();
        let a = eps.pop().unwrap();

        a.post(1, frame(7)).unwrap();
        let got = b.poll().unwrap().unwrap();
        assert_eq!(got[0], 7);
        assert!(b.poll().unwrap().is_none());
    }

    #[test]
    fn test_per_sender_fifo() {
        let mut eps = Mesh::build(2, 8);
        let mut b = eps.pop().unwrap();
        let a = eps.pop().unwrap();

        for tag in 0..5 {
            a.post(1, frame(tag)).unwrap();
        }
        for expected in 0..5 {
            assert_eq!(b.poll().unwrap().unwrap()[0], expected);
        }
    }

    #[test]
    fn test_self_loop() {
        let mut eps = Mesh::build(1, 4);
        let mut a = eps.pop().unwrap();
        a.post(0, frame(3)).unwrap();
        assert_eq!(a.poll().unwrap().unwrap()[0], 3);
    }

    #[test]
    fn test_buffer_exhausted() {
        let mut eps = Mesh::build(2, 2);
        let _b = eps.pop().unwrap();
        let a = eps.pop().unwrap();

        a.post(1, frame(0)).unwrap();
        a.post(1, frame(1)).unwrap();
        assert_eq!(
            a.post(1, frame(2)),
            Err(CommError::BufferExhausted { dst: 1 })
        );
    }

    #[test]
    fn test_poll_rotates_between_sources() {
        let mut eps = Mesh::build(3, 4);
        let c = eps.pop().unwrap();
        let b = eps.pop().unwrap();
        let mut a = eps.pop().unwrap();

        b.post(0, frame(1)).unwrap();
        b.post(0, frame(1)).unwrap();
        c.post(0, frame(2)).unwrap();

        // With both sources non-empty the second poll must not return
        // the same source again.
        let first = a.poll().unwrap().unwrap()[0];
        let second = a.poll().unwrap().unwrap()[0];
        assert_ne!(first, second);
    }

    #[test]
    fn test_disconnected_peer_surfaces() {
        let mut eps = Mesh::build(2, 2);
        let b = eps.pop().unwrap();
        let a = eps.pop().unwrap();
        drop(b);

        assert_eq!(
            a.post(1, frame(0)),
            Err(CommError::Disconnected { rank: 1 })
        );
    }

    #[test]
    fn test_allreduce_sum() {
        let eps = Mesh::build(3, 4);
        let handles: Vec<_> = eps
            .into_iter()
            .map(|ep| {
                std::thread::spawn(move || {
                    let mine = ep.rank() as u64 + 1;
                    ep.allreduce_sum(mine).unwrap()
                })
            })
            .collect();
        for h in handles {
            assert_eq!(h.join().unwrap(), 6);
        }
    }

    #[test]
    fn test_consecutive_collectives_stay_aligned() {
        let eps = Mesh::build(2, 4);
        let handles: Vec<_> = eps
            .into_iter()
            .map(|ep| {
                std::thread::spawn(move || {
                    let r1 = ep.allreduce_sum(1).unwrap();
                    let r2 = ep.allreduce_sum(10).unwrap();
                    ep.barrier().unwrap();
                    (r1, r2)
                })
            })
            .collect();
        for h in handles {
            assert_eq!(h.join().unwrap(), (2, 20));
        }
    }
}
