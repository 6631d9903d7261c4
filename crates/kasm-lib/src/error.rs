//! Assembly error taxonomy
//!
//! Every error here is fatal for the rank that hits it: nothing is
//! retried or recovered locally, the error propagates out of the phase
//! coordinators and terminates the run with a descriptive message.

use crate::comm::CommError;
use crate::encoding::EncodingError;
use crate::wire::WireError;
use thiserror::Error;

/// Fatal conditions of an assembly run
#[derive(Error, Debug)]
pub enum AssemblyError {
    /// The input file carries k-mers of a different length than this
    /// pipeline was instantiated for. Raised before any allocation.
    #[error("input contains {actual}-mers, but this pipeline expects {expected}-mers")]
    KmerLengthMismatch {
        /// K the pipeline was instantiated with
        expected: usize,
        /// K-mer length found in the input file
        actual: usize,
    },

    /// The input's k-mer length is outside the supported set
    #[error("unsupported k-mer length {0} (expected an odd length in [3, 63])")]
    UnsupportedKmerLength(usize),

    /// A local slot table ran out of slots; the reserve factor is
    /// misconfigured for this input.
    #[error("local hash table is full on rank {rank} ({slots} slots)")]
    TableFull {
        /// Rank whose table overflowed
        rank: u32,
        /// Configured slot count
        slots: usize,
    },

    /// The bounded send pool toward a peer filled up
    #[error("send buffer exhausted toward rank {dst}; raise the buffer factor")]
    BufferExhausted {
        /// Destination of the failed post
        dst: u32,
    },

    /// A peer rank failed and unwound mid-run
    #[error("rank {rank} disconnected mid-run")]
    RankDisconnected {
        /// The vanished peer
        rank: u32,
    },

    /// A walk required a successor k-mer that is not in the table
    #[error("broken chain: successor {key} of cursor {cursor_id} is missing from the input")]
    BrokenChain {
        /// Rendered successor key
        key: String,
        /// Cursor that needed it
        cursor_id: u64,
    },

    /// A received record could not be decoded
    #[error(transparent)]
    Wire(#[from] WireError),

    /// Input text could not be parsed into k-mers
    #[error(transparent)]
    Encoding(#[from] EncodingError),

    /// Underlying file I/O failure
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<CommError> for AssemblyError {
    fn from(err: CommError) -> Self {
        match err {
            CommError::BufferExhausted { dst } => AssemblyError::BufferExhausted { dst },
            CommError::Disconnected { rank } => AssemblyError::RankDisconnected { rank },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_comm_error_flattens() {
        let err: AssemblyError = CommError::BufferExhausted { dst: 3 }.into();
        assert!(matches!(err, AssemblyError::BufferExhausted { dst: 3 }));

        let err: AssemblyError = CommError::Disconnected { rank: 1 }.into();
        assert!(matches!(err, AssemblyError::RankDisconnected { rank: 1 }));
    }

    #[test]
    fn test_messages_are_descriptive() {
        let err = AssemblyError::KmerLengthMismatch {
            expected: 3,
            actual: 4,
        };
        assert!(err.to_string().contains("4-mers"));
        assert!(err.to_string().contains("3-mers"));
    }
}
