//! Fixed-size wire records
//!
//! Every message exchanged between ranks is one 32-byte record, whatever
//! its kind, so the receive side never has to negotiate sizes. Fields are
//! little-endian at fixed offsets; the key field is the packed k-mer bits
//! widened to u128, which covers every supported K.
//!
//! Layout:
//!
//! | offset | width | field        |
//! |--------|-------|--------------|
//! | 0      | 1     | kind         |
//! | 1      | 4     | src_rank     |
//! | 5      | 8     | cursor_id    |
//! | 13     | 1     | backward_ext |
//! | 14     | 1     | forward_ext  |
//! | 15     | 1     | found flag   |
//! | 16     | 16    | key bits     |

use crate::kmer::{Kmer, KmerBits, KmerEntry};
use thiserror::Error;

/// Size in bytes of every wire record
pub const WIRE_RECORD_LEN: usize = 32;

/// One encoded wire record
pub type Frame = [u8; WIRE_RECORD_LEN];

const KIND_INSERT: u8 = 1;
const KIND_LOOKUP_REQ: u8 = 2;
const KIND_LOOKUP_REPLY: u8 = 3;
const KIND_DONE: u8 = 4;

/// Error type for record decoding
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WireError {
    /// The kind byte does not name a known message kind
    #[error("Unknown wire message kind: {0}")]
    UnknownKind(u8),
}

/// The four message kinds of the core protocol
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Message<const K: usize>
where
    Kmer<K>: KmerBits,
{
    /// Route a k-mer to its owning rank during the insertion phase
    Insert {
        /// Sending rank
        src_rank: u32,
        /// The k-mer to store, with extensions
        entry: KmerEntry<K>,
    },
    /// Ask the owner of `key` for the stored entry
    LookupReq {
        /// Requesting rank (the reply goes back here)
        src_rank: u32,
        /// Requester-local cursor index
        cursor_id: u64,
        /// Successor key to resolve
        key: Kmer<K>,
    },
    /// Answer to a [`Message::LookupReq`]
    LookupReply {
        /// Replying rank
        src_rank: u32,
        /// Cursor index copied from the request
        cursor_id: u64,
        /// The stored entry, or `None` if the key is absent
        entry: Option<KmerEntry<K>>,
    },
    /// The sender has finished all of its local walks
    Done {
        /// Finished rank
        src_rank: u32,
    },
}

impl<const K: usize> Message<K>
where
    Kmer<K>: KmerBits,
{
    /// Encode this message into a fixed-size record
    pub fn encode(&self) -> Frame {
        let mut frame = [0u8; WIRE_RECORD_LEN];
        match self {
            Message::Insert { src_rank, entry } => {
                frame[0] = KIND_INSERT;
                frame[1..5].copy_from_slice(&src_rank.to_le_bytes());
                frame[13] = entry.backward_ext;
                frame[14] = entry.forward_ext;
                frame[16..32].copy_from_slice(&entry.kmer.as_u128().to_le_bytes());
            }
            Message::LookupReq {
                src_rank,
                cursor_id,
                key,
            } => {
                frame[0] = KIND_LOOKUP_REQ;
                frame[1..5].copy_from_slice(&src_rank.to_le_bytes());
                frame[5..13].copy_from_slice(&cursor_id.to_le_bytes());
                frame[16..32].copy_from_slice(&key.as_u128().to_le_bytes());
            }
            Message::LookupReply {
                src_rank,
                cursor_id,
                entry,
            } => {
                frame[0] = KIND_LOOKUP_REPLY;
                frame[1..5].copy_from_slice(&src_rank.to_le_bytes());
                frame[5..13].copy_from_slice(&cursor_id.to_le_bytes());
                if let Some(entry) = entry {
                    frame[13] = entry.backward_ext;
                    frame[14] = entry.forward_ext;
                    frame[15] = 1;
                    frame[16..32].copy_from_slice(&entry.kmer.as_u128().to_le_bytes());
                }
            }
            Message::Done { src_rank } => {
                frame[0] = KIND_DONE;
                frame[1..5].copy_from_slice(&src_rank.to_le_bytes());
            }
        }
        frame
    }

    /// Decode a record back into a message
    ///
    /// # Errors
    /// Returns an error on an unknown kind byte.
    pub fn decode(frame: &Frame) -> Result<Self, WireError> {
        let src_rank = u32::from_le_bytes([frame[1], frame[2], frame[3], frame[4]]);
        let cursor_id = u64::from_le_bytes([
            frame[5], frame[6], frame[7], frame[8], frame[9], frame[10], frame[11], frame[12],
        ]);
        let mut key_bytes = [0u8; 16];
        key_bytes.copy_from_slice(&frame[16..32]);
        let key = Kmer::<K>::from_bits(u128::from_le_bytes(key_bytes));

        match frame[0] {
            KIND_INSERT => Ok(Message::Insert {
                src_rank,
                entry: KmerEntry::new(key, frame[13], frame[14]),
            }),
            KIND_LOOKUP_REQ => Ok(Message::LookupReq {
                src_rank,
                cursor_id,
                key,
            }),
            KIND_LOOKUP_REPLY => {
                let entry = if frame[15] != 0 {
                    Some(KmerEntry::new(key, frame[13], frame[14]))
                } else {
                    None
                };
                Ok(Message::LookupReply {
                    src_rank,
                    cursor_id,
                    entry,
                })
            }
            KIND_DONE => Ok(Message::Done { src_rank }),
            other => Err(WireError::UnknownKind(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(s: &str, b: u8, f: u8) -> KmerEntry<3> {
        KmerEntry::from_parts(s, b, f).unwrap()
    }

    #[test]
    fn test_insert_roundtrip() {
        let msg: Message<3> = Message::Insert {
            src_rank: 2,
            entry: entry("ACT", b'F', b'G'),
        };
        assert_eq!(Message::decode(&msg.encode()).unwrap(), msg);
    }

    #[test]
    fn test_lookup_req_roundtrip() {
        let msg: Message<3> = Message::LookupReq {
            src_rank: 1,
            cursor_id: 77,
            key: Kmer::from_str("CTG").unwrap(),
        };
        assert_eq!(Message::decode(&msg.encode()).unwrap(), msg);
    }

    #[test]
    fn test_lookup_reply_roundtrip() {
        let found: Message<3> = Message::LookupReply {
            src_rank: 0,
            cursor_id: 3,
            entry: Some(entry("TGT", b'C', b'F')),
        };
        assert_eq!(Message::decode(&found.encode()).unwrap(), found);

        let missing: Message<3> = Message::LookupReply {
            src_rank: 0,
            cursor_id: 3,
            entry: None,
        };
        assert_eq!(Message::decode(&missing.encode()).unwrap(), missing);
    }

    #[test]
    fn test_done_roundtrip() {
        let msg: Message<3> = Message::Done { src_rank: 9 };
        let frame = msg.encode();
        // The key field of a DONE record is zero-filled
        assert!(frame[5..].iter().all(|&b| b == 0));
        assert_eq!(Message::decode(&frame).unwrap(), msg);
    }

    #[test]
    fn test_record_size_is_fixed() {
        // Every kind encodes to the same record size by construction;
        // this pins the wire constant itself.
        assert_eq!(WIRE_RECORD_LEN, 32);
        assert_eq!(std::mem::size_of::<Frame>(), WIRE_RECORD_LEN);
    }

    #[test]
    fn test_unknown_kind_rejected() {
        let mut frame = [0u8; WIRE_RECORD_LEN];
        frame[0] = 9;
        assert!(matches!(
            Message::<3>::decode(&frame),
            Err(WireError::UnknownKind(9))
        ));
    }

    #[test]
    fn test_wide_key_roundtrip() {
        // K > 31 exercises the u128 storage path
        let msg: Message<33> = Message::LookupReq {
            src_rank: 4,
            cursor_id: 1,
            key: Kmer::from_str("ACGTACGTACGTACGTACGTACGTACGTACGTA").unwrap(),
        };
        assert_eq!(Message::decode(&msg.encode()).unwrap(), msg);
    }
}
