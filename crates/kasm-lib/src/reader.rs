//! K-mer input file wrappers
//!
//! The input format is plain text, one record per line:
//! `<kmer><whitespace><backward_ext><forward_ext>`, for example
//! `ACT FG`. These wrappers answer the three questions the core asks of
//! a file: the k-mer size it carries, how many records it holds, and the
//! contiguous stripe of records a given rank should read.

use crate::error::AssemblyError;
use crate::kmer::{Kmer, KmerBits, KmerEntry};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// K-mer length carried by the file, read off the first record.
///
/// # Errors
/// I/O errors, or [`AssemblyError::Encoding`] on an empty or malformed
/// first line.
pub fn kmer_size<P: AsRef<Path>>(path: P) -> Result<usize, AssemblyError> {
    let reader = BufReader::new(File::open(path)?);
    for line in reader.lines() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let token = trimmed.split_whitespace().next().unwrap_or("");
        return Ok(token.len());
    }
    Err(AssemblyError::Encoding(
        crate::encoding::EncodingError::InvalidKmer("input file holds no records".into()),
    ))
}

/// Number of records (non-empty lines) in the file
pub fn line_count<P: AsRef<Path>>(path: P) -> Result<u64, AssemblyError> {
    let reader = BufReader::new(File::open(path)?);
    let mut count = 0u64;
    for line in reader.lines() {
        if !line?.trim().is_empty() {
            count += 1;
        }
    }
    Ok(count)
}

/// Read the stripe of records owned by `rank` out of `n_ranks`.
///
/// Stripes are contiguous line ranges balanced to within one record: the
/// first `total % n_ranks` ranks read one extra record each.
///
/// # Errors
/// I/O errors, or [`AssemblyError::Encoding`] when a record is malformed.
pub fn read_kmers<const K: usize, P: AsRef<Path>>(
    path: P,
    n_ranks: u32,
    rank: u32,
) -> Result<Vec<KmerEntry<K>>, AssemblyError>
where
    Kmer<K>: KmerBits,
{
    debug_assert!(rank < n_ranks);
    let reader = BufReader::new(File::open(path)?);

    let mut records = Vec::new();
    for line in reader.lines() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        records.push(parse_record::<K>(trimmed)?);
    }

    let total = records.len();
    let n = n_ranks as usize;
    let base = total / n;
    let extra = total % n;
    let start = rank as usize * base + (rank as usize).min(extra);
    let len = base + usize::from((rank as usize) < extra);

    Ok(records[start..start + len].to_vec())
}

/// Parse one `<kmer> <bwd><fwd>` record
fn parse_record<const K: usize>(line: &str) -> Result<KmerEntry<K>, AssemblyError>
where
    Kmer<K>: KmerBits,
{
    let mut parts = line.split_whitespace();
    let kmer = parts.next().unwrap_or("");
    let exts = parts.next().unwrap_or("").as_bytes();
    if exts.len() != 2 {
        return Err(AssemblyError::Encoding(
            crate::encoding::EncodingError::InvalidKmer(format!(
                "expected two extension characters, got {:?}",
                line
            )),
        ));
    }
    Ok(KmerEntry::from_parts(kmer, exts[0], exts[1])?)
}
