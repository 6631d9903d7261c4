//! Contig materialization
//!
//! A contig is the ordered chain of k-mers a walk reconstructed from one
//! start node. Rendering is pure and local: the first k-mer is written
//! in full, then each link contributes its forward extension character
//! until the terminal `F`.

use crate::kmer::{Kmer, KmerBits, KmerEntry};
use std::fmt;
use std::io::Write;
use std::path::Path;

/// An assembled chain of k-mers
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Contig<const K: usize>
where
    Kmer<K>: KmerBits,
{
    kmers: Vec<KmerEntry<K>>,
}

impl<const K: usize> Contig<K>
where
    Kmer<K>: KmerBits,
{
    /// Wrap a completed chain. The chain must be non-empty, begin at a
    /// start node and end at a terminal node.
    pub fn new(kmers: Vec<KmerEntry<K>>) -> Self {
        debug_assert!(!kmers.is_empty());
        debug_assert!(kmers[0].is_start());
        debug_assert!(kmers[kmers.len() - 1].is_terminal());
        Self { kmers }
    }

    /// Number of k-mers in the chain
    #[inline]
    pub fn len(&self) -> usize {
        self.kmers.len()
    }

    /// True if the chain holds no k-mers (never the case for a chain
    /// produced by a walk)
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.kmers.is_empty()
    }

    /// The chained k-mers in walk order
    #[inline]
    pub fn kmers(&self) -> &[KmerEntry<K>] {
        &self.kmers
    }

    /// Length of the rendered DNA string: K bases for the first k-mer
    /// plus one per following link.
    #[inline]
    pub fn base_len(&self) -> usize {
        K + self.kmers.len() - 1
    }
}

impl<const K: usize> fmt::Display for Contig<K>
where
    Kmer<K>: KmerBits,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(first) = self.kmers.first() else {
            return Ok(());
        };
        write!(f, "{}", first.kmer)?;
        for entry in &self.kmers {
            if !entry.is_terminal() {
                write!(f, "{}", entry.forward_ext as char)?;
            }
        }
        Ok(())
    }
}

/// Write contigs one per line, the test-mode output format.
pub fn write_contigs<const K: usize, P: AsRef<Path>>(
    path: P,
    contigs: &[Contig<K>],
) -> std::io::Result<()>
where
    Kmer<K>: KmerBits,
{
    let mut out = std::io::BufWriter::new(std::fs::File::create(path)?);
    for contig in contigs {
        writeln!(out, "{}", contig)?;
    }
    out.flush()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(s: &str, b: u8, f: u8) -> KmerEntry<3> {
        KmerEntry::from_parts(s, b, f).unwrap()
    }

    #[test]
    fn test_render_single_chain() {
        let contig = Contig::new(vec![
            entry("ACT", b'F', b'G'),
            entry("CTG", b'A', b'T'),
            entry("TGT", b'C', b'F'),
        ]);
        assert_eq!(contig.to_string(), "ACTGT");
        assert_eq!(contig.len(), 3);
        assert_eq!(contig.base_len(), 5);
    }

    #[test]
    fn test_render_singleton() {
        let contig = Contig::new(vec![entry("GGA", b'F', b'F')]);
        assert_eq!(contig.to_string(), "GGA");
        assert_eq!(contig.base_len(), 3);
    }

    #[test]
    fn test_write_contigs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test_0.dat");

        let contigs = vec![
            Contig::new(vec![
                entry("ACT", b'F', b'G'),
                entry("CTG", b'A', b'T'),
                entry("TGT", b'C', b'F'),
            ]),
            Contig::new(vec![entry("GGA", b'F', b'T'), entry("GAT", b'G', b'F')]),
        ];
        write_contigs(&path, &contigs).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "ACTGT\nGGAT\n");
    }
}
