//! Rank-local open-addressed slot table
//!
//! Fixed-capacity array of slots probed linearly from a caller-supplied
//! home slot. The table is build-once/read-many: there are no deletions
//! and no tombstones, a FILLED slot is never overwritten or cleared, and
//! the table never resizes. Probing terminates because the load factor
//! bound guarantees an EMPTY slot exists; a full wrap without finding one
//! is reported as [`InsertOutcome::Full`] and treated as fatal by callers.
//!
//! Access is single-threaded by contract: only the owning rank touches
//! its table, and all cross-rank effects travel as messages.

use crate::kmer::{Kmer, KmerBits, KmerEntry};

/// Result of an insert attempt
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InsertOutcome {
    /// The key was absent and is now stored
    Inserted,
    /// A slot with this key already exists; the table is unchanged
    Duplicate,
    /// Every slot was probed without finding the key or an empty slot
    Full,
}

/// Open-addressed table of k-mer entries with linear probing
pub struct SlotTable<const K: usize>
where
    Kmer<K>: KmerBits,
{
    slots: Vec<Option<KmerEntry<K>>>,
    filled: usize,
}

impl<const K: usize> SlotTable<K>
where
    Kmer<K>: KmerBits,
{
    /// Create a table with `capacity` empty slots
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "table capacity must be positive");
        Self {
            slots: vec![None; capacity],
            filled: 0,
        }
    }

    /// Total number of slots
    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of FILLED slots
    #[inline]
    pub fn len(&self) -> usize {
        self.filled
    }

    /// True if no slot is FILLED
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.filled == 0
    }

    /// Insert an entry, probing linearly from `home`.
    ///
    /// Returns [`InsertOutcome::Duplicate`] without modifying the table
    /// when a FILLED slot already holds the same key.
    pub fn try_insert(&mut self, home: usize, entry: KmerEntry<K>) -> InsertOutcome {
        let m = self.slots.len();
        for i in 0..m {
            let idx = (home + i) % m;
            match &self.slots[idx] {
                None => {
                    self.slots[idx] = Some(entry);
                    self.filled += 1;
                    return InsertOutcome::Inserted;
                }
                Some(existing) if existing.kmer == entry.kmer => {
                    return InsertOutcome::Duplicate;
                }
                Some(_) => {}
            }
        }
        InsertOutcome::Full
    }

    /// Look up a key, probing linearly from `home`.
    ///
    /// Returns the stored entry (with extensions) on a key match, or
    /// `None` at the first EMPTY slot.
    pub fn try_find(&self, home: usize, key: &Kmer<K>) -> Option<KmerEntry<K>> {
        let m = self.slots.len();
        for i in 0..m {
            let idx = (home + i) % m;
            match &self.slots[idx] {
                None => return None,
                Some(entry) if entry.kmer == *key => return Some(*entry),
                Some(_) => {}
            }
        }
        None
    }

    /// Iterate over the FILLED slots
    pub fn iter(&self) -> impl Iterator<Item = &KmerEntry<K>> {
        self.slots.iter().flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(s: &str) -> KmerEntry<3> {
        KmerEntry::from_parts(s, b'F', b'F').unwrap()
    }

    #[test]
    fn test_insert_and_find() {
        let mut table = SlotTable::<3>::new(8);
        let e = entry("ACT");

        assert_eq!(table.try_insert(2, e), InsertOutcome::Inserted);
        assert_eq!(table.len(), 1);

        let found = table.try_find(2, &e.kmer).unwrap();
        assert_eq!(found, e);
    }

    #[test]
    fn test_find_missing_stops_at_empty() {
        let mut table = SlotTable::<3>::new(8);
        table.try_insert(0, entry("ACT"));

        let other = entry("GGG");
        assert!(table.try_find(0, &other.kmer).is_none());
        assert!(table.try_find(5, &other.kmer).is_none());
    }

    #[test]
    fn test_duplicate_leaves_first_entry() {
        let mut table = SlotTable::<3>::new(8);
        let first = KmerEntry::<3>::from_parts("ACT", b'F', b'G').unwrap();
        let dup = KmerEntry::<3>::from_parts("ACT", b'C', b'T').unwrap();

        assert_eq!(table.try_insert(1, first), InsertOutcome::Inserted);
        assert_eq!(table.try_insert(1, dup), InsertOutcome::Duplicate);
        assert_eq!(table.len(), 1);

        // The original extensions survive
        let found = table.try_find(1, &first.kmer).unwrap();
        assert_eq!(found.forward_ext, b'G');
    }

    #[test]
    fn test_probe_wraps_around() {
        let mut table = SlotTable::<3>::new(4);
        let a = entry("AAA");
        let b = entry("CCC");

        // Same home slot near the end of the array forces a wrap
        assert_eq!(table.try_insert(3, a), InsertOutcome::Inserted);
        assert_eq!(table.try_insert(3, b), InsertOutcome::Inserted);

        assert_eq!(table.try_find(3, &a.kmer).unwrap(), a);
        assert_eq!(table.try_find(3, &b.kmer).unwrap(), b);
    }

    #[test]
    fn test_full_table() {
        let mut table = SlotTable::<3>::new(2);
        assert_eq!(table.try_insert(0, entry("AAA")), InsertOutcome::Inserted);
        assert_eq!(table.try_insert(0, entry("CCC")), InsertOutcome::Inserted);
        assert_eq!(table.try_insert(0, entry("GGG")), InsertOutcome::Full);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_iter_counts_filled() {
        let mut table = SlotTable::<3>::new(8);
        table.try_insert(0, entry("AAA"));
        table.try_insert(4, entry("CCC"));
        assert_eq!(table.iter().count(), 2);
    }
}
