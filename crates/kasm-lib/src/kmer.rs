//! Packed k-mer representation with const generics
//!
//! This module implements the k-mer key type using const generics to
//! support all odd k-mer sizes from 3 to 63. Storage is automatically
//! selected (u64 for K <= 31, u128 for K > 31).
//!
//! A bare [`Kmer`] is the hash-table key: equality, ordering and hashing
//! are defined over the packed bits only. A [`KmerEntry`] pairs the key
//! with its two extension characters, which travel with the key but do
//! not participate in identity.

use crate::encoding::{decode_base, encode_base, is_terminal_ext, validate_extension, EncodingError};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Trait defining optimal storage type for a given K
///
/// This trait is implemented for all valid odd K values from 3 to 63.
/// - K <= 31: uses u64 (8 bytes)
/// - K > 31: uses u128 (16 bytes)
pub trait KmerBits: Sized {
    /// The underlying storage type (u64 or u128)
    type Storage: Copy + Ord + Hash + fmt::Debug + Send;

    /// Number of bits in the storage type
    const BITS: usize;

    /// Convert storage to u8 (truncates)
    fn to_u8(val: Self::Storage) -> u8;

    /// Convert storage to u128
    fn to_u128(val: Self::Storage) -> u128;

    /// Convert u8 to storage
    fn from_u8(val: u8) -> Self::Storage;

    /// Convert u128 to storage (truncates)
    fn from_u128(val: u128) -> Self::Storage;

    /// Shift left on storage
    fn shl(val: Self::Storage, bits: usize) -> Self::Storage;

    /// Shift right on storage
    fn shr(val: Self::Storage, bits: usize) -> Self::Storage;

    /// Bitwise AND on storage
    fn bitand(a: Self::Storage, b: Self::Storage) -> Self::Storage;

    /// Bitwise OR on storage
    fn bitor(a: Self::Storage, b: Self::Storage) -> Self::Storage;
}

macro_rules! impl_kmer_bits {
    ($storage:ty, $bits:literal, $($k:literal),* $(,)?) => {
        $(
            impl KmerBits for Kmer<$k> {
                type Storage = $storage;
                const BITS: usize = $bits;

                #[inline]
                fn to_u8(val: Self::Storage) -> u8 {
                    val as u8
                }

                #[inline]
                fn to_u128(val: Self::Storage) -> u128 {
                    val as u128
                }

                #[inline]
                fn from_u8(val: u8) -> Self::Storage {
                    val as $storage
                }

                #[inline]
                fn from_u128(val: u128) -> Self::Storage {
                    val as $storage
                }

                #[inline]
                fn shl(val: Self::Storage, bits: usize) -> Self::Storage {
                    val << bits
                }

                #[inline]
                fn shr(val: Self::Storage, bits: usize) -> Self::Storage {
                    val >> bits
                }

                #[inline]
                fn bitand(a: Self::Storage, b: Self::Storage) -> Self::Storage {
                    a & b
                }

                #[inline]
                fn bitor(a: Self::Storage, b: Self::Storage) -> Self::Storage {
                    a | b
                }
            }
        )*
    };
}

impl_kmer_bits!(u64, 64, 3, 5, 7, 9, 11, 13, 15, 17, 19, 21, 23, 25, 27, 29, 31);
impl_kmer_bits!(u128, 128, 33, 35, 37, 39, 41, 43, 45, 47, 49, 51, 53, 55, 57, 59, 61, 63);

/// K-mer key with compile-time size and optimal storage
///
/// Bases are packed LSB-first: the base at string position `i` occupies
/// bits `2i..2i+2`. Equality, ordering and hashing are defined over the
/// packed bits only.
#[derive(Clone, Copy)]
pub struct Kmer<const K: usize>
where
    Kmer<K>: KmerBits,
{
    bits: <Kmer<K> as KmerBits>::Storage,
}

impl<const K: usize> Kmer<K>
where
    Kmer<K>: KmerBits,
{
    /// Create a new k-mer from raw bits
    #[inline]
    pub fn new(bits: <Kmer<K> as KmerBits>::Storage) -> Self {
        Self { bits }
    }

    /// Create a k-mer from a u128 value (truncated to storage size)
    #[inline]
    pub fn from_bits(bits: u128) -> Self {
        Self {
            bits: <Kmer<K> as KmerBits>::from_u128(bits),
        }
    }

    /// Get the raw bits
    #[inline]
    pub fn bits(&self) -> <Kmer<K> as KmerBits>::Storage {
        self.bits
    }

    /// Widen the packed bits to u128 (for hashing and wire encoding)
    #[inline]
    pub fn as_u128(&self) -> u128 {
        <Kmer<K> as KmerBits>::to_u128(self.bits)
    }

    /// Create a k-mer from a DNA string
    ///
    /// # Errors
    /// Returns an error if the string length doesn't match K or contains
    /// invalid bases.
    #[inline]
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Result<Self, EncodingError> {
        <Self as std::str::FromStr>::from_str(s)
    }

    /// Extract the base at a string position (0-indexed, 2-bit encoded)
    #[inline]
    pub fn get_base(&self, pos: usize) -> u8 {
        assert!(pos < K, "Position {} out of bounds for k-mer of length {}", pos, K);
        <Kmer<K> as KmerBits>::to_u8(<Kmer<K> as KmerBits>::bitand(
            <Kmer<K> as KmerBits>::shr(self.bits, pos * 2),
            <Kmer<K> as KmerBits>::from_u8(0b11),
        ))
    }

    /// Derive the successor key: drop the first base, append `base` at the
    /// last position.
    ///
    /// # Arguments
    /// * `base` - 2-bit encoded base (0=A, 1=C, 3=G, 2=T)
    #[inline]
    pub fn shift_append(self, base: u8) -> Self {
        assert!(base <= 0b11, "Base value must be 0-3");
        // Shifting right by 2 drops the base at position 0; the new base
        // lands at position K-1. No mask needed: bits stay below 2^(2K).
        let shifted = <Kmer<K> as KmerBits>::shr(self.bits, 2);
        let appended = <Kmer<K> as KmerBits>::shl(<Kmer<K> as KmerBits>::from_u8(base), 2 * (K - 1));
        Self {
            bits: <Kmer<K> as KmerBits>::bitor(shifted, appended),
        }
    }
}

impl<const K: usize> PartialEq for Kmer<K>
where
    Kmer<K>: KmerBits,
{
    fn eq(&self, other: &Self) -> bool {
        self.bits == other.bits
    }
}

impl<const K: usize> Eq for Kmer<K> where Kmer<K>: KmerBits {}

impl<const K: usize> PartialOrd for Kmer<K>
where
    Kmer<K>: KmerBits,
{
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl<const K: usize> Ord for Kmer<K>
where
    Kmer<K>: KmerBits,
{
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.bits.cmp(&other.bits)
    }
}

impl<const K: usize> Hash for Kmer<K>
where
    Kmer<K>: KmerBits,
{
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.bits.hash(state);
    }
}

impl<const K: usize> fmt::Debug for Kmer<K>
where
    Kmer<K>: KmerBits,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Kmer<{}>(\"{}\")", K, self)
    }
}

impl<const K: usize> fmt::Display for Kmer<K>
where
    Kmer<K>: KmerBits,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for pos in 0..K {
            write!(f, "{}", decode_base(self.get_base(pos)) as char)?;
        }
        Ok(())
    }
}

impl<const K: usize> Default for Kmer<K>
where
    Kmer<K>: KmerBits,
{
    fn default() -> Self {
        Self {
            bits: <Kmer<K> as KmerBits>::from_u8(0),
        }
    }
}

impl<const K: usize> std::str::FromStr for Kmer<K>
where
    Kmer<K>: KmerBits,
{
    type Err = EncodingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != K {
            return Err(EncodingError::LengthMismatch {
                expected: K,
                actual: s.len(),
            });
        }

        let mut bits = <Kmer<K> as KmerBits>::from_u8(0);
        for (i, &base) in s.as_bytes().iter().enumerate() {
            let encoded = encode_base(base)?;
            bits = <Kmer<K> as KmerBits>::bitor(
                bits,
                <Kmer<K> as KmerBits>::shl(<Kmer<K> as KmerBits>::from_u8(encoded), i * 2),
            );
        }

        Ok(Self { bits })
    }
}

/// A k-mer together with its two extension characters
///
/// `backward_ext` names the base preceding this k-mer in its contig and
/// `forward_ext` the base following it; either may be the terminal
/// sentinel `F`. Extensions are uppercase ASCII and are not part of the
/// key's identity.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KmerEntry<const K: usize>
where
    Kmer<K>: KmerBits,
{
    /// The packed k-mer key
    pub kmer: Kmer<K>,
    /// Predecessor base, or `F` if this k-mer starts a contig
    pub backward_ext: u8,
    /// Successor base, or `F` if this k-mer ends a contig
    pub forward_ext: u8,
}

impl<const K: usize> KmerEntry<K>
where
    Kmer<K>: KmerBits,
{
    /// Create an entry from an already-packed key and validated extensions
    #[inline]
    pub fn new(kmer: Kmer<K>, backward_ext: u8, forward_ext: u8) -> Self {
        Self {
            kmer,
            backward_ext,
            forward_ext,
        }
    }

    /// Parse an entry from its textual parts.
    ///
    /// # Errors
    /// Returns an error if the k-mer string has the wrong length or any
    /// character is outside the alphabet.
    pub fn from_parts(kmer: &str, backward_ext: u8, forward_ext: u8) -> Result<Self, EncodingError> {
        Ok(Self {
            kmer: Kmer::from_str(kmer)?,
            backward_ext: validate_extension(backward_ext)?,
            forward_ext: validate_extension(forward_ext)?,
        })
    }

    /// True if this k-mer has no predecessor, i.e. it seeds a contig
    #[inline]
    pub fn is_start(&self) -> bool {
        is_terminal_ext(self.backward_ext)
    }

    /// True if this k-mer has no successor, i.e. it ends a contig
    #[inline]
    pub fn is_terminal(&self) -> bool {
        is_terminal_ext(self.forward_ext)
    }

    /// Derive the successor key from the forward extension.
    ///
    /// Returns `None` when this entry is terminal.
    #[inline]
    pub fn next_kmer(&self) -> Option<Kmer<K>> {
        match encode_base(self.forward_ext) {
            Ok(base) => Some(self.kmer.shift_append(base)),
            Err(_) => None,
        }
    }
}

impl<const K: usize> fmt::Display for KmerEntry<K>
where
    Kmer<K>: KmerBits,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}{}",
            self.kmer, self.backward_ext as char, self.forward_ext as char
        )
    }
}
