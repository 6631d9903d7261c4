//! DNA nucleotide encoding
//!
//! This module implements the 2-bit encoding scheme for DNA nucleotides
//! and the validation rules for extension characters. An extension is a
//! single character naming a k-mer's predecessor or successor base, or
//! `F` when the k-mer is terminal on that side.
//!
//! Encoding:
//! - A (65/97)  -> 00
//! - C (67/99)  -> 01
//! - G (71/103) -> 11
//! - T (84/116) -> 10

use crate::constants::TERMINAL_EXT;
use thiserror::Error;

/// Error type for encoding operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodingError {
    /// The input byte is not a valid DNA base (A/C/G/T)
    #[error("Invalid DNA base: {0:?}")]
    InvalidBase(u8),
    /// The input byte is not a valid extension (A/C/G/T/F)
    #[error("Invalid extension character: {0:?}")]
    InvalidExtension(u8),
    /// The input string is not a valid k-mer
    #[error("Invalid k-mer string: {0}")]
    InvalidKmer(String),
    /// The input string length does not match the expected k-mer length
    #[error("K-mer length mismatch: expected {expected}, got {actual}")]
    LengthMismatch {
        /// Expected k-mer length
        expected: usize,
        /// Actual string length
        actual: usize,
    },
}

/// Encode a single DNA nucleotide to 2 bits
#[inline]
pub const fn encode_base(base: u8) -> Result<u8, EncodingError> {
    match base {
        b'A' | b'a' => Ok(0b00),
        b'C' | b'c' => Ok(0b01),
        b'G' | b'g' => Ok(0b11),
        b'T' | b't' => Ok(0b10),
        _ => Err(EncodingError::InvalidBase(base)),
    }
}

/// Decode a 2-bit value to DNA nucleotide (uppercase)
#[inline]
pub const fn decode_base(bits: u8) -> u8 {
    match bits & 0b11 {
        0b00 => b'A',
        0b01 => b'C',
        0b11 => b'G',
        0b10 => b'T',
        _ => unreachable!(),
    }
}

/// Validate an extension character, normalizing to uppercase.
///
/// Valid extensions are the four bases plus the terminal sentinel `F`.
#[inline]
pub const fn validate_extension(ext: u8) -> Result<u8, EncodingError> {
    match ext {
        b'A' | b'C' | b'G' | b'T' | b'F' => Ok(ext),
        b'a' => Ok(b'A'),
        b'c' => Ok(b'C'),
        b'g' => Ok(b'G'),
        b't' => Ok(b'T'),
        b'f' => Ok(b'F'),
        _ => Err(EncodingError::InvalidExtension(ext)),
    }
}

/// Check whether an extension character is the terminal sentinel
#[inline]
pub const fn is_terminal_ext(ext: u8) -> bool {
    ext == TERMINAL_EXT
}
