//! Unit — a fixed-width vector over GF(2)
//!
//! Bits are packed LSB-first into 64-bit words: bit `i` lives in
//! `words[i / 64]` at position `i % 64`. Bits at or above `width` are
//! always zero, so word-wise equality is vector equality.

use crate::error::{CanonError, Result};
use std::fmt;

/// Bits per storage word
pub const WORD_BITS: usize = 64;

/// Number of 64-bit words needed for `width` bits
pub fn word_count(width: usize) -> usize {
    width.div_ceil(WORD_BITS)
}

/// Mask selecting the low `bits` bits of a word (`bits <= 64`)
pub(crate) fn low_mask(bits: usize) -> u64 {
    if bits >= WORD_BITS {
        u64::MAX
    } else {
        (1u64 << bits) - 1
    }
}

/// A `width`-bit vector over GF(2). Immutable in spirit once read from input;
/// the mutating helpers exist for the elimination engine.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Unit {
    words: Vec<u64>,
    width: usize,
}

impl Unit {
    /// The zero vector of the given width
    pub fn zero(width: usize) -> Self {
        Self {
            words: vec![0; word_count(width)],
            width,
        }
    }

    /// Build a unit from its low 64 bits; bits at or above `width` are dropped
    pub fn from_u64(value: u64, width: usize) -> Self {
        let mut words = vec![0; word_count(width)];
        if let Some(first) = words.first_mut() {
            *first = value;
        }
        Self::from_words(words, width)
    }

    /// Build a unit from packed words, clearing anything above `width`
    pub(crate) fn from_words(mut words: Vec<u64>, width: usize) -> Self {
        words.resize(word_count(width), 0);
        let tail = width % WORD_BITS;
        if tail != 0 {
            if let Some(last) = words.last_mut() {
                *last &= low_mask(tail);
            }
        }
        Self { words, width }
    }

    /// Build a unit with exactly the listed bits set
    pub fn from_bits(width: usize, bits: impl IntoIterator<Item = usize>) -> Result<Self> {
        let mut unit = Self::zero(width);
        for bit in bits {
            if bit >= width {
                return Err(CanonError::WidthMismatch {
                    expected: width,
                    found: bit + 1,
                });
            }
            unit.set(bit);
        }
        Ok(unit)
    }

    /// Decode a unit from `ceil(width / 8)` little-endian bytes.
    /// Padding bits above `width` must be zero.
    pub fn from_le_bytes(bytes: &[u8], width: usize) -> Result<Self> {
        let expected = width.div_ceil(8);
        if bytes.len() != expected {
            return Err(CanonError::FormatError(format!(
                "unit of width {} needs {} bytes, got {}",
                width,
                expected,
                bytes.len()
            )));
        }
        let mut words = vec![0u64; word_count(width)];
        for (i, byte) in bytes.iter().enumerate() {
            words[i / 8] |= (*byte as u64) << ((i % 8) * 8);
        }
        let unit = Self::from_words(words.clone(), width);
        if unit.words != words {
            return Err(CanonError::FormatError(format!(
                "non-zero padding above bit {} in unit",
                width
            )));
        }
        Ok(unit)
    }

    /// Encode as `ceil(width / 8)` little-endian bytes
    pub fn to_le_bytes(&self) -> Vec<u8> {
        let mut bytes: Vec<u8> = self.words.iter().flat_map(|w| w.to_le_bytes()).collect();
        bytes.truncate(self.width.div_ceil(8));
        bytes
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub(crate) fn words(&self) -> &[u64] {
        &self.words
    }

    /// The value as a `u64` when the unit fits in one word
    pub fn as_u64(&self) -> Option<u64> {
        match self.words.as_slice() {
            [] => Some(0),
            [w] => Some(*w),
            _ => None,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.words.iter().all(|&w| w == 0)
    }

    /// Returns true if bit `i` is set; bits outside the width read as zero
    pub fn get(&self, i: usize) -> bool {
        if i >= self.width {
            return false;
        }
        (self.words[i / WORD_BITS] >> (i % WORD_BITS)) & 1 == 1
    }

    /// Sets bit `i`.
    ///
    /// # Panics
    /// Panics if `i >= width`.
    pub fn set(&mut self, i: usize) {
        assert!(i < self.width, "bit {} out of range for width {}", i, self.width);
        self.words[i / WORD_BITS] |= 1u64 << (i % WORD_BITS);
    }

    /// Index of the highest set bit, `None` for the zero vector
    pub fn highest_set_bit(&self) -> Option<usize> {
        for (i, word) in self.words.iter().enumerate().rev() {
            if *word != 0 {
                return Some(i * WORD_BITS + (WORD_BITS - 1 - word.leading_zeros() as usize));
            }
        }
        None
    }

    pub fn count_ones(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Indices of set bits in ascending order
    pub fn ones(&self) -> impl Iterator<Item = usize> + '_ {
        self.words.iter().enumerate().flat_map(|(i, &word)| OnesIter {
            word,
            base: i * WORD_BITS,
        })
    }

    /// Addition in GF(2), in place
    pub fn xor_assign(&mut self, other: &Unit) -> Result<()> {
        if self.width != other.width {
            return Err(CanonError::WidthMismatch {
                expected: self.width,
                found: other.width,
            });
        }
        for (a, b) in self.words.iter_mut().zip(&other.words) {
            *a ^= b;
        }
        Ok(())
    }

    /// Addition in GF(2)
    pub fn xor(&self, other: &Unit) -> Result<Unit> {
        let mut out = self.clone();
        out.xor_assign(other)?;
        Ok(out)
    }

    /// Same bits at a different width. Fails if a set bit would be lost.
    pub fn resized(&self, width: usize) -> Result<Unit> {
        if let Some(top) = self.highest_set_bit() {
            if top >= width {
                return Err(CanonError::WidthMismatch {
                    expected: width,
                    found: top + 1,
                });
            }
        }
        Ok(Self::from_words(self.words.clone(), width))
    }
}

struct OnesIter {
    word: u64,
    base: usize,
}

impl Iterator for OnesIter {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        if self.word == 0 {
            return None;
        }
        let bit = self.word.trailing_zeros() as usize;
        self.word &= self.word - 1;
        Some(self.base + bit)
    }
}

impl fmt::Debug for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Unit<{}>({})", self.width, self)
    }
}

impl fmt::Display for Unit {
    /// Binary, most significant bit first
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.width == 0 {
            return write!(f, "-");
        }
        for i in (0..self.width).rev() {
            f.write_str(if self.get(i) { "1" } else { "0" })?;
        }
        Ok(())
    }
}
