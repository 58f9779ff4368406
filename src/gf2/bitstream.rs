//! Bit streams — the glue between raw bytes, units and derivation records
//!
//! Everything is LSB-first: bit `b` of byte `k` is stream bit `8k + b`, and
//! a `w`-bit unit read at offset `o` takes stream bits `o..o + w`. With
//! `w = 8` a unit's value is exactly the byte it came from.

use super::unit::{low_mask, Unit, WORD_BITS};
use crate::error::{CanonError, Result};

/// Append-only packed bit sequence
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BitStream {
    words: Vec<u64>,
    len: usize,
}

impl BitStream {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap raw bytes as a stream of `8 * bytes.len()` bits
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let words = bytes
            .chunks(8)
            .map(|chunk| {
                let mut buf = [0u8; 8];
                buf[..chunk.len()].copy_from_slice(chunk);
                u64::from_le_bytes(buf)
            })
            .collect();
        Self {
            words,
            len: bytes.len() * 8,
        }
    }

    /// Concatenate units in order
    pub fn from_units<'a>(units: impl IntoIterator<Item = &'a Unit>) -> Self {
        let mut stream = Self::new();
        for unit in units {
            stream.push_unit(unit);
        }
        stream
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Append the low `count` bits of `value` (`count <= 64`)
    pub fn push_bits(&mut self, value: u64, count: usize) {
        if count == 0 {
            return;
        }
        let value = value & low_mask(count);
        let offset = self.len % WORD_BITS;
        if offset == 0 {
            self.words.push(value);
        } else {
            if let Some(last) = self.words.last_mut() {
                *last |= value << offset;
            }
            if offset + count > WORD_BITS {
                self.words.push(value >> (WORD_BITS - offset));
            }
        }
        self.len += count;
    }

    pub fn push_unit(&mut self, unit: &Unit) {
        let mut remaining = unit.width();
        for word in unit.words() {
            let take = remaining.min(WORD_BITS);
            self.push_bits(*word, take);
            remaining -= take;
        }
    }

    /// Read `count` bits (`count <= 64`) starting at `offset`; bits past the
    /// end read as zero
    pub fn read_bits(&self, offset: usize, count: usize) -> u64 {
        if count == 0 {
            return 0;
        }
        let index = offset / WORD_BITS;
        let shift = offset % WORD_BITS;
        let mut value = self.words.get(index).copied().unwrap_or(0) >> shift;
        if shift + count > WORD_BITS {
            value |= self.words.get(index + 1).copied().unwrap_or(0) << (WORD_BITS - shift);
        }
        value & low_mask(count)
    }

    /// Read a `width`-bit unit starting at `offset`
    pub fn read_unit(&self, offset: usize, width: usize) -> Unit {
        let mut words = Vec::with_capacity(width.div_ceil(WORD_BITS));
        let mut done = 0;
        while done < width {
            let take = (width - done).min(WORD_BITS);
            words.push(self.read_bits(offset + done, take));
            done += take;
        }
        Unit::from_words(words, width)
    }

    /// Cut the stream into `width`-bit units, zero-padding the last one
    pub fn chunk(&self, width: usize) -> Vec<Unit> {
        if width == 0 {
            return Vec::new();
        }
        (0..self.len.div_ceil(width))
            .map(|i| self.read_unit(i * width, width))
            .collect()
    }

    /// True when every bit at or after `from` is zero
    pub fn is_zero_from(&self, from: usize) -> bool {
        let mut offset = from;
        while offset < self.len {
            let take = (self.len - offset).min(WORD_BITS);
            if self.read_bits(offset, take) != 0 {
                return false;
            }
            offset += take;
        }
        true
    }

    /// Packed bytes, `ceil(len / 8)` of them
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes: Vec<u8> = self.words.iter().flat_map(|w| w.to_le_bytes()).collect();
        bytes.truncate(self.len.div_ceil(8));
        bytes
    }
}

/// Number of `width`-bit units needed to carry `bits` bits
pub fn units_for_bits(bits: usize, width: usize) -> usize {
    if width == 0 {
        0
    } else {
        bits.div_ceil(width)
    }
}

/// Empty vector with room for `len` items, or a format error when a declared
/// size cannot be allocated
pub fn try_with_capacity<T>(len: usize, what: &str) -> Result<Vec<T>> {
    let mut out = Vec::new();
    out.try_reserve_exact(len).map_err(|_| {
        CanonError::FormatError(format!("cannot allocate {} {}", len, what))
    })?;
    Ok(out)
}

/// Read raw bytes as a sequence of `width`-bit units
pub fn units_from_bytes(bytes: &[u8], width: usize) -> Vec<Unit> {
    BitStream::from_bytes(bytes).chunk(width)
}

/// Inverse of [`units_from_bytes`]: concatenate the units and keep the first
/// `byte_len` bytes. Any set bit beyond them is a format error.
pub fn bytes_from_units(units: &[Unit], byte_len: usize) -> Result<Vec<u8>> {
    let bits = byte_len
        .checked_mul(8)
        .ok_or_else(|| CanonError::FormatError(format!("{} bytes is too large", byte_len)))?;
    let stream = BitStream::from_units(units);
    if stream.len() < bits {
        return Err(CanonError::FormatError(format!(
            "units carry {} bits, {} bytes need {}",
            stream.len(),
            byte_len,
            bits
        )));
    }
    if !stream.is_zero_from(bits) {
        return Err(CanonError::FormatError(
            "non-zero padding after the last input byte".into(),
        ));
    }
    let mut bytes = stream.to_bytes();
    bytes.truncate(byte_len);
    Ok(bytes)
}

/// Re-cut a sequence of units into `width`-bit units (zero-padded)
pub fn rechunk(units: &[Unit], width: usize) -> Vec<Unit> {
    BitStream::from_units(units).chunk(width)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_byte_units_match_byte_values() {
        let data = [0x00u8, 0x05, 0xff, 0x80];
        let units = units_from_bytes(&data, 8);
        let values: Vec<u64> = units.iter().map(|u| u.as_u64().unwrap()).collect();
        assert_eq!(values, vec![0x00, 0x05, 0xff, 0x80]);
        assert_eq!(bytes_from_units(&units, 4).unwrap(), data.to_vec());
    }

    #[test]
    fn test_bit_granularity() {
        let units = units_from_bytes(&[0b0000_0101], 1);
        assert_eq!(units.len(), 8);
        let bits: Vec<u64> = units.iter().map(|u| u.as_u64().unwrap()).collect();
        assert_eq!(bits, vec![1, 0, 1, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_odd_width_pads_last_unit() {
        let data = [0xab, 0xcd, 0xef];
        let units = units_from_bytes(&data, 7);
        assert_eq!(units.len(), 4); // 24 bits / 7 rounded up
        assert_eq!(bytes_from_units(&units, 3).unwrap(), data.to_vec());
    }

    #[test]
    fn test_wide_units_cross_words() {
        let data: Vec<u8> = (0..40u8).collect();
        let units = units_from_bytes(&data, 100);
        assert_eq!(units.len(), 4);
        assert_eq!(bytes_from_units(&units, data.len()).unwrap(), data);
    }

    #[test]
    fn test_padding_must_be_zero() {
        let units = vec![Unit::from_u64(0x1ff, 12)];
        assert!(bytes_from_units(&units, 1).is_err());
        assert!(bytes_from_units(&units, 2).is_err()); // 12 bits < 16
    }

    #[test]
    fn test_push_and_read_bits() {
        let mut s = BitStream::new();
        s.push_bits(0b101, 3);
        s.push_bits(u64::MAX, 64);
        s.push_bits(0b1, 1);
        assert_eq!(s.len(), 68);
        assert_eq!(s.read_bits(0, 3), 0b101);
        assert_eq!(s.read_bits(3, 64), u64::MAX);
        assert_eq!(s.read_bits(67, 1), 1);
        assert_eq!(s.read_bits(68, 10), 0);
        assert!(s.is_zero_from(68));
        assert!(!s.is_zero_from(60));
    }

    #[test]
    fn test_rechunk() {
        let records = vec![
            Unit::from_u64(0b11, 2),
            Unit::from_u64(0b01, 2),
            Unit::from_u64(0b10, 2),
        ];
        let units = rechunk(&records, 8);
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].as_u64(), Some(0b10_01_11));
        assert!(rechunk(&records, 0).is_empty());
    }

    #[test]
    fn test_units_for_bits() {
        assert_eq!(units_for_bits(0, 8), 0);
        assert_eq!(units_for_bits(9, 8), 2);
        assert_eq!(units_for_bits(10, 0), 0);
    }

    #[test]
    fn test_oversized_allocation_is_an_error() {
        let ok: Vec<Unit> = try_with_capacity(16, "units").unwrap();
        assert!(ok.capacity() >= 16);
        assert!(matches!(
            try_with_capacity::<Unit>(1usize << 62, "units"),
            Err(CanonError::FormatError(_))
        ));
        assert!(bytes_from_units(&[], usize::MAX).is_err());
    }
}
