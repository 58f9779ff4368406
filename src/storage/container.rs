//! CANON container — binary layout of a closure chain
//!
//! ```text
//! "CANON" | version u8 | flags u8 | width u32 | byte_len u64 | levels u32
//! per level:  unit_count u64 | rank u32 | rank basis units, ceil(width/8) bytes each
//! terminal derivation stream, ceil(unit_count * rank / 8) bytes
//! SHA-256 of everything above
//! ```
//!
//! Integers are little-endian. Flags: bit 0 clear only for single-level runs,
//! bits 1-2 carry the termination code.

use crate::basis::{BasisSet, DerivationRecord};
use crate::closure::{ClosureChain, ClosureLevel, Reconstructor, RetainedLevel, Termination};
use crate::config::validate_unit_width;
use crate::error::{CanonError, Result};
use crate::gf2::{try_with_capacity, units_for_bits, BitStream, Unit};
use sha2::{Digest, Sha256};

pub const MAGIC: &[u8; 5] = b"CANON";
pub const FORMAT_VERSION: u8 = 1;
pub const CHECKSUM_LEN: usize = 32;

const FLAG_RECURSIVE: u8 = 0b0000_0001;
const TERMINATION_SHIFT: u8 = 1;
const TERMINATION_MASK: u8 = 0b0000_0110;
const RESERVED_FLAGS: u8 = !(FLAG_RECURSIVE | TERMINATION_MASK);

/// A closure chain together with the length of the input it encodes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Container {
    byte_len: usize,
    chain: ClosureChain,
}

impl Container {
    pub fn new(byte_len: usize, chain: ClosureChain) -> Result<Self> {
        let bits = byte_len
            .checked_mul(8)
            .ok_or_else(|| CanonError::FormatError(format!("input length {} too large", byte_len)))?;
        let expected = units_for_bits(bits, chain.width());
        if chain.unit_count() != expected {
            return Err(CanonError::FormatError(format!(
                "level 0 declares {} units, {} bytes at width {} need {}",
                chain.unit_count(),
                byte_len,
                chain.width(),
                expected
            )));
        }
        Ok(Self { byte_len, chain })
    }

    pub fn byte_len(&self) -> usize {
        self.byte_len
    }

    pub fn chain(&self) -> &ClosureChain {
        &self.chain
    }

    pub fn into_chain(self) -> ClosureChain {
        self.chain
    }

    /// Reconstruct the original bytes
    pub fn decode_data(&self) -> Result<Vec<u8>> {
        Reconstructor::decode_bytes(&self.chain, self.byte_len)
    }

    /// Serialize, checksum trailer included
    pub fn encode(&self) -> Vec<u8> {
        let chain = &self.chain;
        let termination = chain.termination();
        let mut flags = termination.code() << TERMINATION_SHIFT;
        if termination != Termination::Disabled {
            flags |= FLAG_RECURSIVE;
        }

        let mut out = Vec::new();
        out.extend_from_slice(MAGIC);
        out.push(FORMAT_VERSION);
        out.push(flags);
        out.extend_from_slice(&(chain.width() as u32).to_le_bytes());
        out.extend_from_slice(&(self.byte_len as u64).to_le_bytes());
        out.extend_from_slice(&(chain.depth() as u32).to_le_bytes());

        let levels = chain
            .retained()
            .iter()
            .map(|level| (level.unit_count(), level.basis()))
            .chain(std::iter::once((
                chain.terminal().unit_count(),
                chain.terminal().basis(),
            )));
        for (unit_count, basis) in levels {
            out.extend_from_slice(&(unit_count as u64).to_le_bytes());
            out.extend_from_slice(&(basis.rank() as u32).to_le_bytes());
            for entry in basis.entries() {
                out.extend_from_slice(&entry.to_le_bytes());
            }
        }
        out.extend_from_slice(&chain.terminal().derivation_stream().to_bytes());

        let digest = Sha256::digest(&out);
        out.extend_from_slice(&digest);
        out
    }

    /// Parse and validate a serialized container
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < MAGIC.len() || &bytes[..MAGIC.len()] != MAGIC {
            return Err(CanonError::FormatError("not a CANON container".into()));
        }
        if bytes.len() < MAGIC.len() + CHECKSUM_LEN {
            return Err(CanonError::FormatError("truncated container".into()));
        }
        let (body, trailer) = bytes.split_at(bytes.len() - CHECKSUM_LEN);
        if Sha256::digest(body).as_slice() != trailer {
            return Err(CanonError::FormatError(
                "checksum mismatch: container is truncated or corrupted".into(),
            ));
        }

        let mut reader = Reader::new(body);
        reader.take(MAGIC.len(), "magic")?;

        let version = reader.u8("version")?;
        if version != FORMAT_VERSION {
            return Err(CanonError::FormatError(format!(
                "unsupported format version {}",
                version
            )));
        }

        let flags = reader.u8("flags")?;
        if flags & RESERVED_FLAGS != 0 {
            return Err(CanonError::FormatError(format!(
                "reserved flag bits set: {:#04x}",
                flags
            )));
        }
        let termination = Termination::from_code((flags & TERMINATION_MASK) >> TERMINATION_SHIFT)?;
        if (flags & FLAG_RECURSIVE != 0) != (termination != Termination::Disabled) {
            return Err(CanonError::FormatError(
                "recursion flag contradicts termination".into(),
            ));
        }

        let width = reader.u32("unit width")? as usize;
        validate_unit_width(width)
            .map_err(|_| CanonError::FormatError(format!("invalid unit width {}", width)))?;
        let byte_len = to_usize(reader.u64("byte length")?)?;
        let level_count = reader.u32("level count")? as usize;
        if level_count == 0 {
            return Err(CanonError::FormatError("container has no levels".into()));
        }
        if termination == Termination::Disabled && level_count != 1 {
            return Err(CanonError::FormatError(format!(
                "single-level container declares {} levels",
                level_count
            )));
        }

        let mut levels = Vec::new();
        for _ in 0..level_count {
            let unit_count = to_usize(reader.u64("unit count")?)?;
            let rank = reader.u32("rank")? as usize;
            if rank > width {
                return Err(CanonError::CapacityError { rank, width });
            }
            let entries = (0..rank)
                .map(|_| Unit::from_le_bytes(reader.take(width.div_ceil(8), "basis")?, width))
                .collect::<Result<Vec<_>>>()?;
            levels.push((unit_count, BasisSet::from_entries(width, entries)?));
        }
        check_shape(byte_len, width, &levels)?;

        let (terminal_count, terminal_basis) = levels
            .pop()
            .ok_or_else(|| CanonError::FormatError("container has no levels".into()))?;
        let rank = terminal_basis.rank();
        let bits = terminal_count
            .checked_mul(rank)
            .ok_or_else(|| CanonError::FormatError("derivation stream too large".into()))?;
        let stream = BitStream::from_bytes(reader.take(bits.div_ceil(8), "derivation stream")?);
        if !stream.is_zero_from(bits) {
            return Err(CanonError::FormatError(
                "non-zero padding after the last derivation record".into(),
            ));
        }
        let mut derivations = try_with_capacity(terminal_count, "derivation records")?;
        for i in 0..terminal_count {
            derivations.push(DerivationRecord::from_mask(stream.read_unit(i * rank, rank)));
        }

        if reader.remaining() != 0 {
            return Err(CanonError::FormatError(format!(
                "{} trailing bytes after the derivation stream",
                reader.remaining()
            )));
        }

        let terminal = ClosureLevel::from_parts(terminal_basis, derivations)?;
        if termination == Termination::FixedPoint && !terminal.is_fixed_point() {
            return Err(CanonError::FormatError(
                "terminal level is marked as a fixed point but is not one".into(),
            ));
        }
        let retained = levels
            .into_iter()
            .map(|(unit_count, basis)| RetainedLevel::new(unit_count, basis))
            .collect();
        let chain = ClosureChain::from_parts(retained, terminal, termination)?;
        Self::new(byte_len, chain)
    }
}

/// Hex SHA-256 of a serialized container's body, as stored in its trailer
pub fn checksum_hex(encoded: &[u8]) -> Option<String> {
    encoded
        .len()
        .checked_sub(CHECKSUM_LEN)
        .map(|body| hex::encode(&encoded[body..]))
}

/// Unit counts must follow from the input length and from each other:
/// `n_0 = ceil(8 * byte_len / W)` and `n_{k+1} = ceil(n_k * r_k / W)`
fn check_shape(byte_len: usize, width: usize, levels: &[(usize, BasisSet)]) -> Result<()> {
    let overflow = || CanonError::FormatError("declared sizes overflow".into());
    let mut expected = units_for_bits(byte_len.checked_mul(8).ok_or_else(overflow)?, width);
    for (depth, (unit_count, basis)) in levels.iter().enumerate() {
        if *unit_count != expected {
            return Err(CanonError::FormatError(format!(
                "level {} declares {} units, expected {}",
                depth, unit_count, expected
            )));
        }
        let bits = unit_count.checked_mul(basis.rank()).ok_or_else(overflow)?;
        expected = units_for_bits(bits, width);
    }
    Ok(())
}

fn to_usize(value: u64) -> Result<usize> {
    usize::try_from(value)
        .map_err(|_| CanonError::FormatError(format!("value {} does not fit in memory", value)))
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    fn take(&mut self, len: usize, what: &str) -> Result<&'a [u8]> {
        if len > self.remaining() {
            return Err(CanonError::FormatError(format!(
                "truncated container while reading {}",
                what
            )));
        }
        let slice = &self.bytes[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    fn u8(&mut self, what: &str) -> Result<u8> {
        Ok(self.take(1, what)?[0])
    }

    fn u32(&mut self, what: &str) -> Result<u32> {
        let mut buf = [0u8; 4];
        buf.copy_from_slice(self.take(4, what)?);
        Ok(u32::from_le_bytes(buf))
    }

    fn u64(&mut self, what: &str) -> Result<u64> {
        let mut buf = [0u8; 8];
        buf.copy_from_slice(self.take(8, what)?);
        Ok(u64::from_le_bytes(buf))
    }
}
