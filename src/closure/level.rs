//! Closure levels
//!
//! A level pairs a basis with one derivation record per input unit. Its
//! records, concatenated and cut back into units of the same width, are the
//! raw input of the next level.

use crate::basis::{BasisSet, DerivationEncoder, DerivationRecord};
use crate::error::{CanonError, Result};
use crate::gf2::{try_with_capacity, units_for_bits, BitStream, Unit};
use log::debug;

/// A complete level: basis plus every derivation record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClosureLevel {
    basis: BasisSet,
    derivations: Vec<DerivationRecord>,
}

impl ClosureLevel {
    /// One forward pass over `units`
    pub fn build(units: &[Unit], width: usize) -> Result<Self> {
        let (basis, derivations) = DerivationEncoder::encode_incremental(units, width)?;
        debug!(
            "Built level: {} units of {} bits, rank {}",
            units.len(),
            width,
            basis.rank()
        );
        Ok(Self { basis, derivations })
    }

    /// Reassemble a level read back from storage
    pub fn from_parts(basis: BasisSet, derivations: Vec<DerivationRecord>) -> Result<Self> {
        if let Some(bad) = derivations.iter().find(|r| r.span() != basis.rank()) {
            return Err(CanonError::FormatError(format!(
                "derivation spans {} indices but rank is {}",
                bad.span(),
                basis.rank()
            )));
        }
        Ok(Self { basis, derivations })
    }

    pub fn width(&self) -> usize {
        self.basis.width()
    }

    pub fn unit_count(&self) -> usize {
        self.derivations.len()
    }

    pub fn rank(&self) -> usize {
        self.basis.rank()
    }

    pub fn basis(&self) -> &BasisSet {
        &self.basis
    }

    pub fn derivations(&self) -> &[DerivationRecord] {
        &self.derivations
    }

    /// Every unit of the stream is its own basis element; the closure step
    /// leaves such a level unchanged.
    pub fn is_fixed_point(&self) -> bool {
        self.rank() == self.unit_count()
    }

    /// All records back to back, `rank` bits each
    pub fn derivation_stream(&self) -> BitStream {
        BitStream::from_units(self.derivations.iter().map(|r| r.mask()))
    }

    /// Units the next level would read
    pub fn next_unit_count(&self) -> usize {
        units_for_bits(self.unit_count() * self.rank(), self.width())
    }

    /// The derivation stream cut into units of this level's width
    pub fn next_input(&self) -> Vec<Unit> {
        self.derivation_stream().chunk(self.width())
    }

    /// Evaluate every record against the basis
    pub fn reconstruct(&self) -> Result<Vec<Unit>> {
        self.derivations
            .iter()
            .map(|record| record.evaluate(&self.basis))
            .collect()
    }

    /// Drop the records, keeping what is needed to expand this level again
    /// from the next one
    pub fn retain(self) -> RetainedLevel {
        RetainedLevel {
            unit_count: self.derivations.len(),
            basis: self.basis,
        }
    }
}

/// A non-terminal level: its records live on as the next level's units
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetainedLevel {
    unit_count: usize,
    basis: BasisSet,
}

impl RetainedLevel {
    pub fn new(unit_count: usize, basis: BasisSet) -> Self {
        Self { unit_count, basis }
    }

    pub fn unit_count(&self) -> usize {
        self.unit_count
    }

    pub fn rank(&self) -> usize {
        self.basis.rank()
    }

    pub fn width(&self) -> usize {
        self.basis.width()
    }

    pub fn basis(&self) -> &BasisSet {
        &self.basis
    }

    /// Units of the stream that encodes this level's records
    pub fn stream_unit_count(&self) -> usize {
        units_for_bits(self.unit_count.saturating_mul(self.rank()), self.width())
    }

    /// Recover this level's units from the decoded units of the level above
    pub fn expand(&self, stream_units: &[Unit]) -> Result<Vec<Unit>> {
        if stream_units.len() != self.stream_unit_count() {
            return Err(CanonError::FormatError(format!(
                "level declares {} units of rank {} ({} stream units), got {}",
                self.unit_count,
                self.rank(),
                self.stream_unit_count(),
                stream_units.len()
            )));
        }
        let stream = BitStream::from_units(stream_units);
        let rank = self.rank();
        let bits = self.unit_count.checked_mul(rank).ok_or_else(|| {
            CanonError::FormatError(format!("{} records of rank {} overflow", self.unit_count, rank))
        })?;
        if !stream.is_zero_from(bits) {
            return Err(CanonError::FormatError(
                "non-zero padding after the last derivation record".into(),
            ));
        }
        let mut units = try_with_capacity(self.unit_count, "units")?;
        for i in 0..self.unit_count {
            units.push(
                DerivationRecord::from_mask(stream.read_unit(i * rank, rank)).evaluate(&self.basis)?,
            );
        }
        Ok(units)
    }
}
