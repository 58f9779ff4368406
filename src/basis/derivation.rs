//! Derivation records — which basis entries XOR back to each unit

use super::builder::{BasisBuilder, BasisSet};
use crate::error::{CanonError, Result};
use crate::gf2::Unit;
use std::fmt;

/// A set of basis indices stored as a bitmask over `span` possible indices.
/// Bit `j` set means basis entry `j` takes part.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct DerivationRecord {
    mask: Unit,
}

impl DerivationRecord {
    /// The empty set: the record of a zero unit
    pub fn empty(span: usize) -> Self {
        Self {
            mask: Unit::zero(span),
        }
    }

    pub fn from_indices(span: usize, indices: impl IntoIterator<Item = usize>) -> Result<Self> {
        let mut record = Self::empty(span);
        for index in indices {
            record.insert(index)?;
        }
        Ok(record)
    }

    /// Interpret a `span`-bit unit as an index set
    pub fn from_mask(mask: Unit) -> Self {
        Self { mask }
    }

    pub fn insert(&mut self, index: usize) -> Result<()> {
        if index >= self.mask.width() {
            return Err(CanonError::FormatError(format!(
                "derivation index {} out of range for {} basis entries",
                index,
                self.mask.width()
            )));
        }
        self.mask.set(index);
        Ok(())
    }

    /// Number of basis indices the record can name
    pub fn span(&self) -> usize {
        self.mask.width()
    }

    pub fn mask(&self) -> &Unit {
        &self.mask
    }

    /// Named indices in ascending order
    pub fn indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.mask.ones()
    }

    pub fn contains(&self, index: usize) -> bool {
        self.mask.get(index)
    }

    pub fn len(&self) -> usize {
        self.mask.count_ones()
    }

    pub fn is_empty(&self) -> bool {
        self.mask.is_zero()
    }

    /// Same set over a different number of indices; fails if a named index
    /// would fall outside it
    pub fn narrowed(&self, span: usize) -> Result<Self> {
        let mask = self.mask.resized(span).map_err(|_| {
            CanonError::FormatError(format!(
                "derivation names an index beyond rank {}",
                span
            ))
        })?;
        Ok(Self { mask })
    }

    /// Recover the unit: XOR of the named basis entries
    pub fn evaluate(&self, basis: &BasisSet) -> Result<Unit> {
        basis.combine(self)
    }
}

impl fmt::Debug for DerivationRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.indices()).finish()
    }
}

/// Produces one [`DerivationRecord`] per unit
pub struct DerivationEncoder;

impl DerivationEncoder {
    /// Derive every unit against an already finalized basis. Records span
    /// exactly `basis.rank()` indices. A unit outside the span is an error.
    pub fn encode(units: &[Unit], basis: &BasisSet) -> Result<Vec<DerivationRecord>> {
        units
            .iter()
            .enumerate()
            .map(|(index, unit)| {
                let reduction = basis.reduce(unit)?;
                if !reduction.residue.is_zero() {
                    return Err(CanonError::OutOfSpanError { index });
                }
                DerivationRecord::from_indices(basis.rank(), reduction.used)
            })
            .collect()
    }

    /// Build the basis and the records in the same forward pass. Produces the
    /// same records as [`DerivationEncoder::encode`] run on the final basis,
    /// since entries and pivots never change once assigned.
    pub fn encode_incremental(
        units: &[Unit],
        width: usize,
    ) -> Result<(BasisSet, Vec<DerivationRecord>)> {
        let mut builder = BasisBuilder::new(width);
        let mut records = Vec::with_capacity(units.len());
        for unit in units {
            records.push(builder.try_insert(unit)?.derivation);
        }
        let basis = builder.finish();
        let rank = basis.rank();
        let records = records
            .iter()
            .map(|r| r.narrowed(rank))
            .collect::<Result<Vec<_>>>()?;
        Ok((basis, records))
    }
}
