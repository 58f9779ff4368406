//! Incremental Gaussian elimination over GF(2)
//!
//! A [`BasisSet`] grows append-only: indices handed out to earlier entries
//! never move, and its pivot table maps each entry's highest set bit to the
//! entry's index. No two entries share a pivot, so a `w`-bit basis holds at
//! most `w` entries.

use super::derivation::DerivationRecord;
use crate::error::{CanonError, Result};
use crate::gf2::Unit;
use std::collections::BTreeMap;

/// Ordered, linearly independent units plus their pivot table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasisSet {
    width: usize,
    entries: Vec<Unit>,
    /// pivot bit -> entry index
    pivots: BTreeMap<usize, usize>,
}

/// Outcome of reducing a unit against a basis
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reduction {
    /// What is left after elimination; zero iff the unit is in the span
    pub residue: Unit,
    /// Entry indices XORed in, in visit order (descending pivot)
    pub used: Vec<usize>,
}

impl BasisSet {
    pub fn new(width: usize) -> Self {
        Self {
            width,
            entries: Vec::new(),
            pivots: BTreeMap::new(),
        }
    }

    /// Rebuild a basis from stored entries, checking every invariant
    pub fn from_entries(width: usize, entries: Vec<Unit>) -> Result<Self> {
        if entries.len() > width {
            return Err(CanonError::CapacityError {
                rank: entries.len(),
                width,
            });
        }
        let mut basis = Self::new(width);
        for (index, entry) in entries.into_iter().enumerate() {
            if entry.width() != width {
                return Err(CanonError::WidthMismatch {
                    expected: width,
                    found: entry.width(),
                });
            }
            let pivot = entry.highest_set_bit().ok_or_else(|| {
                CanonError::FormatError(format!("basis entry {} is zero", index))
            })?;
            if let Some(other) = basis.pivots.get(&pivot) {
                return Err(CanonError::FormatError(format!(
                    "basis entries {} and {} share pivot bit {}",
                    other, index, pivot
                )));
            }
            basis.pivots.insert(pivot, index);
            basis.entries.push(entry);
        }
        Ok(basis)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn rank(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[Unit] {
        &self.entries
    }

    pub fn entry(&self, index: usize) -> Option<&Unit> {
        self.entries.get(index)
    }

    /// `(pivot bit, entry index)` pairs in ascending pivot order
    pub fn pivots(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.pivots.iter().map(|(&bit, &index)| (bit, index))
    }

    /// Entry index owning `bit` as its pivot
    pub fn pivot_index(&self, bit: usize) -> Option<usize> {
        self.pivots.get(&bit).copied()
    }

    /// Eliminate `unit` against the basis without changing it.
    ///
    /// The residue's highest bit is looked up in the pivot table and the
    /// owning entry XORed in until the residue is zero or its highest bit
    /// has no owner. Each step strictly lowers the highest bit, so entries
    /// are visited in descending pivot order and at most once.
    pub fn reduce(&self, unit: &Unit) -> Result<Reduction> {
        if unit.width() != self.width {
            return Err(CanonError::WidthMismatch {
                expected: self.width,
                found: unit.width(),
            });
        }
        let mut residue = unit.clone();
        let mut used = Vec::new();
        while let Some(bit) = residue.highest_set_bit() {
            let Some(&index) = self.pivots.get(&bit) else {
                break;
            };
            residue.xor_assign(&self.entries[index])?;
            used.push(index);
        }
        Ok(Reduction { residue, used })
    }

    /// Whether `unit` lies in the span of the basis
    pub fn spans(&self, unit: &Unit) -> Result<bool> {
        Ok(self.reduce(unit)?.residue.is_zero())
    }

    /// XOR together the entries named by `record`
    pub fn combine(&self, record: &DerivationRecord) -> Result<Unit> {
        let mut out = Unit::zero(self.width);
        for index in record.indices() {
            let entry = self.entries.get(index).ok_or_else(|| {
                CanonError::FormatError(format!(
                    "derivation names basis index {} but rank is {}",
                    index,
                    self.rank()
                ))
            })?;
            out.xor_assign(entry)?;
        }
        Ok(out)
    }

    /// Append a fully reduced, nonzero residue and return its index
    fn push(&mut self, residue: Unit) -> Result<usize> {
        if self.entries.len() >= self.width {
            return Err(CanonError::CapacityError {
                rank: self.entries.len() + 1,
                width: self.width,
            });
        }
        let pivot = residue
            .highest_set_bit()
            .ok_or_else(|| CanonError::FormatError("cannot insert the zero unit".into()))?;
        if self.pivots.contains_key(&pivot) {
            return Err(CanonError::FormatError(format!(
                "pivot bit {} already owned",
                pivot
            )));
        }
        let index = self.entries.len();
        self.pivots.insert(pivot, index);
        self.entries.push(residue);
        Ok(index)
    }
}

/// Result of offering one unit to a [`BasisBuilder`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Insertion {
    /// True when the unit contributed a new basis entry
    pub inserted: bool,
    /// Basis indices whose XOR equals the unit. Spans the unit width (the
    /// largest rank possible); narrow it to the final rank when the level
    /// is complete.
    pub derivation: DerivationRecord,
}

/// Single-pass basis construction
#[derive(Debug, Clone)]
pub struct BasisBuilder {
    basis: BasisSet,
    processed: usize,
}

impl BasisBuilder {
    pub fn new(width: usize) -> Self {
        Self {
            basis: BasisSet::new(width),
            processed: 0,
        }
    }

    /// Reduce `unit`; if a residue survives, append it (not the raw unit)
    /// as a new entry. Either way the returned derivation reproduces `unit`.
    pub fn try_insert(&mut self, unit: &Unit) -> Result<Insertion> {
        let Reduction { residue, used } = self.basis.reduce(unit)?;
        let mut derivation = DerivationRecord::from_indices(self.basis.width(), used)?;
        self.processed += 1;

        if residue.is_zero() {
            return Ok(Insertion {
                inserted: false,
                derivation,
            });
        }

        let index = self.basis.push(residue)?;
        derivation.insert(index)?;
        Ok(Insertion {
            inserted: true,
            derivation,
        })
    }

    pub fn rank(&self) -> usize {
        self.basis.rank()
    }

    /// Units offered so far
    pub fn processed(&self) -> usize {
        self.processed
    }

    pub fn basis(&self) -> &BasisSet {
        &self.basis
    }

    pub fn finish(self) -> BasisSet {
        self.basis
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn u8s(values: &[u64]) -> Vec<Unit> {
        values.iter().map(|&v| Unit::from_u64(v, 8)).collect()
    }

    fn indices(record: &DerivationRecord) -> Vec<usize> {
        record.indices().collect()
    }

    #[test]
    fn test_zero_unit_is_never_inserted() {
        let mut builder = BasisBuilder::new(8);
        let ins = builder.try_insert(&Unit::zero(8)).unwrap();
        assert!(!ins.inserted);
        assert!(ins.derivation.is_empty());
        assert_eq!(builder.rank(), 0);
        assert_eq!(builder.processed(), 1);
    }

    #[test]
    fn test_single_unit() {
        let mut builder = BasisBuilder::new(8);
        let ins = builder.try_insert(&Unit::from_u64(1, 8)).unwrap();
        assert!(ins.inserted);
        assert_eq!(indices(&ins.derivation), vec![0]);
        assert_eq!(builder.basis().entries(), &u8s(&[1])[..]);
    }

    #[test]
    fn test_dependent_combination() {
        let mut builder = BasisBuilder::new(8);
        let mut derivs = Vec::new();
        for unit in u8s(&[1, 2, 3]) {
            derivs.push(builder.try_insert(&unit).unwrap());
        }
        assert_eq!(builder.rank(), 2);
        assert_eq!(builder.basis().entries(), &u8s(&[1, 2])[..]);
        assert!(!derivs[2].inserted);
        assert_eq!(indices(&derivs[2].derivation), vec![0, 1]);
    }

    #[test]
    fn test_inserts_residue_not_raw_unit() {
        let mut builder = BasisBuilder::new(8);
        builder.try_insert(&Unit::from_u64(0b10, 8)).unwrap();
        let ins = builder.try_insert(&Unit::from_u64(0b11, 8)).unwrap();
        assert!(ins.inserted);
        assert_eq!(builder.basis().entry(1), Some(&Unit::from_u64(0b01, 8)));
        assert_eq!(indices(&ins.derivation), vec![0, 1]);
        assert_eq!(builder.basis().pivot_index(0), Some(1));
        assert_eq!(builder.basis().pivot_index(1), Some(0));
    }

    #[test]
    fn test_elimination_descends_pivots() {
        // 2 = 1 ^ 3; the second entry owns bit 1, the first bit 0
        let mut builder = BasisBuilder::new(8);
        builder.try_insert(&Unit::from_u64(1, 8)).unwrap();
        builder.try_insert(&Unit::from_u64(3, 8)).unwrap();
        let ins = builder.try_insert(&Unit::from_u64(2, 8)).unwrap();
        assert!(!ins.inserted);
        assert_eq!(indices(&ins.derivation), vec![0, 1]);
    }

    #[test]
    fn test_width_mismatch() {
        let mut builder = BasisBuilder::new(8);
        assert!(matches!(
            builder.try_insert(&Unit::from_u64(1, 4)),
            Err(CanonError::WidthMismatch { .. })
        ));
    }

    #[test]
    fn test_rank_bound_and_monotonic_rank() {
        let mut rng = StdRng::seed_from_u64(7);
        for width in [1usize, 3, 8, 13, 64, 70] {
            let mut builder = BasisBuilder::new(width);
            let mut last_rank = 0;
            for _ in 0..300 {
                let bits: Vec<usize> = (0..width).filter(|_| rng.gen_bool(0.5)).collect();
                let unit = Unit::from_bits(width, bits).unwrap();
                let ins = builder.try_insert(&unit).unwrap();
                let rank = builder.rank();
                assert!(rank >= last_rank);
                assert!(rank - last_rank <= 1);
                assert_eq!(ins.inserted, rank == last_rank + 1);
                assert!(rank <= width);
                last_rank = rank;
            }
        }
    }

    #[test]
    fn test_derivation_reproduces_unit() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut builder = BasisBuilder::new(16);
        // low-rank source: combinations of five generators
        let gens: Vec<u64> = (0..5).map(|_| rng.gen_range(1..1 << 16)).collect();
        for _ in 0..200 {
            let value = gens
                .iter()
                .filter(|_| rng.gen_bool(0.5))
                .fold(0u64, |acc, g| acc ^ g);
            let unit = Unit::from_u64(value, 16);
            let ins = builder.try_insert(&unit).unwrap();
            assert_eq!(builder.basis().combine(&ins.derivation).unwrap(), unit);
        }
        assert!(builder.rank() <= 5);
    }

    #[test]
    fn test_from_entries_validates() {
        let basis = BasisSet::from_entries(8, u8s(&[1, 6])).unwrap();
        assert_eq!(basis.rank(), 2);
        assert_eq!(basis.pivots().collect::<Vec<_>>(), vec![(0, 0), (2, 1)]);

        assert!(matches!(
            BasisSet::from_entries(8, u8s(&[1, 0])),
            Err(CanonError::FormatError(_))
        ));
        assert!(matches!(
            BasisSet::from_entries(8, u8s(&[4, 5])),
            Err(CanonError::FormatError(_))
        ));
        assert!(matches!(
            BasisSet::from_entries(2, vec![Unit::from_u64(1, 2); 3]),
            Err(CanonError::CapacityError { rank: 3, width: 2 })
        ));
    }

    #[test]
    fn test_capacity_error_on_full_basis() {
        let mut basis = BasisSet::new(2);
        basis.push(Unit::from_u64(1, 2)).unwrap();
        basis.push(Unit::from_u64(2, 2)).unwrap();
        assert!(matches!(
            basis.push(Unit::from_u64(3, 2)),
            Err(CanonError::CapacityError { rank: 3, width: 2 })
        ));
    }

    #[test]
    fn test_spans() {
        let basis = BasisSet::from_entries(8, u8s(&[0b100, 0b001])).unwrap();
        assert!(basis.spans(&Unit::from_u64(0b101, 8)).unwrap());
        assert!(!basis.spans(&Unit::from_u64(0b010, 8)).unwrap());
    }
}
