//! Reconstruction: undo a closure chain from the deepest level up

use super::recursive::ClosureChain;
use crate::error::{CanonError, Result};
use crate::gf2::{bytes_from_units, units_for_bits, Unit};
use log::debug;

pub struct Reconstructor;

impl Reconstructor {
    /// Level-0 units of `chain`
    pub fn decode(chain: &ClosureChain) -> Result<Vec<Unit>> {
        let mut units = chain.terminal().reconstruct()?;
        for (depth, level) in chain.retained().iter().enumerate().rev() {
            units = level.expand(&units)?;
            debug!("Expanded level {}: {} units", depth, units.len());
        }
        Ok(units)
    }

    /// Original bytes, given the input length recorded next to the chain
    pub fn decode_bytes(chain: &ClosureChain, byte_len: usize) -> Result<Vec<u8>> {
        let bits = byte_len
            .checked_mul(8)
            .ok_or_else(|| CanonError::FormatError(format!("{} bytes is too large", byte_len)))?;
        let expected = units_for_bits(bits, chain.width());
        if chain.unit_count() != expected {
            return Err(CanonError::FormatError(format!(
                "{} bytes need {} units of {} bits, chain has {}",
                byte_len,
                expected,
                chain.width(),
                chain.unit_count()
            )));
        }
        let units = Self::decode(chain)?;
        bytes_from_units(&units, byte_len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::closure::RecursiveClosure;
    use crate::gf2::units_from_bytes;

    #[test]
    fn test_decode_bytes_round_trip() {
        let input = b"abababababababababababababababab, then something else".to_vec();
        for width in [3usize, 8, 13, 64] {
            let units = units_from_bytes(&input, width);
            let chain = RecursiveClosure::new(16).run(&units, width).unwrap();
            let output = Reconstructor::decode_bytes(&chain, input.len()).unwrap();
            assert_eq!(output, input);
        }
    }

    #[test]
    fn test_decode_bytes_checks_length() {
        let units = units_from_bytes(b"hello", 8);
        let chain = RecursiveClosure::new(16).run(&units, 8).unwrap();
        assert!(matches!(
            Reconstructor::decode_bytes(&chain, 6),
            Err(CanonError::FormatError(_))
        ));
    }

    #[test]
    fn test_decode_empty() {
        let chain = RecursiveClosure::new(4).run(&[], 8).unwrap();
        assert!(Reconstructor::decode_bytes(&chain, 0).unwrap().is_empty());
    }
}
