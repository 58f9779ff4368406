//! BitVectorSpace — fixed-width vectors over GF(2)
//!
//! A [`Unit`] is one vector; [`BitStream`] moves bits between raw bytes,
//! units of any width and packed derivation records.

mod unit;
pub mod bitstream;

pub use unit::{word_count, Unit, WORD_BITS};
pub use bitstream::{
    bytes_from_units, rechunk, try_with_capacity, units_for_bits, units_from_bytes, BitStream,
};
