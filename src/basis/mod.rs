//! Basis construction and derivation encoding
//!
//! [`BasisBuilder`] grows a [`BasisSet`] one unit at a time;
//! [`DerivationEncoder`] turns a unit sequence into one
//! [`DerivationRecord`] per unit. XORing the entries a record names gives
//! back that unit exactly.

mod builder;
mod derivation;

pub use builder::{BasisBuilder, BasisSet, Insertion, Reduction};
pub use derivation::{DerivationEncoder, DerivationRecord};
