//! CANON — Canonical basis compression over GF(2)
//!
//! Input bytes are cut into fixed-width bit units. A single forward pass
//! builds a basis of the space they span and records, for every unit, which
//! basis entries XOR back to it. The records themselves form a new bit
//! stream, which the recursive closure compresses again until nothing more
//! can be gained.

pub mod basis;
pub mod closure;
pub mod codec;
pub mod config;
pub mod error;
pub mod gf2;
pub mod stats;
pub mod storage;

pub use basis::{BasisBuilder, BasisSet, DerivationEncoder, DerivationRecord, Insertion};
pub use closure::{ClosureChain, ClosureLevel, Reconstructor, RecursiveClosure, Termination};
pub use codec::{compress, decompress, Compressed};
pub use config::CanonConfig;
pub use error::{CanonError, Result};
pub use gf2::{BitStream, Unit};
pub use stats::CompressionStats;
pub use storage::Container;
