//! Closure — basis construction applied level after level

mod level;
mod reconstruct;
mod recursive;

pub use level::{ClosureLevel, RetainedLevel};
pub use reconstruct::Reconstructor;
pub use recursive::{ClosureChain, RecursiveClosure, Termination};
