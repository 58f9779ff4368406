//! Error types shared by every CANON stage.

/// Errors raised while building, persisting or reading a closure
#[derive(Debug, thiserror::Error)]
pub enum CanonError {
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Format error: {0}")]
    FormatError(String),

    #[error("Capacity error: rank {rank} exceeds the maximum for unit width {width}")]
    CapacityError { rank: usize, width: usize },

    #[error("Closure did not reach a fixed point within {max_depth} levels")]
    NonTerminatingClosure { max_depth: usize },

    #[error("Unit {index} is not in the span of the basis")]
    OutOfSpanError { index: usize },

    #[error("Width mismatch: expected {expected} bits, found {found}")]
    WidthMismatch { expected: usize, found: usize },

    #[error("Config error: {0}")]
    ConfigError(String),
}

pub type Result<T> = std::result::Result<T, CanonError>;
