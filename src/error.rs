use thiserror::Error;

// Unified error type for kreduce

#[derive(Error, Debug, Clone, PartialEq)]
pub enum KError {
    #[error("dimension mismatch: local sizes {left} and {right} differ")]
    DimensionMismatch { left: usize, right: usize },
    #[error("local index {index} out of range for slice of length {len}")]
    OutOfRange { index: usize, len: usize },
    #[error("invalid vector layout: {0}")]
    InvalidLayout(String),
    #[error("participation fraction {0} is outside (0, 1]")]
    InvalidFraction(f64),
    #[error("group {group} does not exist (hierarchy has {group_count} groups)")]
    InvalidGroup { group: usize, group_count: usize },
    #[error("hierarchy layout mismatch: {0}")]
    LayoutMismatch(&'static str),
    #[error("unsupported operation: {0}")]
    Unsupported(&'static str),
}
