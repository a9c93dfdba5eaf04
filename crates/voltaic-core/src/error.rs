//! Error types for voltaic-core.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    #[error("index {index} out of range for vector of length {len}")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("length mismatch: expected {expected}, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("invalid range {start}..{end} for vector of length {len}")]
    InvalidRange {
        start: usize,
        end: usize,
        len: usize,
    },

    #[error("vector length {len} exceeds the tree-index key space ({max})")]
    LengthTooLarge { len: usize, max: usize },

    #[error("NaN cannot be stored in a vector")]
    NanValue,

    #[error(transparent)]
    Store(#[from] voltaic_store::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
