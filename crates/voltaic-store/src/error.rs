//! Error types for voltaic-store.
//!
//! Two families: range errors (an argument outside its declared bounds) and
//! state errors (an operation that contradicts the structure's current
//! state, such as touching a freed slot). Both are contract violations
//! reported synchronously at the offending call.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    #[error("slot {slot} out of range (arena holds {len} slots)")]
    SlotOutOfRange { slot: usize, len: usize },

    #[error("slot {0} is free")]
    SlotFree(usize),

    #[error("NaN cannot be stored (reserved for free-slot tombstones)")]
    NanValue,

    #[error("store exhausted: {max} slots already allocated")]
    StoreExhausted { max: usize },

    #[error("key {key} out of range (max {max})")]
    KeyOutOfRange { key: u32, max: u32 },

    #[error("value {value} out of range (max {max})")]
    ValueOutOfRange { value: u32, max: u32 },

    #[error("index exhausted: {max} entries already present")]
    IndexExhausted { max: usize },

    #[error("invalid capacity bounds: min {min}, max {max}")]
    InvalidBounds { min: usize, max: usize },
}

pub type Result<T> = std::result::Result<T, Error>;
