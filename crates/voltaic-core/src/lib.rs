//! Sparse vector abstraction for nodal circuit analysis.
//!
//! A [`Vector`] is a fixed-length vector of doubles that materializes
//! only its nonzero entries. Three interchangeable representations are
//! provided:
//! - [`ArrayVector`]: dense array, O(1) access; best small or dense.
//! - [`MapVector`]: ordered map, fast sparse build-up in index order.
//! - [`TreeVector`]: bit-packed tree index plus slot store; the compact
//!   steady-state form for large, very sparse vectors.
//!
//! Equality and hashing are defined over the nonzero entry set alone, so
//! vectors compare equal across representations and hash identically
//! regardless of iteration order.

pub mod array_vector;
pub mod error;
pub mod map_vector;
pub mod matrix;
pub mod numeric;
pub mod tree_vector;
pub mod vector;

pub use array_vector::ArrayVector;
pub use error::{Error, Result};
pub use map_vector::MapVector;
pub use matrix::{Matrix, RowMatrix};
pub use numeric::nearly_equal;
pub use tree_vector::{TreeVector, MAX_LEN};
pub use vector::{
    vector_hash, vectors_equal, Entries, Entry, FilterMode, OrderMode, Vector, VectorOps,
};

// Memory diagnostics are part of the public surface.
pub use voltaic_store::MemoryInstrumentation;
