//! # Voltaic
//!
//! Sparse vector storage core for nodal circuit analysis.
//!
//! Nodal and mesh analysis produce large, very sparse linear systems.
//! Voltaic provides the storage side of that pipeline: a fixed-length
//! [`Vector`] contract over three interchangeable backings (dense array,
//! ordered map, and a bit-packed tree index paired with a slot store),
//! with equality and hashing defined purely over the nonzero entries so
//! the representation can be swapped freely as a vector moves from
//! build-up to steady state.
//!
//! ## Quick Start
//!
//! ```rust
//! use voltaic::prelude::*;
//!
//! let mut coeffs = MapVector::new(1000, 4);
//! coeffs.set(3, 2.5e-3).unwrap();
//! coeffs.set(750, -2.5e-3).unwrap();
//!
//! // Convert to the compact form once the sparsity pattern settles.
//! let steady = coeffs.to_tree_vector().unwrap();
//! assert!(steady.equals(&coeffs));
//! assert_eq!(steady.non_zero_count(), 2);
//! ```

// Re-export the member crates
pub use voltaic_core as core;
pub use voltaic_store as store;

// ============================================================================
// Convenient re-exports from voltaic_core
// ============================================================================

pub use voltaic_core::{
    vector_hash,
    vectors_equal,
    // Dense array representation
    ArrayVector,
    Entries,
    Entry,
    // Errors
    Error as CoreError,
    FilterMode,
    // Map representation
    MapVector,
    // Matrix surface
    Matrix,
    OrderMode,
    RowMatrix,
    // Tree representation
    TreeVector,
    // The shared contract
    Vector,
    VectorOps,
};

// ============================================================================
// Convenient re-exports from voltaic_store
// ============================================================================

pub use voltaic_store::{
    Error as StoreError, ExpandingValueStore, MemoryInstrumentation, TreeIndex, TreeStats,
};

// ============================================================================
// Re-export commonly used external types
// ============================================================================

/// Re-export of nalgebra's dynamic vector type.
pub use nalgebra::DVector;

// ============================================================================
// Prelude module for convenient imports
// ============================================================================

/// Prelude module containing commonly used types and traits.
///
/// ```rust
/// use voltaic::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        ArrayVector, Entry, FilterMode, MapVector, Matrix, MemoryInstrumentation, OrderMode,
        RowMatrix, TreeVector, Vector, VectorOps,
    };
}
