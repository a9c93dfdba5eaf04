//! Compact storage engines for sparse nodal-analysis vectors.
//!
//! This crate provides the two slot-arena structures the vector layer is
//! built from:
//! - [`ExpandingValueStore`]: a slab allocator handing out reusable slots
//!   for `f64` coefficient values, with a free list threaded through
//!   quiet-NaN tombstones.
//! - [`TreeIndex`]: an ordered map from 12-bit keys to 24-bit values,
//!   stored as a red-black tree whose nodes are bit-packed into single
//!   64-bit arena words.
//!
//! Both grow in power-of-two blocks sized from declared min/max entry
//! counts, recycle freed slots LIFO, and report their memory footprint
//! through [`MemoryInstrumentation`].

pub mod arena;
pub mod error;
pub mod memory;
pub mod tree_index;
pub mod value_store;

pub use arena::BlockArena;
pub use error::{Error, Result};
pub use memory::MemoryInstrumentation;
pub use tree_index::{TreeIndex, TreeStats, MAX_CAPACITY, MAX_KEY, MAX_VALUE};
pub use value_store::{ExpandingValueStore, MAX_SLOTS};
