//! The vector contract shared by all three backing representations.
//!
//! `Vector` is a capability-set trait: each concrete representation
//! implements the primitive surface (get/set/iterate), and everything
//! that can be expressed against that surface (equality, hashing,
//! conversions, arithmetic) lives in trait defaults and free functions
//! so its behavior is identical regardless of which backing holds the
//! entries.

use std::cell::Cell;

use nalgebra::DVector;

use crate::array_vector::ArrayVector;
use crate::error::Result;
use crate::map_vector::MapVector;
use crate::numeric::{entry_hash, nearly_equal};
use crate::tree_vector::TreeVector;

/// One materialized vector position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Entry {
    pub index: usize,
    pub value: f64,
}

/// Traversal order requested from [`Vector::entries`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderMode {
    /// Ascending index order.
    Index,
    /// Whatever order is cheapest for the representation.
    Unspecified,
}

/// Entry filter requested from [`Vector::entries`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterMode {
    /// Nonzero entries only.
    Sparse,
    /// Every index, synthesizing zeros for absent entries.
    Unfiltered,
}

/// Boxed entry iterator returned by every representation.
pub type Entries<'a> = Box<dyn Iterator<Item = Entry> + 'a>;

/// A fixed-length vector of doubles holding only its nonzero entries.
///
/// Zero is never materialized: writing an exact 0.0 releases whatever
/// backing storage the entry occupied. Equality and hashing are defined
/// purely over the set of nonzero `(index, value)` pairs plus the length
/// and epsilon, so vectors of different representations compare equal
/// whenever their contents agree.
pub trait Vector {
    /// Fixed length declared at construction.
    fn len(&self) -> usize;

    /// Ulp tolerance used by equality (never by storage).
    fn epsilon(&self) -> u32;

    /// Read the value at `index` (0.0 for an absent entry).
    fn get(&self, index: usize) -> Result<f64>;

    /// Write `value` at `index`; an exact 0.0 releases the entry.
    fn set(&mut self, index: usize, value: f64) -> Result<()>;

    /// Set every position to `value`.
    fn fill(&mut self, value: f64) -> Result<()>;

    /// Number of materialized (nonzero) entries.
    fn non_zero_count(&self) -> usize;

    /// Iterate entries under the given order and filter modes.
    fn entries(&self, order: OrderMode, filter: FilterMode) -> Entries<'_>;

    /// Content hash; cached by the implementation and recomputed only
    /// after a mutation.
    fn hash_value(&self) -> u64;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn is_valid_index(&self, index: usize) -> bool {
        index < self.len()
    }

    fn is_valid_length(&self, len: usize) -> bool {
        len == self.len()
    }

    fn is_same_length(&self, other: &dyn Vector) -> bool {
        other.len() == self.len()
    }

    /// Representation-independent equality; see [`vectors_equal`].
    fn equals(&self, other: &dyn Vector) -> bool
    where
        Self: Sized,
    {
        vectors_equal(self, other)
    }

    /// Copy into a dense nalgebra vector.
    fn to_dvector(&self) -> DVector<f64> {
        let mut out = DVector::zeros(self.len());
        for e in self.entries(OrderMode::Unspecified, FilterMode::Sparse) {
            out[e.index] = e.value;
        }
        out
    }

    /// Copy into a dense array-backed vector.
    fn to_array_vector(&self) -> ArrayVector
    where
        Self: Sized,
    {
        ArrayVector::from_vector(self)
    }

    /// Copy into an ordered-map-backed vector.
    fn to_map_vector(&self) -> MapVector
    where
        Self: Sized,
    {
        MapVector::from_vector(self)
    }

    /// Copy into a tree-backed vector sized for the current contents.
    ///
    /// # Errors
    ///
    /// Fails when the length exceeds the tree index's key space.
    fn to_tree_vector(&self) -> Result<TreeVector>
    where
        Self: Sized,
    {
        TreeVector::from_vector(self)
    }
}

/// Representation-independent equality: same length, same epsilon, same
/// nonzero-entry count, and every nonzero entry of one present in the
/// other within the shared ulp tolerance. One side is iterated sparsely
/// in whatever order is cheapest and the other is probed by `get`, so
/// neither iteration order nor backing strategy can affect the result.
pub fn vectors_equal(a: &dyn Vector, b: &dyn Vector) -> bool {
    if a.len() != b.len() || a.epsilon() != b.epsilon() || a.non_zero_count() != b.non_zero_count()
    {
        return false;
    }
    let ulps = a.epsilon();
    a.entries(OrderMode::Unspecified, FilterMode::Sparse)
        .all(|e| match b.get(e.index) {
            Ok(other) => nearly_equal(e.value, other, ulps),
            Err(_) => false,
        })
}

/// Order-independent content hash over the nonzero entries and epsilon.
///
/// Per-entry contributions (see `entry_hash`) are combined with XOR, so
/// any visit order yields the same total. The accumulator is rotated one
/// bit before epsilon is folded in, keeping a lone entry's contribution
/// from cancelling against an epsilon-only difference; epsilon lands in
/// the low bits last.
pub fn vector_hash(v: &dyn Vector) -> u64 {
    let mut acc = 0u64;
    for e in v.entries(OrderMode::Unspecified, FilterMode::Sparse) {
        acc ^= entry_hash(e.index, e.value);
    }
    acc.rotate_left(1) ^ u64::from(v.epsilon())
}

/// Compute-or-reuse helper for the per-instance hash cache. Mutating
/// calls clear the cache synchronously, so a populated cell is always
/// current.
pub(crate) fn cached_hash(cache: &Cell<Option<u64>>, v: &dyn Vector) -> u64 {
    if let Some(h) = cache.get() {
        return h;
    }
    let h = vector_hash(v);
    cache.set(Some(h));
    h
}

/// Allocating operations, generic over the receiver's concrete
/// representation: every result is a brand-new vector of the same
/// representation with entirely fresh backing storage.
pub trait VectorOps: Vector + Clone + Sized {
    /// Fresh empty vector of this representation with the given length
    /// and this vector's epsilon.
    fn empty_like(&self, len: usize) -> Result<Self>;

    /// Full copy sharing no storage with the original.
    fn deep_copy(&self) -> Self {
        self.clone()
    }

    /// Entry-wise sum.
    fn add(&self, other: &dyn Vector) -> Result<Self> {
        self.add_scaled(other, 1.0)
    }

    /// Entry-wise difference.
    fn subtract(&self, other: &dyn Vector) -> Result<Self> {
        self.add_scaled(other, -1.0)
    }

    /// `self + other * multiple`, iterating only `other`'s nonzero
    /// entries.
    ///
    /// # Errors
    ///
    /// Fails when the lengths differ.
    fn add_scaled(&self, other: &dyn Vector, multiple: f64) -> Result<Self> {
        if other.len() != self.len() {
            return Err(crate::error::Error::LengthMismatch {
                expected: self.len(),
                actual: other.len(),
            });
        }
        let mut out = self.deep_copy();
        for e in other.entries(OrderMode::Unspecified, FilterMode::Sparse) {
            let combined = out.get(e.index)? + e.value * multiple;
            out.set(e.index, combined)?;
        }
        Ok(out)
    }

    /// Every entry scaled by `multiple`.
    fn scale(&self, multiple: f64) -> Result<Self> {
        let mut out = self.empty_like(self.len())?;
        for e in self.entries(OrderMode::Unspecified, FilterMode::Sparse) {
            out.set(e.index, e.value * multiple)?;
        }
        Ok(out)
    }

    /// The half-open slice `start..end` as a new vector.
    fn sub_vector(&self, start: usize, end: usize) -> Result<Self> {
        if start > end || end > self.len() {
            return Err(crate::error::Error::InvalidRange {
                start,
                end,
                len: self.len(),
            });
        }
        let mut out = self.empty_like(end - start)?;
        for e in self.entries(OrderMode::Unspecified, FilterMode::Sparse) {
            if e.index >= start && e.index < end {
                out.set(e.index - start, e.value)?;
            }
        }
        Ok(out)
    }
}
