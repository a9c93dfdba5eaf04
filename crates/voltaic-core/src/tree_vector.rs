//! Tree-backed sparse vector: the compact representation for large, very
//! sparse vectors.
//!
//! Each instance composes one [`TreeIndex`] (logical index → value-store
//! slot) and one [`ExpandingValueStore`] (slot → double). Every access
//! routes through both: `set` allocates a slot on the first nonzero write
//! to an index, and a write back to exact zero releases the entry by
//! tombstoning both structures. Intended for vectors of thousands of
//! entries at a few percent density, the shape nodal-analysis matrices
//! produce.

use std::cell::Cell;

use crate::error::{Error, Result};
use crate::vector::{
    cached_hash, vectors_equal, Entries, Entry, FilterMode, OrderMode, Vector, VectorOps,
};
use voltaic_store::{ExpandingValueStore, MemoryInstrumentation, TreeIndex, MAX_KEY};

/// Longest representable vector; logical indices are tree keys, which
/// are 12-bit.
pub const MAX_LEN: usize = MAX_KEY as usize + 1;

/// Vector backed by a bit-packed tree index plus a slot store.
#[derive(Debug, Clone)]
pub struct TreeVector {
    index: TreeIndex,
    store: ExpandingValueStore,
    len: usize,
    epsilon: u32,
    min_entries: usize,
    capacity: usize,
    hash: Cell<Option<u64>>,
}

impl TreeVector {
    /// All-zero vector able to hold up to `len` nonzero entries.
    pub fn new(len: usize, epsilon: u32) -> Result<Self> {
        Self::with_capacity(len, epsilon, 0, len)
    }

    /// All-zero vector pre-sized for between `min_entries` and
    /// `max_entries` nonzero entries. Both engines are sized from these
    /// bounds; inserting past `max_entries` live entries is an error.
    ///
    /// # Errors
    ///
    /// Fails when `len` exceeds [`MAX_LEN`] or the bounds are inverted.
    pub fn with_capacity(
        len: usize,
        epsilon: u32,
        min_entries: usize,
        max_entries: usize,
    ) -> Result<Self> {
        if len > MAX_LEN {
            return Err(Error::LengthTooLarge { len, max: MAX_LEN });
        }
        let capacity = max_entries.min(len);
        let min_entries = min_entries.min(capacity);
        Ok(Self {
            index: TreeIndex::new(min_entries, capacity)?,
            store: ExpandingValueStore::new(min_entries, capacity)?,
            len,
            epsilon,
            min_entries,
            capacity,
            hash: Cell::new(None),
        })
    }

    /// Tree-backed copy of any vector, sized for its current contents.
    pub fn from_vector(v: &dyn Vector) -> Result<Self> {
        let mut out = Self::with_capacity(v.len(), v.epsilon(), v.non_zero_count(), v.len())?;
        for e in v.entries(OrderMode::Unspecified, FilterMode::Sparse) {
            out.set(e.index, e.value)?;
        }
        Ok(out)
    }

    /// Declared maximum number of nonzero entries.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn check_index(&self, index: usize) -> Result<()> {
        if index < self.len {
            Ok(())
        } else {
            Err(Error::IndexOutOfRange {
                index,
                len: self.len,
            })
        }
    }

    fn slot_value(&self, slot: u32) -> f64 {
        // The index only ever maps to live store slots.
        self.store
            .get(slot as usize)
            .expect("tree index references a live store slot")
    }
}

impl Vector for TreeVector {
    fn len(&self) -> usize {
        self.len
    }

    fn epsilon(&self) -> u32 {
        self.epsilon
    }

    fn get(&self, index: usize) -> Result<f64> {
        self.check_index(index)?;
        match self.index.get(index as u32)? {
            Some(slot) => Ok(self.store.get(slot as usize)?),
            None => Ok(0.0),
        }
    }

    fn set(&mut self, index: usize, value: f64) -> Result<()> {
        self.check_index(index)?;
        if value.is_nan() {
            return Err(Error::NanValue);
        }
        let key = index as u32;
        let existing = self.index.get(key)?;
        match (existing, value == 0.0) {
            (Some(slot), true) => {
                // Release both the key and the slot.
                self.index.remove(key)?;
                self.store.delete(slot as usize)?;
            }
            (Some(slot), false) => {
                self.store.put(slot as usize, value)?;
            }
            (None, true) => {}
            (None, false) => {
                let slot = self.store.create()?;
                self.store.put(slot, value)?;
                self.index.put(key, slot as u32)?;
            }
        }
        self.hash.set(None);
        Ok(())
    }

    fn fill(&mut self, value: f64) -> Result<()> {
        if value.is_nan() {
            return Err(Error::NanValue);
        }
        if value != 0.0 && self.len > self.capacity {
            // A dense fill would exceed the declared entry bound; refuse
            // before mutating anything.
            return Err(Error::Store(voltaic_store::Error::StoreExhausted {
                max: self.capacity,
            }));
        }
        // Fresh engines rather than entry-by-entry removal.
        self.index = TreeIndex::new(self.min_entries, self.capacity)?;
        self.store = ExpandingValueStore::new(self.min_entries, self.capacity)?;
        if value != 0.0 {
            for index in 0..self.len {
                self.set(index, value)?;
            }
        }
        self.hash.set(None);
        Ok(())
    }

    fn non_zero_count(&self) -> usize {
        self.index.len()
    }

    fn entries(&self, _order: OrderMode, filter: FilterMode) -> Entries<'_> {
        // The in-order walk is index-ascending, and it is also the only
        // traversal the tree offers, so both order modes coincide.
        let sparse = self.index.iter().map(move |(key, slot)| Entry {
            index: key as usize,
            value: self.slot_value(slot),
        });
        match filter {
            FilterMode::Sparse => Box::new(sparse),
            FilterMode::Unfiltered => {
                let mut sparse = sparse.peekable();
                Box::new((0..self.len).map(move |index| match sparse.peek() {
                    Some(e) if e.index == index => {
                        let e = *e;
                        sparse.next();
                        e
                    }
                    _ => Entry { index, value: 0.0 },
                }))
            }
        }
    }

    fn hash_value(&self) -> u64 {
        cached_hash(&self.hash, self)
    }
}

impl VectorOps for TreeVector {
    fn empty_like(&self, len: usize) -> Result<Self> {
        Self::with_capacity(len, self.epsilon, self.min_entries, self.capacity)
    }
}

impl PartialEq for TreeVector {
    fn eq(&self, other: &Self) -> bool {
        vectors_equal(self, other)
    }
}

impl MemoryInstrumentation for TreeVector {
    fn memory_allocated(&self) -> usize {
        self.index.memory_allocated() + self.store.memory_allocated()
    }

    fn memory_used(&self) -> usize {
        self.index.memory_used() + self.store.memory_used()
    }

    fn memory_unused(&self) -> usize {
        self.index.memory_unused() + self.store.memory_unused()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get_roundtrip() {
        let mut v = TreeVector::new(4000, 0).unwrap();
        v.set(17, 1.5).unwrap();
        v.set(3999, -2.5).unwrap();
        assert_eq!(v.get(17).unwrap(), 1.5);
        assert_eq!(v.get(3999).unwrap(), -2.5);
        assert_eq!(v.get(0).unwrap(), 0.0);
        assert_eq!(v.non_zero_count(), 2);
    }

    #[test]
    fn test_zero_write_releases_both_structures() {
        let mut v = TreeVector::new(100, 0).unwrap();
        v.set(10, 4.0).unwrap();
        let used = v.memory_used();
        v.set(10, 0.0).unwrap();
        assert_eq!(v.non_zero_count(), 0);
        assert_eq!(v.get(10).unwrap(), 0.0);
        // Both the tree node and the store slot moved to free lists.
        assert_eq!(v.memory_used(), 0);
        assert_eq!(v.memory_unused(), used);
        // Writing again reuses the freed storage.
        v.set(20, 5.0).unwrap();
        assert_eq!(v.memory_unused(), 0);
    }

    #[test]
    fn test_overwrite_reuses_slot() {
        let mut v = TreeVector::new(100, 0).unwrap();
        v.set(10, 4.0).unwrap();
        let allocated = v.memory_allocated();
        v.set(10, 5.0).unwrap();
        assert_eq!(v.memory_allocated(), allocated);
        assert_eq!(v.get(10).unwrap(), 5.0);
    }

    #[test]
    fn test_length_bounded_by_key_space() {
        assert!(matches!(
            TreeVector::new(MAX_LEN + 1, 0),
            Err(Error::LengthTooLarge { .. })
        ));
        let v = TreeVector::new(MAX_LEN, 0).unwrap();
        assert_eq!(v.len(), MAX_LEN);
    }

    #[test]
    fn test_capacity_exhaustion() {
        let mut v = TreeVector::with_capacity(100, 0, 2, 3).unwrap();
        for index in 0..3 {
            v.set(index, 1.0).unwrap();
        }
        assert!(v.set(3, 1.0).is_err());
        // Releasing an entry makes room.
        v.set(0, 0.0).unwrap();
        v.set(3, 1.0).unwrap();
    }

    #[test]
    fn test_entries_in_index_order() {
        let mut v = TreeVector::new(50, 0).unwrap();
        for index in [30, 5, 45, 12] {
            v.set(index, index as f64).unwrap();
        }
        let indices: Vec<usize> = v
            .entries(OrderMode::Index, FilterMode::Sparse)
            .map(|e| e.index)
            .collect();
        assert_eq!(indices, vec![5, 12, 30, 45]);

        let dense: Vec<Entry> = v
            .entries(OrderMode::Index, FilterMode::Unfiltered)
            .collect();
        assert_eq!(dense.len(), 50);
        assert_eq!(dense[12].value, 12.0);
        assert_eq!(dense[13].value, 0.0);
    }

    #[test]
    fn test_fill_zero_resets_storage() {
        let mut v = TreeVector::new(100, 0).unwrap();
        for index in 0..50 {
            v.set(index, 1.0).unwrap();
        }
        v.fill(0.0).unwrap();
        assert_eq!(v.non_zero_count(), 0);
        assert_eq!(v.memory_allocated(), 0);
    }

    #[test]
    fn test_fill_beyond_capacity_fails_cleanly() {
        let mut v = TreeVector::with_capacity(10, 0, 2, 4).unwrap();
        v.set(1, 7.0).unwrap();
        assert!(v.fill(1.0).is_err());
        // Prior state intact.
        assert_eq!(v.get(1).unwrap(), 7.0);
    }
}
