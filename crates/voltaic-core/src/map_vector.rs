//! Ordered-map-backed sparse vector.

use std::cell::Cell;
use std::collections::BTreeMap;

use crate::error::{Error, Result};
use crate::vector::{
    cached_hash, vectors_equal, Entries, Entry, FilterMode, OrderMode, Vector, VectorOps,
};
use voltaic_store::MemoryInstrumentation;

/// Vector backed by a `BTreeMap` keyed on index.
///
/// O(log n) get/set with fast index-ordered sparse iteration; a good fit
/// for incrementally building a large sparse vector before converting it
/// to the tree-backed representation for steady-state use.
#[derive(Debug, Clone)]
pub struct MapVector {
    map: BTreeMap<usize, f64>,
    len: usize,
    epsilon: u32,
    hash: Cell<Option<u64>>,
}

impl MapVector {
    /// All-zero vector of the given length and ulp tolerance.
    pub fn new(len: usize, epsilon: u32) -> Self {
        Self {
            map: BTreeMap::new(),
            len,
            epsilon,
            hash: Cell::new(None),
        }
    }

    /// Sparse copy of any vector.
    pub fn from_vector(v: &dyn Vector) -> Self {
        let mut out = Self::new(v.len(), v.epsilon());
        for e in v.entries(OrderMode::Unspecified, FilterMode::Sparse) {
            out.map.insert(e.index, e.value);
        }
        out
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
}

impl Vector for MapVector {
    fn len(&self) -> usize {
        self.len
    }

    fn epsilon(&self) -> u32 {
        self.epsilon
    }

    fn get(&self, index: usize) -> Result<f64> {
        self.check_index(index)?;
        Ok(self.map.get(&index).copied().unwrap_or(0.0))
    }

    fn set(&mut self, index: usize, value: f64) -> Result<()> {
        self.check_index(index)?;
        if value.is_nan() {
            return Err(Error::NanValue);
        }
        if value == 0.0 {
            self.map.remove(&index);
        } else {
            self.map.insert(index, value);
        }
        self.hash.set(None);
        Ok(())
    }

    fn fill(&mut self, value: f64) -> Result<()> {
        if value.is_nan() {
            return Err(Error::NanValue);
        }
        self.map.clear();
        if value != 0.0 {
            for index in 0..self.len {
                self.map.insert(index, value);
            }
        }
        self.hash.set(None);
        Ok(())
    }

    fn non_zero_count(&self) -> usize {
        self.map.len()
    }

    fn entries(&self, _order: OrderMode, filter: FilterMode) -> Entries<'_> {
        // The map walk is already index-ordered, so both order modes
        // share one implementation.
        match filter {
            FilterMode::Sparse => Box::new(
                self.map
                    .iter()
                    .map(|(&index, &value)| Entry { index, value }),
            ),
            FilterMode::Unfiltered => {
                let mut sparse = self.map.iter().peekable();
                Box::new((0..self.len).map(move |index| match sparse.peek() {
                    Some(&(&k, &value)) if k == index => {
                        sparse.next();
                        Entry { index, value }
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

impl VectorOps for MapVector {
    fn empty_like(&self, len: usize) -> Result<Self> {
        Ok(Self::new(len, self.epsilon))
    }
}

impl PartialEq for MapVector {
    fn eq(&self, other: &Self) -> bool {
        vectors_equal(self, other)
    }
}

impl MemoryInstrumentation for MapVector {
    fn memory_allocated(&self) -> usize {
        // Key plus value per materialized entry; tree overhead ignored.
        self.map.len() * (std::mem::size_of::<usize>() + std::mem::size_of::<f64>())
    }

    fn memory_used(&self) -> usize {
        self.memory_allocated()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_write_releases_entry() {
        let mut v = MapVector::new(100, 0);
        v.set(42, 1.5).unwrap();
        assert_eq!(v.non_zero_count(), 1);
        v.set(42, 0.0).unwrap();
        assert_eq!(v.non_zero_count(), 0);
        assert_eq!(v.get(42).unwrap(), 0.0);
        assert_eq!(v.memory_allocated(), 0);
    }

    #[test]
    fn test_unfiltered_iteration_synthesizes_zeros() {
        let mut v = MapVector::new(5, 0);
        v.set(1, 1.0).unwrap();
        v.set(3, 3.0).unwrap();
        let values: Vec<f64> = v
            .entries(OrderMode::Index, FilterMode::Unfiltered)
            .map(|e| e.value)
            .collect();
        assert_eq!(values, vec![0.0, 1.0, 0.0, 3.0, 0.0]);
    }

    #[test]
    fn test_sparse_iteration_in_index_order() {
        let mut v = MapVector::new(10, 0);
        for index in [7, 2, 9, 0] {
            v.set(index, index as f64 + 1.0).unwrap();
        }
        let indices: Vec<usize> = v
            .entries(OrderMode::Index, FilterMode::Sparse)
            .map(|e| e.index)
            .collect();
        assert_eq!(indices, vec![0, 2, 7, 9]);
    }

    #[test]
    fn test_fill_and_range_errors() {
        let mut v = MapVector::new(4, 0);
        v.fill(2.0).unwrap();
        assert_eq!(v.non_zero_count(), 4);
        v.fill(0.0).unwrap();
        assert_eq!(v.non_zero_count(), 0);
        assert!(matches!(v.set(4, 1.0), Err(Error::IndexOutOfRange { .. })));
    }

    #[test]
    fn test_arithmetic_returns_map_vector() {
        let mut a = MapVector::new(6, 0);
        a.set(0, 1.0).unwrap();
        a.set(5, 2.0).unwrap();
        let b = a.add_scaled(&a, 2.0).unwrap();
        assert_eq!(b.get(0).unwrap(), 3.0);
        assert_eq!(b.get(5).unwrap(), 6.0);
        assert_eq!(b.non_zero_count(), 2);
    }
}
