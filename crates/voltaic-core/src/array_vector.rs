//! Dense array-backed vector.

use std::cell::Cell;

use nalgebra::DVector;

use crate::error::{Error, Result};
use crate::vector::{
    cached_hash, vectors_equal, Entries, Entry, FilterMode, OrderMode, Vector, VectorOps,
};
use voltaic_store::MemoryInstrumentation;

/// Vector backed by a dense `Vec<f64>`.
///
/// O(1) get/set and the fastest arithmetic for small or dense vectors;
/// memory is proportional to the length regardless of how many entries
/// are nonzero.
#[derive(Debug, Clone)]
pub struct ArrayVector {
    data: Vec<f64>,
    epsilon: u32,
    non_zero: usize,
    hash: Cell<Option<u64>>,
}

impl ArrayVector {
    /// All-zero vector of the given length and ulp tolerance.
    pub fn new(len: usize, epsilon: u32) -> Self {
        Self {
            data: vec![0.0; len],
            epsilon,
            non_zero: 0,
            hash: Cell::new(None),
        }
    }

    /// Dense copy of any vector.
    pub fn from_vector(v: &dyn Vector) -> Self {
        let mut out = Self::new(v.len(), v.epsilon());
        for e in v.entries(OrderMode::Unspecified, FilterMode::Sparse) {
            out.data[e.index] = e.value;
        }
        out.non_zero = v.non_zero_count();
        out
    }

    /// Copy of a dense slice.
    ///
    /// # Errors
    ///
    /// Rejects NaN values.
    pub fn from_slice(values: &[f64], epsilon: u32) -> Result<Self> {
        if values.iter().any(|v| v.is_nan()) {
            return Err(Error::NanValue);
        }
        Ok(Self {
            data: values.to_vec(),
            epsilon,
            non_zero: values.iter().filter(|v| **v != 0.0).count(),
            hash: Cell::new(None),
        })
    }

    /// Copy of a dense nalgebra vector.
    pub fn from_dvector(values: &DVector<f64>, epsilon: u32) -> Result<Self> {
        Self::from_slice(values.as_slice(), epsilon)
    }

    /// Borrow the dense backing storage.
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    fn check_index(&self, index: usize) -> Result<()> {
        if index < self.data.len() {
            Ok(())
        } else {
            Err(Error::IndexOutOfRange {
                index,
                len: self.data.len(),
            })
        }
    }
}

impl Vector for ArrayVector {
    fn len(&self) -> usize {
        self.data.len()
    }

    fn epsilon(&self) -> u32 {
        self.epsilon
    }

    fn get(&self, index: usize) -> Result<f64> {
        self.check_index(index)?;
        Ok(self.data[index])
    }

    fn set(&mut self, index: usize, value: f64) -> Result<()> {
        self.check_index(index)?;
        if value.is_nan() {
            return Err(Error::NanValue);
        }
        let old = self.data[index];
        if old == 0.0 && value != 0.0 {
            self.non_zero += 1;
        } else if old != 0.0 && value == 0.0 {
            self.non_zero -= 1;
        }
        self.data[index] = value;
        self.hash.set(None);
        Ok(())
    }

    fn fill(&mut self, value: f64) -> Result<()> {
        if value.is_nan() {
            return Err(Error::NanValue);
        }
        self.data.fill(value);
        self.non_zero = if value == 0.0 { 0 } else { self.data.len() };
        self.hash.set(None);
        Ok(())
    }

    fn non_zero_count(&self) -> usize {
        self.non_zero
    }

    fn entries(&self, _order: OrderMode, filter: FilterMode) -> Entries<'_> {
        // Ascending index order is also the cheapest order here.
        let all = self
            .data
            .iter()
            .enumerate()
            .map(|(index, &value)| Entry { index, value });
        match filter {
            FilterMode::Sparse => Box::new(all.filter(|e| e.value != 0.0)),
            FilterMode::Unfiltered => Box::new(all),
        }
    }

    fn hash_value(&self) -> u64 {
        cached_hash(&self.hash, self)
    }
}

impl VectorOps for ArrayVector {
    fn empty_like(&self, len: usize) -> Result<Self> {
        Ok(Self::new(len, self.epsilon))
    }
}

impl PartialEq for ArrayVector {
    fn eq(&self, other: &Self) -> bool {
        vectors_equal(self, other)
    }
}

impl MemoryInstrumentation for ArrayVector {
    fn memory_allocated(&self) -> usize {
        self.data.len() * std::mem::size_of::<f64>()
    }

    fn memory_used(&self) -> usize {
        self.non_zero * std::mem::size_of::<f64>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get_roundtrip() {
        let mut v = ArrayVector::new(5, 0);
        v.set(2, 3.5).unwrap();
        assert_eq!(v.get(2).unwrap(), 3.5);
        assert_eq!(v.get(0).unwrap(), 0.0);
        assert_eq!(v.non_zero_count(), 1);
        v.set(2, 0.0).unwrap();
        assert_eq!(v.non_zero_count(), 0);
    }

    #[test]
    fn test_index_out_of_range() {
        let mut v = ArrayVector::new(3, 0);
        assert!(matches!(v.get(3), Err(Error::IndexOutOfRange { .. })));
        assert!(matches!(v.set(3, 1.0), Err(Error::IndexOutOfRange { .. })));
    }

    #[test]
    fn test_nan_rejected() {
        let mut v = ArrayVector::new(3, 0);
        assert_eq!(v.set(0, f64::NAN), Err(Error::NanValue));
        assert_eq!(v.fill(f64::NAN), Err(Error::NanValue));
    }

    #[test]
    fn test_addition_scenario() {
        let a = ArrayVector::from_slice(&[1.1, 0.0, 0.0, 1.2, 1.3], 4).unwrap();
        let b = ArrayVector::from_slice(&[0.0, 0.0, 2.1, 2.2, 2.3], 4).unwrap();
        let sum = a.add(&b).unwrap();
        let expected = ArrayVector::from_slice(&[1.1, 0.0, 2.1, 3.4, 3.6], 4).unwrap();
        assert!(sum.equals(&expected));
    }

    #[test]
    fn test_length_mismatch() {
        let a = ArrayVector::new(3, 0);
        let b = ArrayVector::new(4, 0);
        assert!(matches!(a.add(&b), Err(Error::LengthMismatch { .. })));
    }

    #[test]
    fn test_sparse_iteration_skips_zeros() {
        let v = ArrayVector::from_slice(&[0.0, 1.0, 0.0, 2.0], 0).unwrap();
        let sparse: Vec<Entry> = v.entries(OrderMode::Index, FilterMode::Sparse).collect();
        assert_eq!(
            sparse,
            vec![
                Entry {
                    index: 1,
                    value: 1.0
                },
                Entry {
                    index: 3,
                    value: 2.0
                }
            ]
        );
        assert_eq!(v.entries(OrderMode::Index, FilterMode::Unfiltered).count(), 4);
    }

    #[test]
    fn test_sub_vector_and_scale() {
        let v = ArrayVector::from_slice(&[1.0, 2.0, 3.0, 4.0], 0).unwrap();
        let mid = v.sub_vector(1, 3).unwrap();
        assert_eq!(mid.as_slice(), &[2.0, 3.0]);
        let doubled = v.scale(2.0).unwrap();
        assert_eq!(doubled.as_slice(), &[2.0, 4.0, 6.0, 8.0]);
        assert!(matches!(
            v.sub_vector(3, 2),
            Err(Error::InvalidRange { .. })
        ));
    }

    #[test]
    fn test_hash_invalidated_on_mutation() {
        let mut v = ArrayVector::from_slice(&[1.0, 0.0, 2.0], 0).unwrap();
        let h1 = v.hash_value();
        assert_eq!(h1, v.hash_value());
        v.set(1, 5.0).unwrap();
        assert_ne!(h1, v.hash_value());
    }
}
