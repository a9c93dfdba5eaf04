//! Matrix surface consumed by equation builders and solvers.
//!
//! Only the coefficient-access contract lives here; elimination itself
//! is the consumer's concern.

use crate::error::{Error, Result};
use crate::vector::{Vector, VectorOps};
use voltaic_store::MemoryInstrumentation;

/// Two-dimensional coefficient container.
pub trait Matrix {
    fn num_rows(&self) -> usize;

    fn num_cols(&self) -> usize;

    fn get(&self, row: usize, col: usize) -> Result<f64>;

    fn set(&mut self, row: usize, col: usize, value: f64) -> Result<()>;

    /// Accumulate `delta` into one coefficient, the way an equation
    /// builder stamps element contributions.
    fn stamp(&mut self, row: usize, col: usize, delta: f64) -> Result<()> {
        let current = self.get(row, col)?;
        self.set(row, col, current + delta)
    }
}

/// Matrix stored as one vector per row; the row representation is chosen
/// by the caller (dense, map, or tree backed).
#[derive(Debug, Clone)]
pub struct RowMatrix<V> {
    rows: Vec<V>,
    cols: usize,
}

impl<V: VectorOps> RowMatrix<V> {
    /// Build a `rows` x `cols` matrix whose rows are fresh vectors shaped
    /// like `template` (same representation and epsilon).
    pub fn new(rows: usize, cols: usize, template: &V) -> Result<Self> {
        let rows = (0..rows)
            .map(|_| template.empty_like(cols))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { rows, cols })
    }

    pub fn row(&self, row: usize) -> Result<&V> {
        self.rows.get(row).ok_or(Error::IndexOutOfRange {
            index: row,
            len: self.rows.len(),
        })
    }

    pub fn row_mut(&mut self, row: usize) -> Result<&mut V> {
        let len = self.rows.len();
        self.rows
            .get_mut(row)
            .ok_or(Error::IndexOutOfRange { index: row, len })
    }

    /// Total nonzero coefficients across all rows.
    pub fn non_zero_count(&self) -> usize {
        self.rows.iter().map(|r| r.non_zero_count()).sum()
    }
}

impl<V: VectorOps> Matrix for RowMatrix<V> {
    fn num_rows(&self) -> usize {
        self.rows.len()
    }

    fn num_cols(&self) -> usize {
        self.cols
    }

    fn get(&self, row: usize, col: usize) -> Result<f64> {
        self.row(row)?.get(col)
    }

    fn set(&mut self, row: usize, col: usize, value: f64) -> Result<()> {
        self.row_mut(row)?.set(col, value)
    }
}

impl<V: VectorOps + MemoryInstrumentation> MemoryInstrumentation for RowMatrix<V> {
    fn memory_allocated(&self) -> usize {
        self.rows.iter().map(|r| r.memory_allocated()).sum()
    }

    fn memory_used(&self) -> usize {
        self.rows.iter().map(|r| r.memory_used()).sum()
    }

    fn memory_unused(&self) -> usize {
        self.rows.iter().map(|r| r.memory_unused()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::array_vector::ArrayVector;
    use crate::map_vector::MapVector;

    #[test]
    fn test_stamp_accumulates() {
        let template = MapVector::new(1, 0);
        let mut m = RowMatrix::new(3, 3, &template).unwrap();
        m.stamp(0, 0, 1.0).unwrap();
        m.stamp(0, 0, 0.5).unwrap();
        m.stamp(0, 1, -1.0).unwrap();
        assert_eq!(m.get(0, 0).unwrap(), 1.5);
        assert_eq!(m.get(0, 1).unwrap(), -1.0);
        assert_eq!(m.get(1, 1).unwrap(), 0.0);
        assert_eq!(m.non_zero_count(), 2);
    }

    #[test]
    fn test_row_access_bounds() {
        let template = ArrayVector::new(1, 0);
        let mut m = RowMatrix::new(2, 2, &template).unwrap();
        assert!(m.row(2).is_err());
        assert!(m.set(0, 2, 1.0).is_err());
        assert_eq!(m.num_rows(), 2);
        assert_eq!(m.num_cols(), 2);
    }
}
