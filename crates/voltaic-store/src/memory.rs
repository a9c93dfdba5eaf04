//! Memory instrumentation for representation-selection heuristics.

/// Byte-level accounting exposed by every storage engine and vector
/// representation.
///
/// The figures are estimates: they count slot payloads, not allocator
/// headers or block-table overhead. `memory_allocated` always equals
/// `memory_used + memory_unused`, so callers can compare representations
/// (e.g. decide when a map-backed vector under construction should be
/// converted to the tree-backed form for steady-state use).
pub trait MemoryInstrumentation {
    /// Total payload bytes held, live or recyclable.
    fn memory_allocated(&self) -> usize;

    /// Bytes holding live entries.
    fn memory_used(&self) -> usize;

    /// Bytes sitting on free lists awaiting reuse.
    fn memory_unused(&self) -> usize {
        self.memory_allocated() - self.memory_used()
    }

    /// Fraction of allocated bytes that are live; 1.0 for an empty structure.
    fn memory_utilization(&self) -> f64 {
        let allocated = self.memory_allocated();
        if allocated == 0 {
            1.0
        } else {
            self.memory_used() as f64 / allocated as f64
        }
    }
}
