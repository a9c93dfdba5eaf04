//! Slot allocator for double-precision coefficient values.
//!
//! Freed slots are threaded into a LIFO free list without any side table:
//! a free slot holds a quiet NaN whose low mantissa bits carry the next
//! free slot number. Bit 24 of the mantissa is forced set so that a next
//! index of zero still produces a nonzero mantissa (an all-ones exponent
//! with a zero mantissa would decode as infinity, not NaN). Because of
//! this encoding, NaN is rejected as a stored value.

use crate::arena::BlockArena;
use crate::error::{Error, Result};
use crate::memory::MemoryInstrumentation;

/// Quiet-NaN prefix for tombstones: all-ones exponent, quiet bit, forced
/// mantissa bit 24.
const TOMB_BASE: u64 = 0x7FF8_0000_0000_0000 | (1 << 24);

/// Mask for the next-free-slot payload.
const NEXT_MASK: u64 = 0x00FF_FFFF;

/// Free-list terminator; also the largest representable slot number plus one.
const NO_SLOT: u32 = 0x00FF_FFFF;

/// Largest slot count a store may declare (slot numbers must fit the
/// 24-bit payload, with `NO_SLOT` reserved).
pub const MAX_SLOTS: usize = NO_SLOT as usize;

fn tombstone(next: u32) -> f64 {
    f64::from_bits(TOMB_BASE | u64::from(next))
}

fn free_next(bits: u64) -> u32 {
    (bits & NEXT_MASK) as u32
}

/// Slot-based allocator for `f64` values with free-list reuse.
///
/// `create` hands out a slot number; `put`/`get` access it; `delete`
/// recycles it. Slot numbers stay valid until deleted and are reused
/// LIFO, so a caller that frees N slots and allocates N more gets the
/// same numbers back in reverse order.
#[derive(Debug, Clone)]
pub struct ExpandingValueStore {
    arena: BlockArena<f64>,
    free_head: u32,
    free_len: usize,
    max_entries: usize,
}

impl ExpandingValueStore {
    /// Create a store expecting between `min_entries` and `max_entries`
    /// live values.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidBounds`] when `min_entries > max_entries`
    /// or `max_entries` exceeds the addressable slot space.
    pub fn new(min_entries: usize, max_entries: usize) -> Result<Self> {
        if min_entries > max_entries || max_entries > MAX_SLOTS {
            return Err(Error::InvalidBounds {
                min: min_entries,
                max: max_entries,
            });
        }
        Ok(Self {
            arena: BlockArena::new(min_entries, max_entries),
            free_head: NO_SLOT,
            free_len: 0,
            max_entries,
        })
    }

    /// Allocate a slot, preferring the free list over extending the arena.
    /// The slot starts out holding 0.0.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StoreExhausted`] once `max_entries` slots are live.
    pub fn create(&mut self) -> Result<usize> {
        if self.len() == self.max_entries {
            return Err(Error::StoreExhausted {
                max: self.max_entries,
            });
        }
        if self.free_head != NO_SLOT {
            let slot = self.free_head as usize;
            self.free_head = free_next(self.arena[slot].to_bits());
            self.free_len -= 1;
            self.arena[slot] = 0.0;
            Ok(slot)
        } else {
            Ok(self.arena.push(0.0))
        }
    }

    /// Free a slot and return the value it held.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SlotOutOfRange`] for a never-allocated slot and
    /// [`Error::SlotFree`] for a double delete.
    pub fn delete(&mut self, slot: usize) -> Result<f64> {
        let old = self.get(slot)?;
        self.arena[slot] = tombstone(self.free_head);
        self.free_head = slot as u32;
        self.free_len += 1;
        Ok(old)
    }

    /// Read a live slot.
    pub fn get(&self, slot: usize) -> Result<f64> {
        let value = self.arena.get(slot).ok_or(Error::SlotOutOfRange {
            slot,
            len: self.arena.len(),
        })?;
        if value.is_nan() {
            return Err(Error::SlotFree(slot));
        }
        Ok(value)
    }

    /// Write a live slot.
    ///
    /// # Errors
    ///
    /// Rejects NaN ([`Error::NanValue`]), out-of-range slots, and writes
    /// to a freed slot.
    pub fn put(&mut self, slot: usize, value: f64) -> Result<()> {
        if value.is_nan() {
            return Err(Error::NanValue);
        }
        // get performs the range and tombstone checks
        self.get(slot)?;
        self.arena[slot] = value;
        Ok(())
    }

    /// Number of live slots.
    pub fn len(&self) -> usize {
        self.arena.len() - self.free_len
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Declared maximum number of live slots.
    pub fn max_entries(&self) -> usize {
        self.max_entries
    }
}

impl MemoryInstrumentation for ExpandingValueStore {
    fn memory_allocated(&self) -> usize {
        self.arena.len() * std::mem::size_of::<f64>()
    }

    fn memory_used(&self) -> usize {
        self.len() * std::mem::size_of::<f64>()
    }

    fn memory_unused(&self) -> usize {
        self.free_len * std::mem::size_of::<f64>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_put_get() {
        let mut store = ExpandingValueStore::new(4, 100).unwrap();
        let slot = store.create().unwrap();
        store.put(slot, 2.5).unwrap();
        assert_eq!(store.get(slot).unwrap(), 2.5);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_delete_returns_old_value() {
        let mut store = ExpandingValueStore::new(4, 100).unwrap();
        let slot = store.create().unwrap();
        store.put(slot, -1.5).unwrap();
        assert_eq!(store.delete(slot).unwrap(), -1.5);
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn test_free_list_lifo_reuse() {
        let mut store = ExpandingValueStore::new(4, 100).unwrap();
        let slots: Vec<usize> = (0..10).map(|_| store.create().unwrap()).collect();
        for &s in &slots {
            store.delete(s).unwrap();
        }
        // Reallocation drains the free list before extending the arena,
        // in reverse deletion order.
        for expected in slots.iter().rev() {
            assert_eq!(store.create().unwrap(), *expected);
        }
        assert_eq!(store.memory_unused(), 0);
    }

    #[test]
    fn test_double_delete_fails() {
        let mut store = ExpandingValueStore::new(4, 100).unwrap();
        let slot = store.create().unwrap();
        store.delete(slot).unwrap();
        assert_eq!(store.delete(slot), Err(Error::SlotFree(slot)));
        assert_eq!(store.get(slot), Err(Error::SlotFree(slot)));
        assert_eq!(store.put(slot, 1.0), Err(Error::SlotFree(slot)));
    }

    #[test]
    fn test_nan_rejected() {
        let mut store = ExpandingValueStore::new(4, 100).unwrap();
        let slot = store.create().unwrap();
        assert_eq!(store.put(slot, f64::NAN), Err(Error::NanValue));
        // infinities are ordinary values
        store.put(slot, f64::INFINITY).unwrap();
        assert_eq!(store.get(slot).unwrap(), f64::INFINITY);
    }

    #[test]
    fn test_exhaustion() {
        let mut store = ExpandingValueStore::new(2, 3).unwrap();
        for _ in 0..3 {
            store.create().unwrap();
        }
        assert_eq!(store.create(), Err(Error::StoreExhausted { max: 3 }));
        // Freeing makes room again.
        store.delete(0).unwrap();
        assert_eq!(store.create().unwrap(), 0);
    }

    #[test]
    fn test_out_of_range() {
        let store = ExpandingValueStore::new(2, 3).unwrap();
        assert!(matches!(store.get(5), Err(Error::SlotOutOfRange { .. })));
    }

    #[test]
    fn test_tombstone_encoding_is_nan_for_slot_zero() {
        // Without the forced mantissa bit, a next-slot payload of zero
        // would decode as +infinity.
        assert!(tombstone(0).is_nan());
        assert_eq!(free_next(tombstone(0).to_bits()), 0);
        assert_eq!(free_next(tombstone(123_456).to_bits()), 123_456);
    }

    #[test]
    fn test_memory_accounting() {
        let mut store = ExpandingValueStore::new(5, 1000).unwrap();
        for i in 0..1000 {
            let slot = store.create().unwrap();
            store.put(slot, i as f64).unwrap();
        }
        for i in 0..1000 {
            assert_eq!(store.get(i).unwrap(), i as f64);
        }
        assert_eq!(store.memory_unused(), 0);
        assert_eq!(
            store.memory_allocated(),
            store.memory_used() + store.memory_unused()
        );

        store.delete(17).unwrap();
        assert_eq!(store.memory_unused(), 8);
        assert_eq!(
            store.memory_allocated(),
            store.memory_used() + store.memory_unused()
        );
        assert!(store.memory_utilization() < 1.0);
    }
}
