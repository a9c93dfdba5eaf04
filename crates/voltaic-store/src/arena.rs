//! Block-structured slot arena shared by the storage engines.
//!
//! Slots are addressed by a flat index and stored in fixed-size blocks, so
//! growth never moves existing slots between blocks and never invalidates a
//! slot number. The first block starts small (sized from the declared
//! minimum entry count) and doubles in place until it reaches the standard
//! block size; after that, whole standard blocks are appended. This bounds
//! memory for small structures while still scaling to the declared maximum.

use std::ops::{Index, IndexMut};

/// Smallest permitted first-block capacity.
const MIN_FIRST_BLOCK: usize = 4;

/// Smallest permitted standard block size.
const MIN_BLOCK: usize = 32;

/// Number of standard blocks a maximally-sized arena is split into.
const BLOCK_COUNT_TARGET: usize = 32;

/// A growable arena of copyable slots.
///
/// The arena only ever appends; recycling freed slots is the owning
/// engine's job (both the value store and the tree index thread a free
/// list through their own slot encodings).
#[derive(Debug, Clone)]
pub struct BlockArena<T> {
    blocks: Vec<Vec<T>>,
    /// Standard block size; a power of two.
    block_size: usize,
    /// Current capacity of block 0, which doubles until it hits `block_size`.
    first_capacity: usize,
    len: usize,
}

impl<T: Copy> BlockArena<T> {
    /// Create an empty arena sized for between `min_entries` and
    /// `max_entries` slots.
    pub fn new(min_entries: usize, max_entries: usize) -> Self {
        let block_size = MIN_BLOCK
            .max(max_entries / BLOCK_COUNT_TARGET)
            .next_power_of_two();
        let first_capacity = MIN_FIRST_BLOCK
            .max(min_entries)
            .next_power_of_two()
            .min(block_size);
        Self {
            blocks: Vec::new(),
            block_size,
            first_capacity,
            len: 0,
        }
    }

    /// Number of slots handed out so far.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Standard block size chosen for this arena.
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Append a slot, returning its index.
    pub fn push(&mut self, value: T) -> usize {
        let slot = self.len;
        let block = slot / self.block_size;
        if self.blocks.is_empty() {
            self.blocks.push(Vec::with_capacity(self.first_capacity));
        }
        if block == 0 {
            if self.blocks[0].len() == self.first_capacity && self.first_capacity < self.block_size
            {
                self.first_capacity = (self.first_capacity * 2).min(self.block_size);
                let grow = self.first_capacity - self.blocks[0].len();
                self.blocks[0].reserve_exact(grow);
            }
            self.blocks[0].push(value);
        } else {
            if block == self.blocks.len() {
                self.blocks.push(Vec::with_capacity(self.block_size));
            }
            self.blocks[block].push(value);
        }
        self.len += 1;
        slot
    }

    /// Read a slot, or `None` when the index was never handed out.
    pub fn get(&self, slot: usize) -> Option<T> {
        if slot < self.len {
            Some(self.blocks[slot / self.block_size][slot % self.block_size])
        } else {
            None
        }
    }
}

impl<T: Copy> Index<usize> for BlockArena<T> {
    type Output = T;

    fn index(&self, slot: usize) -> &T {
        &self.blocks[slot / self.block_size][slot % self.block_size]
    }
}

impl<T: Copy> IndexMut<usize> for BlockArena<T> {
    fn index_mut(&mut self, slot: usize) -> &mut T {
        &mut self.blocks[slot / self.block_size][slot % self.block_size]
    }
}
