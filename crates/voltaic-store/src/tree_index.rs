//! Arena-backed red-black tree mapping small integer keys to small
//! integer values.
//!
//! Every node is one 64-bit word: bit 63 is the color (1 = red), bit 62
//! marks a freed slot, bits 36-59 hold the 24-bit value, bits 24-35 and
//! 12-23 the right and left child slot numbers, and bits 0-11 the key.
//! Children are referenced by 12-bit arena slot, with `0xFFF` as NIL, so
//! the whole tree lives in a flat `u64` arena and no parent pointers are
//! stored. Insert and delete instead record the descent path on an
//! ephemeral stack and run the usual fixups against it; the stack is the
//! only place parent links ever exist, and entries are dropped as soon as
//! the walk retreats past them.
//!
//! A freed node is a tombstone word chaining to the next free slot
//! through the key field, mirroring the value store's free list.

use std::cmp::Ordering;

use crate::arena::BlockArena;
use crate::error::{Error, Result};
use crate::memory::MemoryInstrumentation;

/// NIL child sentinel; also one past the largest usable slot number.
const NIL: u16 = 0xFFF;

/// Largest storable key (0xFFF is reserved).
pub const MAX_KEY: u32 = 0xFFE;

/// Largest storable value (0xFF_FFFF is reserved).
pub const MAX_VALUE: u32 = 0xFF_FFFE;

/// Largest entry capacity an index may declare (12-bit slot space minus
/// the NIL sentinel).
pub const MAX_CAPACITY: usize = NIL as usize;

const KEY_MASK: u64 = 0xFFF;
const VALUE_MASK: u64 = 0xFF_FFFF << 36;
const TOMB_BIT: u64 = 1 << 62;
const RED_BIT: u64 = 1 << 63;

/// Descent direction; the mirrored halves of the rebalancing logic are
/// unified by passing one of these instead of duplicating left/right code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Dir {
    Left,
    Right,
}

impl Dir {
    fn flip(self) -> Dir {
        match self {
            Dir::Left => Dir::Right,
            Dir::Right => Dir::Left,
        }
    }

    fn shift(self) -> u32 {
        match self {
            Dir::Left => 12,
            Dir::Right => 24,
        }
    }
}

/// One bit-packed tree node.
#[derive(Debug, Clone, Copy)]
struct Node(u64);

impl Node {
    /// A fresh red leaf with NIL children.
    fn leaf(key: u16, value: u32) -> Self {
        Node(
            RED_BIT
                | (u64::from(value) << 36)
                | (u64::from(NIL) << Dir::Right.shift())
                | (u64::from(NIL) << Dir::Left.shift())
                | u64::from(key),
        )
    }

    /// A freed slot chaining to `next` through the key field.
    fn tombstone(next: u16) -> Self {
        Node(TOMB_BIT | u64::from(next))
    }

    fn is_tombstone(self) -> bool {
        self.0 & TOMB_BIT != 0
    }

    fn free_next(self) -> u16 {
        (self.0 & KEY_MASK) as u16
    }

    fn key(self) -> u16 {
        (self.0 & KEY_MASK) as u16
    }

    fn set_key(&mut self, key: u16) {
        self.0 = (self.0 & !KEY_MASK) | u64::from(key);
    }

    fn value(self) -> u32 {
        ((self.0 >> 36) & 0xFF_FFFF) as u32
    }

    fn set_value(&mut self, value: u32) {
        self.0 = (self.0 & !VALUE_MASK) | (u64::from(value) << 36);
    }

    fn child(self, d: Dir) -> u16 {
        ((self.0 >> d.shift()) & 0xFFF) as u16
    }

    fn set_child(&mut self, d: Dir, slot: u16) {
        self.0 = (self.0 & !(0xFFF << d.shift())) | (u64::from(slot) << d.shift());
    }

    fn is_red(self) -> bool {
        self.0 & RED_BIT != 0
    }

    fn set_red(&mut self, red: bool) {
        if red {
            self.0 |= RED_BIT;
        } else {
            self.0 &= !RED_BIT;
        }
    }
}

/// Diagnostic report produced by [`TreeIndex::validate`].
#[derive(Debug, Clone)]
pub struct TreeStats {
    /// True when every red-black and ordering invariant holds.
    pub valid: bool,
    /// Nodes reachable from the root.
    pub nodes: usize,
    /// Black nodes on any root-to-NIL path (counting the NIL leaf).
    pub black_height: usize,
    /// Deepest node, in edges from the root plus one.
    pub max_depth: usize,
    /// Human-readable descriptions of every violated invariant.
    pub violations: Vec<String>,
}

/// Ordered map from a 12-bit key to a 24-bit value, stored as a
/// red-black tree of bit-packed nodes in a slot arena.
#[derive(Debug, Clone)]
pub struct TreeIndex {
    arena: BlockArena<u64>,
    root: u16,
    free_head: u16,
    free_len: usize,
    size: usize,
    max_entries: usize,
}

impl TreeIndex {
    /// Create an index expecting between `min_entries` and `max_entries`
    /// live entries.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidBounds`] when `min_entries > max_entries`
    /// or `max_entries` exceeds the 12-bit slot space.
    pub fn new(min_entries: usize, max_entries: usize) -> Result<Self> {
        if min_entries > max_entries || max_entries > MAX_CAPACITY {
            return Err(Error::InvalidBounds {
                min: min_entries,
                max: max_entries,
            });
        }
        Ok(Self {
            arena: BlockArena::new(min_entries, max_entries),
            root: NIL,
            free_head: NIL,
            free_len: 0,
            size: 0,
            max_entries,
        })
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Declared maximum number of entries.
    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    /// Look up the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::KeyOutOfRange`] for a key above [`MAX_KEY`].
    pub fn get(&self, key: u32) -> Result<Option<u32>> {
        let k = check_key(key)?;
        let mut cur = self.root;
        while cur != NIL {
            let n = self.node(cur);
            match k.cmp(&n.key()) {
                Ordering::Equal => return Ok(Some(n.value())),
                Ordering::Less => cur = n.child(Dir::Left),
                Ordering::Greater => cur = n.child(Dir::Right),
            }
        }
        Ok(None)
    }

    /// Insert or replace the value under `key`, returning the previous
    /// value if the key was present.
    ///
    /// # Errors
    ///
    /// Returns a range error for an out-of-range key or value and
    /// [`Error::IndexExhausted`] when inserting a new key past the
    /// declared capacity.
    pub fn put(&mut self, key: u32, value: u32) -> Result<Option<u32>> {
        let k = check_key(key)?;
        if value > MAX_VALUE {
            return Err(Error::ValueOutOfRange {
                value,
                max: MAX_VALUE,
            });
        }

        let mut path: Vec<(u16, Dir)> = Vec::new();
        let mut cur = self.root;
        while cur != NIL {
            let n = self.node(cur);
            match k.cmp(&n.key()) {
                Ordering::Equal => {
                    let mut nn = n;
                    nn.set_value(value);
                    self.store(cur, nn);
                    return Ok(Some(n.value()));
                }
                Ordering::Less => {
                    path.push((cur, Dir::Left));
                    cur = n.child(Dir::Left);
                }
                Ordering::Greater => {
                    path.push((cur, Dir::Right));
                    cur = n.child(Dir::Right);
                }
            }
        }

        if self.size == self.max_entries {
            return Err(Error::IndexExhausted {
                max: self.max_entries,
            });
        }

        let slot = self.alloc(Node::leaf(k, value));
        match path.last() {
            Some(&(p, d)) => {
                let mut pn = self.node(p);
                pn.set_child(d, slot);
                self.store(p, pn);
            }
            None => self.root = slot,
        }
        self.size += 1;
        self.insert_fixup(&mut path);
        Ok(None)
    }

    /// Remove `key`, returning the value it held if present. The freed
    /// node's slot is recycled through the index's free list.
    pub fn remove(&mut self, key: u32) -> Result<Option<u32>> {
        let k = check_key(key)?;

        let mut path: Vec<(u16, Dir)> = Vec::new();
        let mut cur = self.root;
        loop {
            if cur == NIL {
                return Ok(None);
            }
            let n = self.node(cur);
            match k.cmp(&n.key()) {
                Ordering::Equal => break,
                Ordering::Less => {
                    path.push((cur, Dir::Left));
                    cur = n.child(Dir::Left);
                }
                Ordering::Greater => {
                    path.push((cur, Dir::Right));
                    cur = n.child(Dir::Right);
                }
            }
        }

        let old = self.node(cur).value();
        let mut target = cur;
        let tn = self.node(target);
        if tn.child(Dir::Left) != NIL && tn.child(Dir::Right) != NIL {
            // Two children: move the in-order successor's payload here and
            // splice the successor out instead.
            path.push((target, Dir::Right));
            let mut s = tn.child(Dir::Right);
            loop {
                let left = self.node(s).child(Dir::Left);
                if left == NIL {
                    break;
                }
                path.push((s, Dir::Left));
                s = left;
            }
            let sn = self.node(s);
            let mut keep = self.node(target);
            keep.set_key(sn.key());
            keep.set_value(sn.value());
            self.store(target, keep);
            target = s;
        }

        // The target now has at most one child; splice it out.
        let tn = self.node(target);
        let child = if tn.child(Dir::Left) != NIL {
            tn.child(Dir::Left)
        } else {
            tn.child(Dir::Right)
        };
        match path.last() {
            Some(&(p, d)) => {
                let mut pn = self.node(p);
                pn.set_child(d, child);
                self.store(p, pn);
            }
            None => self.root = child,
        }

        if !tn.is_red() {
            if child != NIL && self.node(child).is_red() {
                self.set_red(child, false);
            } else {
                self.delete_fixup(&mut path);
            }
        }

        self.release(target);
        self.size -= 1;
        Ok(Some(old))
    }

    /// In-order iterator over `(key, value)` pairs.
    pub fn iter(&self) -> Iter<'_> {
        let mut it = Iter {
            index: self,
            stack: Vec::new(),
        };
        it.push_left(self.root);
        it
    }

    /// Walk the whole tree checking every red-black invariant, key
    /// ordering, reachability of free slots, and cycles. Intended for
    /// test harnesses; cost is linear in the tree size.
    pub fn validate(&self) -> TreeStats {
        let mut stats = TreeStats {
            valid: true,
            nodes: 0,
            black_height: 0,
            max_depth: 0,
            violations: Vec::new(),
        };
        if self.root != NIL && self.node(self.root).is_red() {
            stats.violations.push("root is red".to_string());
        }
        let mut visited = vec![false; self.arena.len()];
        if let Some(bh) = self.check(self.root, None, None, 1, &mut visited, &mut stats) {
            stats.black_height = bh;
        }
        if stats.nodes != self.size {
            stats.violations.push(format!(
                "reachable node count {} != size {}",
                stats.nodes, self.size
            ));
        }
        stats.valid = stats.violations.is_empty();
        stats
    }

    // ------------------------------------------------------------------
    // Internal structure manipulation
    // ------------------------------------------------------------------

    fn node(&self, slot: u16) -> Node {
        Node(self.arena[slot as usize])
    }

    fn store(&mut self, slot: u16, node: Node) {
        self.arena[slot as usize] = node.0;
    }

    fn set_red(&mut self, slot: u16, red: bool) {
        debug_assert!(slot != NIL);
        let mut n = self.node(slot);
        n.set_red(red);
        self.store(slot, n);
    }

    fn alloc(&mut self, node: Node) -> u16 {
        if self.free_head != NIL {
            let slot = self.free_head;
            self.free_head = self.node(slot).free_next();
            self.free_len -= 1;
            self.store(slot, node);
            slot
        } else {
            self.arena.push(node.0) as u16
        }
    }

    fn release(&mut self, slot: u16) {
        self.store(slot, Node::tombstone(self.free_head));
        self.free_head = slot;
        self.free_len += 1;
    }

    /// The path entry `levels` steps above the last one, if any.
    fn above(path: &[(u16, Dir)], levels: usize) -> Option<(u16, Dir)> {
        path.len().checked_sub(levels + 1).map(|i| path[i])
    }

    /// Rotate the subtree rooted at `n` in direction `dir`: the child on
    /// the opposite side rises into `n`'s place. `parent` names the edge
    /// currently pointing at `n`, or `None` when `n` is the root.
    /// Returns the new subtree root.
    fn rotate(&mut self, n: u16, dir: Dir, parent: Option<(u16, Dir)>) -> u16 {
        let mut nn = self.node(n);
        let c = nn.child(dir.flip());
        let mut cn = self.node(c);
        nn.set_child(dir.flip(), cn.child(dir));
        cn.set_child(dir, n);
        self.store(n, nn);
        self.store(c, cn);
        match parent {
            Some((p, pd)) => {
                let mut pn = self.node(p);
                pn.set_child(pd, c);
                self.store(p, pn);
            }
            None => self.root = c,
        }
        c
    }

    /// Restore the red-black invariants after linking a red leaf. The
    /// new node's parent is `path.last()`; entries are discarded as the
    /// walk retreats upward.
    fn insert_fixup(&mut self, path: &mut Vec<(u16, Dir)>) {
        while let Some(&(p, xd)) = path.last() {
            if !self.node(p).is_red() {
                break;
            }
            // A red parent is never the root, so a grandparent exists.
            let (g, pd) = path[path.len() - 2];
            let uncle = self.node(g).child(pd.flip());
            if uncle != NIL && self.node(uncle).is_red() {
                self.set_red(p, false);
                self.set_red(uncle, false);
                self.set_red(g, true);
                path.truncate(path.len() - 2);
            } else {
                let above = Self::above(path, 2);
                let top = if xd != pd {
                    // Inner grandchild: rotate it above its parent first.
                    self.rotate(p, pd, Some((g, pd)));
                    self.rotate(g, pd.flip(), above)
                } else {
                    self.rotate(g, pd.flip(), above)
                };
                self.set_red(top, false);
                self.set_red(g, true);
                break;
            }
        }
        let root = self.root;
        self.set_red(root, false);
    }

    /// Restore the black-height invariant after splicing out a black
    /// node. `path.last()` addresses the deficient position (which may
    /// hold NIL).
    fn delete_fixup(&mut self, path: &mut Vec<(u16, Dir)>) {
        while let Some(&(p, d)) = path.last() {
            let x = self.node(p).child(d);
            if x != NIL && self.node(x).is_red() {
                self.set_red(x, false);
                return;
            }

            // The deficient side was one black node deep, so a sibling
            // always exists.
            let w = self.node(p).child(d.flip());
            if self.node(w).is_red() {
                // Red sibling: rotate it above the parent to expose a
                // black sibling, then reconsider from the same position.
                self.set_red(w, false);
                self.set_red(p, true);
                let above = Self::above(path, 1);
                self.rotate(p, d, above);
                let last = path.len() - 1;
                path[last] = (w, d);
                path.push((p, d));
                continue;
            }

            let wn = self.node(w);
            let near = wn.child(d);
            let far = wn.child(d.flip());
            let near_red = near != NIL && self.node(near).is_red();
            let far_red = far != NIL && self.node(far).is_red();

            if !near_red && !far_red {
                // Both sibling children black: push the deficit up one
                // level. A red parent absorbs it on the next pass.
                self.set_red(w, true);
                path.pop();
                continue;
            }

            let w = if far_red {
                w
            } else {
                // Near child red: rotate it over the sibling so the far
                // child becomes red.
                self.set_red(near, false);
                self.set_red(w, true);
                self.rotate(w, d.flip(), Some((p, d.flip())))
            };

            // Far child red: one rotation at the parent rebalances.
            let p_red = self.node(p).is_red();
            self.set_red(w, p_red);
            self.set_red(p, false);
            let far = self.node(w).child(d.flip());
            self.set_red(far, false);
            let above = Self::above(path, 1);
            self.rotate(p, d, above);
            return;
        }
        // The deficit reached the root, where it is absorbed.
    }

    fn check(
        &self,
        slot: u16,
        lo: Option<u16>,
        hi: Option<u16>,
        depth: usize,
        visited: &mut [bool],
        stats: &mut TreeStats,
    ) -> Option<usize> {
        if slot == NIL {
            // The NIL leaf counts as one black node.
            return Some(1);
        }
        let i = slot as usize;
        if i >= visited.len() || visited[i] {
            stats
                .violations
                .push(format!("cycle or dangling child pointer at slot {slot}"));
            return None;
        }
        visited[i] = true;

        let n = self.node(slot);
        if n.is_tombstone() {
            stats
                .violations
                .push(format!("free slot {slot} reachable from the root"));
            return None;
        }
        stats.nodes += 1;
        stats.max_depth = stats.max_depth.max(depth);

        let key = n.key();
        if let Some(lo) = lo {
            if key <= lo {
                stats
                    .violations
                    .push(format!("key {key} violates ordering (must exceed {lo})"));
            }
        }
        if let Some(hi) = hi {
            if key >= hi {
                stats
                    .violations
                    .push(format!("key {key} violates ordering (must precede {hi})"));
            }
        }

        if n.is_red() {
            for d in [Dir::Left, Dir::Right] {
                let c = n.child(d);
                if c != NIL && self.node(c).is_red() {
                    stats
                        .violations
                        .push(format!("red node with key {key} has a red child"));
                }
            }
        }

        let lh = self.check(n.child(Dir::Left), lo, Some(key), depth + 1, visited, stats);
        let rh = self.check(n.child(Dir::Right), Some(key), hi, depth + 1, visited, stats);
        match (lh, rh) {
            (Some(a), Some(b)) => {
                if a != b {
                    stats.violations.push(format!(
                        "black-height mismatch under key {key}: {a} left vs {b} right"
                    ));
                }
                Some(a.max(b) + usize::from(!n.is_red()))
            }
            _ => None,
        }
    }
}

impl MemoryInstrumentation for TreeIndex {
    fn memory_allocated(&self) -> usize {
        self.arena.len() * std::mem::size_of::<u64>()
    }

    fn memory_used(&self) -> usize {
        self.size * std::mem::size_of::<u64>()
    }

    fn memory_unused(&self) -> usize {
        self.free_len * std::mem::size_of::<u64>()
    }
}

fn check_key(key: u32) -> Result<u16> {
    if key > MAX_KEY {
        Err(Error::KeyOutOfRange { key, max: MAX_KEY })
    } else {
        Ok(key as u16)
    }
}

/// In-order traversal over a [`TreeIndex`].
///
/// The stack holds only the current left spine; each entry is popped as
/// soon as its subtree has been visited, so the traversal's transient
/// footprint is bounded by the tree depth.
pub struct Iter<'a> {
    index: &'a TreeIndex,
    stack: Vec<u16>,
}

impl Iter<'_> {
    fn push_left(&mut self, mut slot: u16) {
        while slot != NIL {
            self.stack.push(slot);
            slot = self.index.node(slot).child(Dir::Left);
        }
    }
}

impl Iterator for Iter<'_> {
    type Item = (u32, u32);

    fn next(&mut self) -> Option<(u32, u32)> {
        let slot = self.stack.pop()?;
        let n = self.index.node(slot);
        self.push_left(n.child(Dir::Right));
        Some((u32::from(n.key()), n.value()))
    }
}
