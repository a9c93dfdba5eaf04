//! Floating-point comparison and hashing primitives shared by every
//! vector representation.

/// Fixed rotation offset mixed into every entry hash.
const HASH_DELTA: u32 = 7;

/// Ulp-based near-equality on raw bit patterns.
///
/// Two finite doubles of the same sign are considered equal when their
/// sign-masked bit patterns differ by at most `ulps` units in the last
/// place. Exact equality short-circuits first, which also handles
/// `+0 == -0` and equal infinities; NaN never compares equal to
/// anything.
pub fn nearly_equal(a: f64, b: f64, ulps: u32) -> bool {
    if a == b {
        return true;
    }
    if !a.is_finite() || !b.is_finite() {
        return false;
    }
    if (a < 0.0) != (b < 0.0) {
        // Opposite signs are only equal in the exact ±0 case above.
        return false;
    }
    let ia = (a.to_bits() & !(1u64 << 63)) as i64;
    let ib = (b.to_bits() & !(1u64 << 63)) as i64;
    (ia - ib).abs() <= i64::from(ulps)
}

/// Order-independent hash contribution of one nonzero entry.
///
/// The value's IEEE-754 bit pattern is split into 32-bit halves, each is
/// rotated by an amount derived from plus or minus the entry's index (so
/// the two halves never cancel each other for symmetric bit patterns),
/// and the rotated halves are XORed with the raw index. Contributions
/// are combined with XOR by the caller, which makes the total hash
/// independent of visit order.
pub(crate) fn entry_hash(index: usize, value: f64) -> u64 {
    let bits = value.to_bits();
    let lo = bits as u32;
    let hi = (bits >> 32) as u32;
    let i = index as u32;
    let lo_rot = lo.rotate_left(i.wrapping_add(HASH_DELTA) & 31);
    let hi_rot = hi.rotate_left(HASH_DELTA.wrapping_sub(i) & 31);
    u64::from(lo_rot ^ hi_rot) ^ index as u64
}
