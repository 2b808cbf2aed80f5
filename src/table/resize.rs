//! Fill-factor thresholds and the expand/shrink gate logic.
//!
//! Ported from the four `FILL_PERCENT` constants and `nextBucketExp` in
//! `hashtab.c`. A table expands once the soft ceiling is crossed, unless the
//! active [`ResizePolicy`](crate::config::ResizePolicy) is `Avoid`, in which
//! case expansion is deferred until the hard ceiling forces it. Shrinking is
//! symmetric at the low end and is never forced: an empty table is allowed
//! to sit at a large bucket count indefinitely if the policy says `Avoid`.

use crate::config::ResizePolicy;

/// Above this fill percentage, `maybe_expand` schedules a rehash unless the
/// active policy is `Avoid`.
pub(crate) const MAX_FILL_PERCENT_SOFT: u8 = 77;
/// Above this fill percentage, a rehash is scheduled regardless of policy.
pub(crate) const MAX_FILL_PERCENT_HARD: u8 = 90;
/// Below this fill percentage, `maybe_shrink` schedules a rehash unless the
/// active policy is `Avoid`.
pub(crate) const MIN_FILL_PERCENT_SOFT: u8 = 13;
/// Below this fill percentage, a shrink is scheduled regardless of policy,
/// down to the minimum bucket exponent.
pub(crate) const MIN_FILL_PERCENT_HARD: u8 = 3;

/// Smallest bucket-array exponent a non-empty table is allowed to shrink to.
/// `hashtab.c` keeps one bucket (`exp == 0`) as the floor; we do the same.
pub(crate) const MIN_BUCKET_EXP: u8 = 0;

/// A bucket array of exponent `exp` holds `1 << exp` buckets, each with
/// `ELEMENTS_PER_BUCKET` slots, so the usable capacity is `buckets *
/// ELEMENTS_PER_BUCKET`. `hashtab.c` computes fill percentage against this
/// same quantity, not against the raw slot count times a load factor.
#[inline]
pub(crate) fn capacity_for_exp(exp: u8, elements_per_bucket: usize) -> u64 {
    (1u64 << exp) * elements_per_bucket as u64
}

/// Fill percentage, for display purposes only (`table::stats`). Decision
/// logic below cross-multiplies instead, to match `hashtab.c`'s exact
/// integer comparisons without an intermediate truncating division.
#[inline]
pub(crate) fn fill_percent(used: u64, capacity: u64) -> u8 {
    if capacity == 0 {
        return 100;
    }
    ((used.saturating_mul(100)) / capacity).min(100) as u8
}

/// Decides whether an insert-time check should schedule an expansion of
/// the live table. Mirrors `hashtabExpandIfNeeded`'s
/// `min_capacity * 100 <= current_capacity * max_fill_percent` guard.
pub(crate) fn should_expand(min_capacity: u64, current_capacity: u64, policy: ResizePolicy) -> bool {
    if policy == ResizePolicy::Forbid {
        return false;
    }
    let max_fill_percent = if policy == ResizePolicy::Avoid { MAX_FILL_PERCENT_HARD } else { MAX_FILL_PERCENT_SOFT };
    min_capacity.saturating_mul(100) > current_capacity.saturating_mul(max_fill_percent as u64)
}

/// Decides whether a delete-time check should schedule a shrink. Mirrors
/// `hashtabShrinkIfNeeded`'s `used * 100 > current_capacity *
/// min_fill_percent` guard (inverted: this returns whether shrinking
/// *should* happen). Never proposed for a table already at
/// [`MIN_BUCKET_EXP`], and never while a rehash is already in progress
/// (the caller is expected to check that separately, as `hashtabShrinkIfNeeded`
/// does via `hashtabIsRehashing`).
pub(crate) fn should_shrink(used: u64, current_capacity: u64, current_exp: u8, policy: ResizePolicy) -> bool {
    if current_exp <= MIN_BUCKET_EXP || policy == ResizePolicy::Forbid {
        return false;
    }
    let min_fill_percent = if policy == ResizePolicy::Avoid { MIN_FILL_PERCENT_HARD } else { MIN_FILL_PERCENT_SOFT };
    used.saturating_mul(100) <= current_capacity.saturating_mul(min_fill_percent as u64)
}

/// Smallest exponent `exp` such that `1 << exp` buckets can hold
/// `min_capacity` elements without the fill percentage exceeding
/// [`MAX_FILL_PERCENT_SOFT`], mirroring `nextBucketExp`'s `ceil(x / y)`
/// bit-counting trick. Returns `None` only on an overflow that would make
/// the computation meaningless (`min_capacity` close to `u64::MAX`).
pub(crate) fn next_bucket_exp(min_capacity: u64, bucket_factor: u64, bucket_divisor: u64) -> Option<u8> {
    if min_capacity == 0 {
        return Some(MIN_BUCKET_EXP);
    }
    let min_buckets = min_capacity.checked_mul(bucket_factor)?.checked_sub(1)?.checked_div(bucket_divisor)?.checked_add(1)?;
    if min_buckets <= 1 {
        return Some(0);
    }
    let bits_needed = u64::BITS - (min_buckets - 1).leading_zeros();
    if bits_needed > 63 {
        return None;
    }
    Some(bits_needed as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forbid_never_expands_or_shrinks() {
        assert!(!should_expand(1000, 10, ResizePolicy::Forbid));
        assert!(!should_shrink(0, 1000, 5, ResizePolicy::Forbid));
    }

    #[test]
    fn avoid_waits_for_hard_ceiling() {
        assert!(!should_expand(80, 100, ResizePolicy::Avoid));
        assert!(should_expand(91, 100, ResizePolicy::Avoid));
        assert!(should_expand(78, 100, ResizePolicy::Allow));
    }

    #[test]
    fn next_bucket_exp_matches_known_points() {
        // 16/3/7 geometry: used=10000 should fit under soft ceiling.
        let exp = next_bucket_exp(10_001, 3, 16).unwrap();
        let cap = capacity_for_exp(exp, 7);
        assert!(cap >= 10_001);
    }

    #[test]
    fn empty_table_targets_min_exp() {
        assert_eq!(next_bucket_exp(0, 3, 16).unwrap(), MIN_BUCKET_EXP);
    }
}
