//! Safe and unsafe iteration.
//!
//! Traversal order for both: natural bucket order over `tables[0]`, then (if
//! a rehash is in progress) `tables[1]`, skipping `tables[0]` positions
//! already migrated past `rehash_idx`.

use super::layout::ELEMENTS_PER_BUCKET;
use super::HashTable;
use crate::config::TableType;
use crate::error::TableError;

/// A rehash-pausing iterator: safe to insert, delete, or replace through
/// while iterating (subject to the guarantees in the module-level docs of
/// `hashtabInitSafeIterator`'s Rust counterpart — elements already returned
/// may be freely removed/replaced; elements not yet returned may or may not
/// be observed if replaced). Pauses rehashing on its first `next()` call and
/// resumes on `Drop`, so the caller never has to remember to call a reset
/// function — unlike `hashtabResetIterator`, forgetting to finish the
/// iterator simply can't happen.
pub struct SafeIter<'t, T, Ty: TableType<T>> {
    table: &'t mut HashTable<T, Ty>,
    started: bool,
    side: usize,
    index: isize,
    pos_in_bucket: usize,
}

impl<'t, T: Copy, Ty: TableType<T>> SafeIter<'t, T, Ty> {
    pub(crate) fn new(table: &'t mut HashTable<T, Ty>) -> Self {
        SafeIter { table, started: false, side: 0, index: -1, pos_in_bucket: 0 }
    }
}

impl<'t, T: Copy, Ty: TableType<T>> Iterator for SafeIter<'t, T, Ty> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        loop {
            if !self.started {
                self.started = true;
                self.table.pause_rehashing();
                self.index = if self.table.is_rehashing_public() { self.table.rehash_idx } else { 0 };
                self.pos_in_bucket = 0;
            } else {
                self.pos_in_bucket += 1;
                if self.pos_in_bucket >= ELEMENTS_PER_BUCKET {
                    self.pos_in_bucket = 0;
                    self.index += 1;
                    if self.index as usize >= self.table.tables[self.side].buckets() {
                        self.index = 0;
                        if self.table.is_rehashing_public() && self.side == 0 {
                            self.side = 1;
                        } else {
                            return None;
                        }
                    }
                }
            }
            let bucket = self.table.tables[self.side].bucket(self.index as usize);
            if !bucket.is_present(self.pos_in_bucket) {
                continue;
            }
            // SAFETY: presence bit `pos_in_bucket` is set.
            return Some(unsafe { bucket.read(self.pos_in_bucket) });
        }
    }
}

impl<'t, T, Ty: TableType<T>> Drop for SafeIter<'t, T, Ty> {
    fn drop(&mut self) {
        if self.started {
            self.table.resume_rehashing();
        }
    }
}

/// A fingerprint-checked iterator: faster (no pause bookkeeping per step),
/// but disallows *any* mutating operation or rehash-triggering read on the
/// table between construction and the final `next()` call. Violating this
/// is checked best-effort with a `debug_assert!` against a Wang-mixed
/// fingerprint of the table's allocation state, matching `hashtabNext`'s
/// `assert(iter->fingerprint == hashtabFingerprint(iter->t))` on reset.
///
/// Exposed as `unsafe fn next` rather than a safe `Iterator` impl: unlike
/// the safe iterator, continuing to call this after a disallowed mutation
/// must be flagged as undefined behavior from the caller's side, not
/// silently tolerated the way a merely-suboptimal `Iterator::next` would.
pub struct UncheckedIter<'t, T, Ty: TableType<T>> {
    table: &'t HashTable<T, Ty>,
    started: bool,
    fingerprint: u64,
    side: usize,
    index: isize,
    pos_in_bucket: usize,
}

impl<'t, T: Copy, Ty: TableType<T>> UncheckedIter<'t, T, Ty> {
    pub(crate) fn new(table: &'t HashTable<T, Ty>) -> Self {
        UncheckedIter { table, started: false, fingerprint: 0, side: 0, index: -1, pos_in_bucket: 0 }
    }

    /// Advances the iterator. Caller contract: no insert, delete, replace,
    /// or rehash-triggering find may happen on `table` between this
    /// iterator's construction and its last call to `next`.
    ///
    /// # Safety
    /// Violating the no-mutation contract is checked only best-effort via a
    /// `debug_assert!` on the table's fingerprint; in a release build a
    /// violation silently returns elements from whatever state the table
    /// happens to be in, which may not correspond to any consistent
    /// traversal order.
    pub unsafe fn next(&mut self) -> Option<T> {
        loop {
            if !self.started {
                self.started = true;
                self.fingerprint = self.table.fingerprint();
                self.index = if self.table.is_rehashing_public() { self.table.rehash_idx } else { 0 };
                self.pos_in_bucket = 0;
            } else {
                debug_assert_eq!(self.fingerprint, self.table.fingerprint(), "{}", TableError::FingerprintMismatch);
                self.pos_in_bucket += 1;
                if self.pos_in_bucket >= ELEMENTS_PER_BUCKET {
                    self.pos_in_bucket = 0;
                    self.index += 1;
                    if self.index as usize >= self.table.tables[self.side].buckets() {
                        self.index = 0;
                        if self.table.is_rehashing_public() && self.side == 0 {
                            self.side = 1;
                        } else {
                            return None;
                        }
                    }
                }
            }
            let bucket = self.table.tables[self.side].bucket(self.index as usize);
            if !bucket.is_present(self.pos_in_bucket) {
                continue;
            }
            // SAFETY: presence bit `pos_in_bucket` is set.
            return Some(unsafe { bucket.read(self.pos_in_bucket) });
        }
    }
}

impl<T: Copy, Ty: TableType<T>> HashTable<T, Ty> {
    /// A rehash-pausing iterator over every element, each returned exactly
    /// once if the table isn't mutated during the pass, plus the weaker
    /// guarantees documented on [`SafeIter`] if it is.
    pub fn iter(&mut self) -> SafeIter<'_, T, Ty> {
        SafeIter::new(self)
    }

    /// A fingerprint-checked iterator with no per-step pause bookkeeping.
    /// See [`UncheckedIter::next`] for the caller contract.
    pub fn iter_unchecked(&self) -> UncheckedIter<'_, T, Ty> {
        UncheckedIter::new(self)
    }
}
