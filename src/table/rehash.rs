//! Incremental rehashing: the step function and the resize entry points
//! that schedule it.

use super::cursor::{next_cursor, prev_cursor};
use super::layout::ELEMENTS_PER_BUCKET;
use super::probe;
use super::resize;
use super::HashTable;
use crate::config::{resize_policy, ResizePolicy, TableType};
use crate::error::{Result, TableError};

impl<T: Copy, Ty: TableType<T>> HashTable<T, Ty> {
    pub(super) fn is_rehashing(&self) -> bool {
        self.rehash_idx >= 0
    }

    /// Performs one rehash step: migrates every live slot of
    /// `tables[0][rehash_idx]` into `tables[1]`, then advances `rehash_idx`
    /// in probe order so complete probe chains get migrated together.
    pub(crate) fn rehash_step(&mut self) {
        debug_assert!(self.is_rehashing());
        let idx = self.rehash_idx as usize;
        let old_mask = self.tables[0].mask();

        let shrinking = self.tables[1].exp() < self.tables[0].exp();
        let skip_hash = shrinking && !self.tables[0].bucket(prev_cursor(idx, old_mask)).everfull();

        for pos in 0..ELEMENTS_PER_BUCKET {
            if !self.tables[0].bucket(idx).is_present(pos) {
                continue;
            }
            // SAFETY: presence bit `pos` is set.
            let elem = unsafe { self.tables[0].bucket(idx).read(pos) };
            let h2 = self.tables[0].bucket(idx).hash_byte(pos);
            let hash = if skip_hash { idx as u64 } else { self.ty.hash(self.ty.element_key(&elem)) };

            let new_mask = self.tables[1].mask();
            let (dst_idx, dst_pos) = probe::find_bucket_for_insert(&mut self.tables[1], new_mask, hash);
            let dst = self.tables[1].bucket_mut(dst_idx);
            dst.write(dst_pos, elem);
            dst.set_hash_byte(dst_pos, h2);
            dst.set_present(dst_pos);
            if dst.is_full() {
                dst.set_everfull();
            }
            self.tables[0].used -= 1;
            self.tables[1].used += 1;
        }
        self.tables[0].bucket_mut(idx).clear_all_presence();

        self.rehash_idx = next_cursor(idx, old_mask) as isize;
        if self.rehash_idx == 0 {
            self.rehashing_completed();
        }
    }

    fn rehashing_completed(&mut self) {
        self.ty.rehashing_completed(self);
        self.tables[0].free();
        self.tables.swap(0, 1);
        self.rehash_idx = -1;
    }

    pub(crate) fn rehash_step_on_read_if_needed(&mut self) {
        if !self.is_rehashing() || self.pause_rehash > 0 {
            return;
        }
        if resize_policy() != ResizePolicy::Allow {
            return;
        }
        self.rehash_step();
    }

    /// On writes we only opportunistically rehash under `Avoid`, since
    /// `Allow` already got a step from the preceding read-side lookup that
    /// every insert/delete performs first; driving it twice per write
    /// would just slow down the common path for no extra progress.
    pub(crate) fn rehash_step_on_write_if_needed(&mut self) {
        if !self.is_rehashing() || self.pause_rehash > 0 {
            return;
        }
        if resize_policy() != ResizePolicy::Avoid {
            return;
        }
        self.rehash_step();
    }

    fn fast_forward_rehash(&mut self) {
        while self.is_rehashing() {
            self.rehash_step();
        }
    }

    /// Allocates a new table sized for `min_capacity` and begins
    /// incremental rehashing into it. Returns whether a resize happened;
    /// resizing to the already-current size is a no-op.
    pub(crate) fn resize_to(&mut self, min_capacity: usize) -> bool {
        self.try_resize_to(min_capacity, true).unwrap_or(false)
    }

    pub(crate) fn try_resize_to(&mut self, min_capacity: usize, panic_on_alloc_failure: bool) -> Result<bool> {
        let min_capacity = min_capacity.max(1) as u64;
        let exp = match resize::next_bucket_exp(min_capacity, super::layout::BUCKET_FACTOR as u64, super::layout::BUCKET_DIVISOR as u64) {
            Some(e) => e,
            None => return Err(TableError::CapacityOverflow { requested: min_capacity as usize }),
        };
        let num_buckets = 1u64 << exp;
        let new_capacity = num_buckets * ELEMENTS_PER_BUCKET as u64;
        if new_capacity < min_capacity {
            return Err(TableError::CapacityOverflow { requested: min_capacity as usize });
        }
        let old_exp = if self.is_rehashing() { self.tables[1].exp() } else { self.tables[0].exp() };
        if exp as i8 == old_exp {
            return Ok(false);
        }

        self.fast_forward_rehash();

        if panic_on_alloc_failure {
            self.tables[1].alloc(exp);
        } else if !self.tables[1].try_alloc(exp) {
            return Err(TableError::AllocFailed { size: (new_capacity as usize) * std::mem::size_of::<super::bucket::Bucket<T>>() });
        }
        self.rehash_idx = 0;
        self.ty.rehashing_started(self);

        if !self.tables[0].is_allocated() || self.tables[0].used == 0 {
            self.rehashing_completed();
        } else if self.ty.instant_rehashing() {
            self.fast_forward_rehash();
        }
        Ok(true)
    }

    /// Called on every insert. Grows the live table once the fill
    /// percentage crosses the policy-dependent soft/hard ceiling.
    pub(crate) fn expand_if_needed(&mut self) {
        let min_capacity = (self.tables[0].used + self.tables[1].used + 1) as u64;
        let live = if self.is_rehashing() { 1 } else { 0 };
        let current_capacity = if self.tables[live].is_allocated() {
            resize::capacity_for_exp(self.tables[live].exp() as u8, ELEMENTS_PER_BUCKET)
        } else {
            0
        };
        if resize::should_expand(min_capacity, current_capacity, resize_policy()) {
            self.resize_to(min_capacity as usize);
        }
    }

    /// Called on every delete. Shrinks the live table once the fill
    /// percentage drops below the policy-dependent soft/hard floor.
    /// Never triggers while a rehash is already in progress or while
    /// [`pause_auto_shrink`](HashTable::pause_auto_shrink) is held.
    pub(crate) fn shrink_if_needed(&mut self) {
        if self.is_rehashing() || self.pause_auto_shrink > 0 {
            return;
        }
        if !self.tables[0].is_allocated() {
            return;
        }
        let exp = self.tables[0].exp();
        if exp < 0 {
            return;
        }
        let current_capacity = resize::capacity_for_exp(exp as u8, ELEMENTS_PER_BUCKET);
        if resize::should_shrink(self.tables[0].used as u64, current_capacity, exp as u8, resize_policy()) {
            self.resize_to(self.tables[0].used);
        }
    }

    /// `(from_size, to_size)` in element capacity. Panics if no rehash is
    /// in progress, matching `hashtabRehashingInfo`'s documented contract.
    pub fn rehashing_info(&self) -> (usize, usize) {
        assert!(self.is_rehashing(), "rehashing_info called while not rehashing");
        (self.tables[0].buckets() * ELEMENTS_PER_BUCKET, self.tables[1].buckets() * ELEMENTS_PER_BUCKET)
    }

}
