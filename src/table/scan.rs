//! Stateless cursor-based scanning.
//!
//! A scan resumes from a cursor returned by the previous call and returns a
//! new one; `0` means a full pass has completed. Unlike the iterators in
//! [`super::iter`], nothing about a scan is tied to the table's lifetime
//! between calls — the table can be freely mutated, resized, or even
//! rehashed between two calls to [`scan`] and the pass still completes
//! correctly, because the reverse-bit cursor keeps the traversal order
//! stable across a doubling (see [`super::cursor`]).

use super::cursor::{cursor_is_less_than, next_cursor};
use super::layout::ELEMENTS_PER_BUCKET;
use super::HashTable;
use crate::config::TableType;

bitflags::bitflags! {
    /// Tuning flags for [`HashTable::scan`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ScanFlags: u8 {
        /// Pass `&mut T` to the callback instead of a copy, so the caller
        /// can rewrite the slot in place (e.g. to relocate `T`'s own
        /// out-of-line storage during defragmentation).
        const EMIT_REF = 1 << 0;
        /// Advance the cursor only one step per call instead of chasing a
        /// whole probe chain. Faster per call, but an element can be
        /// missed if a rehash moves it between two calls — acceptable for
        /// sampling, not for a caller relying on the full-scan guarantee.
        const SINGLE_STEP = 1 << 1;
    }
}

enum Emit<'a, T> {
    ByValue(&'a mut dyn FnMut(T)),
    ByRef(&'a mut dyn FnMut(&mut T)),
}

fn emit_bucket<T: Copy, Ty: TableType<T>>(table: &mut super::side::Side<T>, index: usize, emit: &mut Emit<'_, T>) -> bool {
    let bucket = table.bucket_mut(index);
    for pos in 0..ELEMENTS_PER_BUCKET {
        if !bucket.is_present(pos) {
            continue;
        }
        match emit {
            // SAFETY: presence bit `pos` is set.
            Emit::ByValue(f) => f(unsafe { bucket.read(pos) }),
            Emit::ByRef(f) => f(unsafe { bucket.as_mut(pos) }),
        }
    }
    bucket.everfull()
}

fn scan_inner<T: Copy, Ty: TableType<T>>(table: &mut HashTable<T, Ty>, mut cursor: usize, flags: ScanFlags, emit: &mut Emit<'_, T>) -> usize {
    if table.is_empty() {
        return 0;
    }
    table.pause_rehashing();

    let single_step = flags.contains(ScanFlags::SINGLE_STEP);
    let mut cursor_passed_zero = false;
    loop {
        let mut in_probe_sequence = false;
        if !table.is_rehashing() {
            let mask = table.tables[0].mask();
            in_probe_sequence |= emit_bucket::<T, Ty>(&mut table.tables[0], cursor & mask, emit);
            cursor = next_cursor(cursor, mask);
        } else {
            // `rehash_idx` always tracks progress through `tables[0]` (the
            // migration source, whether growing or shrinking; see
            // `rehash_step`). The two masks below are the smaller/bigger of
            // the pair regardless of which physical side each belongs to,
            // but the buckets emitted are always the literal `tables[0]`
            // (source) in the first block and `tables[1]` (destination) in
            // the loop, exactly as the straddled scan does.
            let mask_a = table.tables[0].mask();
            let mask_b = table.tables[1].mask();
            let (mask_small, mask_big) = if mask_a <= mask_b { (mask_a, mask_b) } else { (mask_b, mask_a) };

            if !cursor_is_less_than(cursor, table.rehash_idx.max(0) as usize) {
                in_probe_sequence |= emit_bucket::<T, Ty>(&mut table.tables[0], cursor & mask_small, emit);
            }

            loop {
                in_probe_sequence |= emit_bucket::<T, Ty>(&mut table.tables[1], cursor & mask_big, emit);
                cursor = next_cursor(cursor, mask_big);
                if cursor & (mask_small ^ mask_big) == 0 {
                    break;
                }
            }
        }
        if cursor == 0 {
            cursor_passed_zero = true;
        }
        if !(in_probe_sequence && !single_step) {
            break;
        }
    }

    table.resume_rehashing();
    if cursor_passed_zero {
        0
    } else {
        cursor
    }
}

impl<T: Copy, Ty: TableType<T>> HashTable<T, Ty> {
    /// Resumes a scan from `cursor` (`0` to start a fresh pass), calling
    /// `f` with a copy of every element visited. Returns the cursor to
    /// pass to the next call, or `0` once the pass has completed.
    pub fn scan(&mut self, cursor: usize, flags: ScanFlags, mut f: impl FnMut(T)) -> usize {
        debug_assert!(!flags.contains(ScanFlags::EMIT_REF), "scan: use scan_ref for ScanFlags::EMIT_REF");
        scan_inner(self, cursor, flags, &mut Emit::ByValue(&mut f))
    }

    /// Like [`HashTable::scan`], but calls `f` with `&mut T`, letting the
    /// callback rewrite the element in place.
    pub fn scan_ref(&mut self, cursor: usize, flags: ScanFlags, mut f: impl FnMut(&mut T)) -> usize {
        scan_inner(self, cursor, flags, &mut Emit::ByRef(&mut f))
    }
}
