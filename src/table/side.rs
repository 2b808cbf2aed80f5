//! A single bucket array: one side (`tables[0]` or `tables[1]`) of a
//! [`HashTable`](super::HashTable).
//!
//! Owns a raw, zeroed allocation of `Bucket<T>`s. Zeroing is load-bearing,
//! not just convenient: a freshly-zeroed `Bucket<T>` already has `ctrl ==
//! 0`, i.e. `everfull` clear and every presence bit clear, which is exactly
//! the empty-bucket state — matching `hashtabAlloc`'s use of
//! `zcallocTypeCopy`/`calloc` in `hashtab.c`.

use std::alloc::{self, Layout};
use std::ptr::NonNull;

use super::bucket::Bucket;
use super::resize::MIN_BUCKET_EXP;

/// `bucket_exp < 0` (stored as `-1`) means "unallocated"; this is encoded
/// at the `Side` level as `ptr` being dangling and `exp` being `None`.
pub(crate) struct Side<T> {
    ptr: Option<NonNull<Bucket<T>>>,
    exp: Option<u8>,
    pub(crate) used: usize,
}

impl<T> Side<T> {
    pub(crate) fn unallocated() -> Self {
        Side { ptr: None, exp: None, used: 0 }
    }

    pub(crate) fn exp(&self) -> i8 {
        match self.exp {
            Some(e) => e as i8,
            None => -1,
        }
    }

    pub(crate) fn is_allocated(&self) -> bool {
        self.exp.is_some()
    }

    pub(crate) fn buckets(&self) -> usize {
        match self.exp {
            Some(e) => 1usize << e,
            None => 0,
        }
    }

    pub(crate) fn mask(&self) -> usize {
        self.buckets().saturating_sub(1)
    }

    /// Address of the backing allocation, `0` if unallocated. Used only to
    /// fold allocation identity into [`HashTable::fingerprint`]; never
    /// dereferenced as a pointer from here.
    pub(crate) fn addr(&self) -> usize {
        match self.ptr {
            Some(p) => p.as_ptr() as usize,
            None => 0,
        }
    }

    fn layout_for(exp: u8) -> Layout {
        let buckets = 1usize << exp;
        Layout::array::<Bucket<T>>(buckets).expect("bucket array layout overflow")
    }

    /// Allocates a new zeroed bucket array of `1 << exp` buckets, replacing
    /// whatever this side held (which must already have been drained/freed
    /// by the caller — `Side` does not run element destructors itself).
    pub(crate) fn alloc(&mut self, exp: u8) {
        debug_assert!(exp >= MIN_BUCKET_EXP);
        let layout = Self::layout_for(exp);
        // SAFETY: layout has nonzero size for any exp, since 1 << exp >= 1
        // and Bucket<T> has nonzero size (it is always exactly 64 bytes).
        let raw = unsafe { alloc::alloc_zeroed(layout) };
        let ptr = match NonNull::new(raw as *mut Bucket<T>) {
            Some(p) => p,
            None => alloc::handle_alloc_error(layout),
        };
        self.ptr = Some(ptr);
        self.exp = Some(exp);
        self.used = 0;
    }

    /// Fallible counterpart to [`Side::alloc`], used by `try_` entry
    /// points so callers can recover from allocation failure instead of
    /// aborting.
    pub(crate) fn try_alloc(&mut self, exp: u8) -> bool {
        debug_assert!(exp >= MIN_BUCKET_EXP);
        let layout = Self::layout_for(exp);
        // SAFETY: see `alloc`.
        let raw = unsafe { alloc::alloc_zeroed(layout) };
        match NonNull::new(raw as *mut Bucket<T>) {
            Some(ptr) => {
                self.ptr = Some(ptr);
                self.exp = Some(exp);
                self.used = 0;
                true
            }
            None => false,
        }
    }

    #[inline]
    pub(crate) fn bucket(&self, index: usize) -> &Bucket<T> {
        debug_assert!(index < self.buckets());
        // SAFETY: `ptr` points to `buckets()` contiguous live `Bucket<T>`s
        // whenever `exp.is_some()`, which `index < self.buckets()` implies.
        unsafe { &*self.ptr.expect("bucket() called on unallocated side").as_ptr().add(index) }
    }

    #[inline]
    pub(crate) fn bucket_mut(&mut self, index: usize) -> &mut Bucket<T> {
        debug_assert!(index < self.buckets());
        // SAFETY: see `bucket`; `&mut self` gives exclusive access.
        unsafe { &mut *self.ptr.expect("bucket_mut() called on unallocated side").as_ptr().add(index) }
    }

    /// Frees the bucket array without running any element destructors.
    /// Callers must have already destroyed/moved out every live element.
    pub(crate) fn free(&mut self) {
        if let (Some(ptr), Some(exp)) = (self.ptr.take(), self.exp.take()) {
            let layout = Self::layout_for(exp);
            // SAFETY: `ptr` was allocated by `alloc_zeroed` with this same
            // layout and has not been freed since.
            unsafe { alloc::dealloc(ptr.as_ptr() as *mut u8, layout) };
        }
        self.used = 0;
    }

    /// Bytes of heap memory currently held by this side, for
    /// `table::mem`'s accounting.
    pub(crate) fn mem_usage(&self) -> usize {
        match self.exp {
            Some(exp) => Self::layout_for(exp).size(),
            None => 0,
        }
    }
}

impl<T> Drop for Side<T> {
    fn drop(&mut self) {
        debug_assert_eq!(self.used, 0, "Side dropped with live elements still resident; HashTable::drop must destroy them first");
        self.free();
    }
}
