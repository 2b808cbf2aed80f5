//! Process-wide resize policy and the per-type behavior contract.

use std::sync::atomic::{AtomicU8, Ordering};

/// Governs whether a table is allowed to allocate a second bucket array to
/// rehash in the background.
///
/// This is process-global in `hashtab.c` because the decision is really
/// about whether a `fork()`-based snapshot (RDB save, AOF rewrite) is in
/// flight: doubling a table's memory mid-fork defeats the copy-on-write
/// savings the fork was taken for. A long-lived process flips this around
/// its fork calls rather than per-table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ResizePolicy {
    /// Expand and shrink freely (the default).
    Allow = 0,
    /// Defer non-essential resizes; still resize past the hard fill
    /// ceiling to avoid unbounded probe chains.
    Avoid = 1,
    /// Never resize. Used only very briefly, e.g. while a single rehash
    /// step is already in progress and must not be joined by another.
    Forbid = 2,
}

impl ResizePolicy {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => ResizePolicy::Allow,
            1 => ResizePolicy::Avoid,
            _ => ResizePolicy::Forbid,
        }
    }
}

static RESIZE_POLICY: AtomicU8 = AtomicU8::new(ResizePolicy::Allow as u8);

/// Returns the resize policy in effect for every table in this process.
pub fn resize_policy() -> ResizePolicy {
    ResizePolicy::from_u8(RESIZE_POLICY.load(Ordering::Relaxed))
}

/// Sets the resize policy in effect for every table in this process.
///
/// Intended to be called around a `fork()`-like snapshot operation:
/// `set_resize_policy(ResizePolicy::Avoid)` before forking,
/// `set_resize_policy(ResizePolicy::Allow)` once the snapshot is done.
pub fn set_resize_policy(policy: ResizePolicy) {
    RESIZE_POLICY.store(policy as u8, Ordering::Relaxed);
}

/// Describes how a [`HashTable`](crate::table::HashTable) should treat the
/// elements it stores. This is the capability bag `hashtab.c` expresses as
/// a struct of optional function pointers (`hashtabType`); Rust's default
/// trait methods are the idiomatic equivalent, so only [`element_key`] is
/// required.
///
/// Implemented once per element type, the way `britt-marie`'s `IndexValue`
/// trait is implemented once per value kind.
///
/// [`element_key`]: TableType::element_key
pub trait TableType<T> {
    /// The part of an element that identifies it.
    type Key: Eq;

    /// Computes the 64-bit hash of `key`. The default hashes the key's
    /// `Hash` representation with the process-wide keyed hash function
    /// (see [`crate::hash`]); override to hash only a prefix, fold case,
    /// or otherwise diverge from `std::hash::Hash`.
    fn hash(&self, key: &Self::Key) -> u64
    where
        Self::Key: std::hash::Hash,
    {
        crate::hash::keyed_hash(key)
    }

    /// Returns whether `a` and `b` denote the same entry. Default: `Eq`.
    fn key_compare(&self, a: &Self::Key, b: &Self::Key) -> bool {
        a == b
    }

    /// Borrows the key out of a stored element. The only method without a
    /// default: the table has no other way to find an element's identity.
    fn element_key<'e>(&self, elem: &'e T) -> &'e Self::Key;

    /// Runs when an element leaves the table permanently: on `delete`, on
    /// the element a `replace` displaces, and on every element still
    /// resident when the table itself is dropped or emptied. Never runs
    /// on `pop` or a two-phase pop, which hand the element back to the
    /// caller instead of destroying it.
    fn on_destroy(&self, _elem: T) {}

    /// Extra bytes of client metadata trailing the table's own fields, for
    /// callers that want to embed small fixed-size state alongside a
    /// table (mirrors `hashtabMetadata`/`hashtabMetadataSize`).
    fn metadata_size(&self) -> usize {
        0
    }

    /// Fires exactly once when an incremental rehash begins.
    fn rehashing_started(&self, _table: &crate::table::HashTable<T, Self>)
    where
        Self: Sized,
    {
    }

    /// Fires exactly once when an incremental rehash completes.
    fn rehashing_completed(&self, _table: &crate::table::HashTable<T, Self>)
    where
        Self: Sized,
    {
    }

    /// When true, a resize rehashes the whole table in one step instead of
    /// incrementally. Useful for small, short-lived tables where the
    /// incremental bookkeeping costs more than a single linear pass.
    fn instant_rehashing(&self) -> bool {
        false
    }
}
