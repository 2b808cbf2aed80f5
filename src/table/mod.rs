//! The cache-conscious open-addressed hash table.
//!
//! `HashTable<T, Ty>` owns up to two bucket arrays (`tables[0]`, the live
//! table, and `tables[1]`, a rehash target while a resize is in progress),
//! and moves elements between them incrementally rather than all at once,
//! so no single operation pays for a full-table rehash. See the crate-level
//! docs for the cursor/bucket/rehash design this is built from.

mod bucket;
mod cursor;
pub mod iter;
mod layout;
pub mod position;
mod probe;
mod rehash;
mod resize;
pub mod sample;
pub mod scan;
mod side;
pub mod stats;

pub use position::Position;
pub use scan::ScanFlags;

use layout::ELEMENTS_PER_BUCKET;
use side::Side;

use crate::config::TableType;
use crate::error::{Result, TableError};

/// An open-addressed hash table generic over an element type `T` and a
/// [`TableType<T>`] describing how to extract and compare keys.
///
/// `T` must be `Copy`: the table never assumes an element is (or embeds) a
/// pointer, and storing elements by value sidesteps any aliasing concerns
/// around the raw bucket-array allocation. Large or non-`Copy` payloads
/// should be stored behind an `Rc`/`Arc`/index and looked up from `T`.
pub struct HashTable<T, Ty: TableType<T>> {
    ty: Ty,
    tables: [Side<T>; 2],
    /// `-1` when idle, otherwise the next bucket of `tables[0]` due to be
    /// migrated into `tables[1]`.
    rehash_idx: isize,
    pause_rehash: i16,
    pause_auto_shrink: i16,
    metadata: Vec<u8>,
}

/// Outcome of [`HashTable::find_position_for_insert`].
pub enum InsertSlot<T> {
    /// No element with this key exists yet; `Position` names a reserved
    /// slot for a follow-up [`HashTable::insert_at`] call.
    Reserved(Position),
    /// An element with this key already exists; here it is.
    Occupied(T),
}

impl<T: Copy, Ty: TableType<T>> HashTable<T, Ty> {
    /// Creates an empty table. No allocation happens until the first
    /// insert, matching `hashtabCreate`'s lazy table allocation.
    pub fn new(ty: Ty) -> Self {
        let () = bucket::Bucket::<T>::ASSERT_ONE_CACHE_LINE;
        let metadata = vec![0u8; ty.metadata_size()];
        HashTable { ty, tables: [Side::unallocated(), Side::unallocated()], rehash_idx: -1, pause_rehash: 0, pause_auto_shrink: 0, metadata }
    }

    /// Number of elements currently stored.
    pub fn len(&self) -> usize {
        self.tables[0].used + self.tables[1].used
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total element capacity across both bucket arrays, i.e. the number
    /// of elements that can be stored before the next expansion.
    pub fn capacity(&self) -> usize {
        (self.tables[0].buckets() + self.tables[1].buckets()) * ELEMENTS_PER_BUCKET
    }

    /// Bytes of heap memory held by this table's bucket arrays and
    /// metadata region, not counting the elements themselves if `T` owns
    /// further heap allocations of its own. Mirrors `hashtabMemUsage`.
    pub fn mem_usage(&self) -> usize {
        std::mem::size_of::<Self>() + self.metadata.len() + self.tables[0].mem_usage() + self.tables[1].mem_usage()
    }

    /// A reference to the type descriptor this table was created with.
    pub fn table_type(&self) -> &Ty {
        &self.ty
    }

    /// The trailing client metadata region, sized by `Ty::metadata_size()`.
    pub fn metadata(&self) -> &[u8] {
        &self.metadata
    }

    pub fn metadata_mut(&mut self) -> &mut [u8] {
        &mut self.metadata
    }

    fn hash_of(&self, key: &Ty::Key) -> u64
    where
        Ty::Key: std::hash::Hash,
    {
        self.ty.hash(key)
    }

    /// Finds the element matching `key`, if any.
    pub fn find(&mut self, key: &Ty::Key) -> Option<T>
    where
        Ty::Key: std::hash::Hash,
    {
        if self.is_empty() {
            return None;
        }
        let hash = self.hash_of(key);
        self.rehash_step_on_read_if_needed();
        self.find_no_rehash_step(hash, key)
    }

    fn find_no_rehash_step(&self, hash: u64, key: &Ty::Key) -> Option<T> {
        // Newer table first: it typically has fewer `everfull` buckets, so
        // probing it costs less on average.
        for side in [1usize, 0] {
            if self.tables[side].used == 0 {
                continue;
            }
            let mask = self.tables[side].mask();
            if let Some((idx, pos)) = probe::find(&self.tables[side], &self.ty, mask, hash, key) {
                // SAFETY: `find` only returns positions with their
                // presence bit set.
                return Some(unsafe { self.tables[side].bucket(idx).read(pos) });
            }
        }
        None
    }

    fn find_with_location(&self, hash: u64, key: &Ty::Key) -> Option<(usize, usize, usize)> {
        for side in [1usize, 0] {
            if self.tables[side].used == 0 {
                continue;
            }
            let mask = self.tables[side].mask();
            if let Some((idx, pos)) = probe::find(&self.tables[side], &self.ty, mask, hash, key) {
                return Some((side, idx, pos));
            }
        }
        None
    }

    /// Inserts `elem`. Returns `true` if inserted, `false` if an element
    /// with the same key already existed (in which case `elem` is simply
    /// dropped — see [`HashTable::replace`] to overwrite instead).
    pub fn insert(&mut self, elem: T) -> bool
    where
        Ty::Key: std::hash::Hash,
    {
        self.add_or_find(elem).is_none()
    }

    /// Inserts `elem` and returns `None`, unless an element with the same
    /// key already exists, in which case that existing element is
    /// returned (and `elem` is dropped) instead of inserting.
    pub fn add_or_find(&mut self, elem: T) -> Option<T>
    where
        Ty::Key: std::hash::Hash,
    {
        let key = self.ty.element_key(&elem);
        let hash = self.hash_of(key);
        self.rehash_step_on_read_if_needed();
        if let Some(existing) = self.find_no_rehash_step(hash, self.ty.element_key(&elem)) {
            return Some(existing);
        }
        self.insert_raw(hash, elem);
        None
    }

    /// Inserts `elem`, overwriting (and destroying) any existing element
    /// with the same key. Returns `true` if a new element was inserted,
    /// `false` if an existing one was overwritten.
    pub fn replace(&mut self, elem: T) -> bool
    where
        Ty::Key: std::hash::Hash,
    {
        let key = self.ty.element_key(&elem);
        let hash = self.hash_of(key);
        self.rehash_step_on_read_if_needed();
        if let Some((side, idx, pos)) = self.find_with_location(hash, self.ty.element_key(&elem)) {
            // SAFETY: `find_with_location` only returns present positions.
            let old = unsafe { self.tables[side].bucket_mut(idx).take(pos) };
            self.tables[side].bucket_mut(idx).write(pos, elem);
            self.ty.on_destroy(old);
            false
        } else {
            self.insert_raw(hash, elem);
            true
        }
    }

    /// Shared by `insert`/`add_or_find`/`replace`'s not-found path. Caller
    /// must have already confirmed the key is absent.
    fn insert_raw(&mut self, hash: u64, elem: T) {
        self.expand_if_needed();
        self.rehash_step_on_write_if_needed();
        let side = if self.is_rehashing() { 1 } else { 0 };
        let mask = self.tables[side].mask();
        let (idx, pos) = probe::find_bucket_for_insert(&mut self.tables[side], mask, hash);
        let b = self.tables[side].bucket_mut(idx);
        b.write(pos, elem);
        b.set_present(pos);
        b.set_hash_byte(pos, bucket::high_bits(hash));
        if b.is_full() {
            b.set_everfull();
        }
        self.tables[side].used += 1;
    }

    /// Removes and returns the element matching `key`, without destroying
    /// it. The caller takes ownership.
    pub fn pop(&mut self, key: &Ty::Key) -> Option<T>
    where
        Ty::Key: std::hash::Hash,
    {
        if self.is_empty() {
            return None;
        }
        let hash = self.hash_of(key);
        self.rehash_step_on_read_if_needed();
        let (side, idx, pos) = self.find_with_location(hash, key)?;
        // SAFETY: presence bit is set at this position.
        let elem = unsafe { self.tables[side].bucket_mut(idx).take(pos) };
        self.tables[side].bucket_mut(idx).clear_present(pos);
        self.tables[side].used -= 1;
        self.shrink_if_needed();
        Some(elem)
    }

    /// Removes the element matching `key` and runs [`TableType::on_destroy`]
    /// on it. Returns whether an element was found.
    pub fn delete(&mut self, key: &Ty::Key) -> bool
    where
        Ty::Key: std::hash::Hash,
    {
        match self.pop(key) {
            Some(elem) => {
                self.ty.on_destroy(elem);
                true
            }
            None => false,
        }
    }

    /// First phase of a two-phase insert: reserves a slot for `key` without
    /// requiring the caller to have constructed the element yet. Returns
    /// the existing element if `key` is already present.
    ///
    /// No other table operation may run between this call and the matching
    /// [`HashTable::insert_at`] — doing so is a logic error, since any
    /// rehash step in between could move the reserved slot.
    pub fn find_position_for_insert(&mut self, key: &Ty::Key) -> InsertSlot<T>
    where
        Ty::Key: std::hash::Hash,
    {
        let hash = self.hash_of(key);
        self.rehash_step_on_read_if_needed();
        if let Some(elem) = self.find_no_rehash_step(hash, key) {
            return InsertSlot::Occupied(elem);
        }
        self.expand_if_needed();
        self.rehash_step_on_write_if_needed();
        let side = if self.is_rehashing() { 1 } else { 0 };
        let mask = self.tables[side].mask();
        let (idx, pos) = probe::find_bucket_for_insert(&mut self.tables[side], mask, hash);
        // Store the hash bits now so `insert_at` need not recompute them.
        self.tables[side].bucket_mut(idx).set_hash_byte(pos, bucket::high_bits(hash));
        InsertSlot::Reserved(Position::encode(idx, pos, side))
    }

    /// Second phase of a two-phase insert: writes `elem` into the slot
    /// named by `position`, which must have come from a
    /// [`HashTable::find_position_for_insert`] call on this same table
    /// with no intervening mutation.
    pub fn insert_at(&mut self, position: Position, elem: T) {
        let (idx, pos, side) = position.decode();
        let b = self.tables[side].bucket_mut(idx);
        debug_assert!(!b.is_present(pos), "{}", TableError::InvalidPosition);
        b.write(pos, elem);
        b.set_present(pos);
        if b.is_full() {
            b.set_everfull();
        }
        self.tables[side].used += 1;
    }

    /// First phase of a two-phase pop: finds the element matching `key`
    /// and pauses rehashing (so the slot cannot move) without removing it.
    /// Pair with [`HashTable::two_phase_pop_delete`].
    pub fn two_phase_pop_find(&mut self, key: &Ty::Key) -> Option<(Position, T)>
    where
        Ty::Key: std::hash::Hash,
    {
        if self.is_empty() {
            return None;
        }
        let hash = self.hash_of(key);
        self.rehash_step_on_read_if_needed();
        let (side, idx, pos) = self.find_with_location(hash, key)?;
        self.pause_rehash += 1;
        // SAFETY: presence bit is set at this position.
        let elem = unsafe { self.tables[side].bucket(idx).read(pos) };
        Some((Position::encode(idx, pos, side), elem))
    }

    /// Second phase of a two-phase pop: removes the element named by
    /// `position` (obtained from [`HashTable::two_phase_pop_find`]) and
    /// resumes rehashing. Ownership of the popped element was already
    /// handed to the caller by `two_phase_pop_find`; this only clears the
    /// slot's bookkeeping.
    pub fn two_phase_pop_delete(&mut self, position: Position) {
        let (idx, pos, side) = position.decode();
        let b = self.tables[side].bucket_mut(idx);
        debug_assert!(b.is_present(pos), "{}", TableError::InvalidPosition);
        b.clear_present(pos);
        self.tables[side].used -= 1;
        self.shrink_if_needed();
        self.pause_rehash -= 1;
        debug_assert!(
            self.pause_rehash >= 0,
            "{}",
            TableError::UnbalancedPause { pause_rehash: self.pause_rehash, pause_auto_shrink: self.pause_auto_shrink }
        );
    }

    /// Removes every element, running [`TableType::on_destroy`] on each,
    /// and frees both bucket arrays.
    pub fn clear(&mut self) {
        if self.is_rehashing() {
            self.ty.rehashing_completed(self);
            self.rehash_idx = -1;
        }
        for side in 0..2 {
            if !self.tables[side].is_allocated() {
                continue;
            }
            for idx in 0..self.tables[side].buckets() {
                for pos in 0..ELEMENTS_PER_BUCKET {
                    if self.tables[side].bucket(idx).is_present(pos) {
                        // SAFETY: presence bit is set.
                        let elem = unsafe { self.tables[side].bucket_mut(idx).take(pos) };
                        self.ty.on_destroy(elem);
                    }
                }
            }
            self.tables[side].used = 0;
            self.tables[side].free();
        }
    }

    /// Requests that the table's capacity be at least `size` elements.
    /// Returns `true` if a resize happened.
    pub fn expand(&mut self, size: usize) -> bool {
        if size < self.len() {
            return false;
        }
        self.resize_to(size)
    }

    /// Fallible counterpart to [`HashTable::expand`], returning
    /// `Err` instead of panicking on allocation failure.
    pub fn try_expand(&mut self, size: usize) -> Result<bool> {
        if size < self.len() {
            return Ok(false);
        }
        self.try_resize_to(size, false)
    }

    /// Drives expansion eagerly, for callers that changed the resize
    /// policy back to `Allow` after a period of `Avoid`/`Forbid` and want
    /// to catch up immediately rather than waiting for the next insert.
    pub fn expand_if_needed_now(&mut self) {
        self.expand_if_needed();
    }

    /// Drives a shrink eagerly; see [`HashTable::expand_if_needed_now`].
    pub fn shrink_if_needed_now(&mut self) {
        self.shrink_if_needed();
    }

    pub fn is_rehashing_public(&self) -> bool {
        self.is_rehashing()
    }

    /// Pauses incremental rehashing. Reentrant; pair with
    /// [`HashTable::resume_rehashing`].
    pub fn pause_rehashing(&mut self) {
        self.pause_rehash += 1;
    }

    /// Resumes incremental rehashing after a matching
    /// [`HashTable::pause_rehashing`] call.
    pub fn resume_rehashing(&mut self) {
        self.pause_rehash -= 1;
        debug_assert!(
            self.pause_rehash >= 0,
            "{}",
            TableError::UnbalancedPause { pause_rehash: self.pause_rehash, pause_auto_shrink: self.pause_auto_shrink }
        );
    }

    pub fn is_rehashing_paused(&self) -> bool {
        self.pause_rehash > 0
    }

    /// Pauses automatic shrink-on-delete. Useful before a bulk deletion so
    /// the table doesn't shrink repeatedly mid-batch.
    pub fn pause_auto_shrink(&mut self) {
        self.pause_auto_shrink += 1;
    }

    /// Resumes automatic shrinking, running a shrink check immediately if
    /// the pause counter reaches zero.
    pub fn resume_auto_shrink(&mut self) {
        self.pause_auto_shrink -= 1;
        if self.pause_auto_shrink == 0 {
            self.shrink_if_needed();
        }
    }

    /// A fingerprint over the table's externally-observable allocation
    /// state, used by the unsafe iterator to detect disallowed mutation
    /// between calls. Tomas Wang's 64-bit integer hash mix, applied the way
    /// `hashtabFingerprint` does: it mixes in each side's backing-allocation
    /// address (not just its size), so a free-then-realloc at an unchanged
    /// `(exp, used)` — which `rehashing_completed`'s table swap can produce
    /// — still changes the fingerprint.
    pub(crate) fn fingerprint(&self) -> u64 {
        let fields: [u64; 6] = [
            self.tables[0].addr() as u64,
            self.tables[0].exp() as i64 as u64,
            self.tables[0].used as u64,
            self.tables[1].addr() as u64,
            self.tables[1].exp() as i64 as u64,
            self.tables[1].used as u64,
        ];
        let mut hash: u64 = 0;
        for v in fields {
            hash = hash.wrapping_add(v);
            hash = (!hash).wrapping_add(hash << 21);
            hash ^= hash >> 24;
            hash = hash.wrapping_add(hash << 3).wrapping_add(hash << 8);
            hash ^= hash >> 14;
            hash = hash.wrapping_add(hash << 2).wrapping_add(hash << 4);
            hash ^= hash >> 28;
            hash = hash.wrapping_add(hash << 31);
        }
        hash
    }
}

impl<T: Copy, Ty: TableType<T>> Drop for HashTable<T, Ty> {
    fn drop(&mut self) {
        self.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // One machine word total, as every element type must be: two `i32`
    // fields rather than the `i64` pair this used to have, which made
    // `Bucket<Entry>` two words wide and tripped `ASSERT_ONE_CACHE_LINE`.
    #[derive(Clone, Copy, PartialEq, Eq, Debug)]
    struct Entry {
        key: i32,
        value: i32,
    }

    struct IntType;
    impl TableType<Entry> for IntType {
        type Key = i32;
        fn element_key<'e>(&self, elem: &'e Entry) -> &'e i32 {
            &elem.key
        }
    }

    fn table() -> HashTable<Entry, IntType> {
        HashTable::new(IntType)
    }

    #[test]
    fn insert_then_find() {
        let mut t = table();
        assert!(t.insert(Entry { key: 1, value: 10 }));
        assert!(!t.insert(Entry { key: 1, value: 20 }));
        assert_eq!(t.find(&1), Some(Entry { key: 1, value: 10 }));
        assert_eq!(t.len(), 1);
    }

    #[test]
    fn delete_removes_element() {
        let mut t = table();
        t.insert(Entry { key: 5, value: 50 });
        assert!(t.delete(&5));
        assert_eq!(t.find(&5), None);
        assert!(t.is_empty());
    }

    #[test]
    fn replace_overwrites() {
        let mut t = table();
        assert!(t.replace(Entry { key: 1, value: 1 }));
        assert!(!t.replace(Entry { key: 1, value: 2 }));
        assert_eq!(t.find(&1), Some(Entry { key: 1, value: 2 }));
    }

    #[test]
    fn grows_past_thousands_of_entries() {
        let mut t = table();
        for i in 0..10_000i32 {
            assert!(t.insert(Entry { key: i, value: i * 2 }));
        }
        assert_eq!(t.len(), 10_000);
        for i in 0..10_000i32 {
            assert_eq!(t.find(&i), Some(Entry { key: i, value: i * 2 }));
        }
    }

    #[test]
    fn shrinks_back_down_after_mass_deletion() {
        let mut t = table();
        for i in 0..10_000i32 {
            t.insert(Entry { key: i, value: i });
        }
        let cap_full = t.capacity();
        for i in 0..9_900i32 {
            assert!(t.delete(&i));
        }
        assert_eq!(t.len(), 100);
        assert!(t.capacity() < cap_full);
    }

    #[test]
    fn two_phase_insert_matches_find_then_insert() {
        let mut t = table();
        match t.find_position_for_insert(&7) {
            InsertSlot::Reserved(pos) => t.insert_at(pos, Entry { key: 7, value: 70 }),
            InsertSlot::Occupied(_) => panic!("key should not exist yet"),
        }
        assert_eq!(t.find(&7), Some(Entry { key: 7, value: 70 }));
    }

    #[test]
    fn two_phase_pop_matches_delete() {
        let mut t = table();
        t.insert(Entry { key: 3, value: 30 });
        let (pos, elem) = t.two_phase_pop_find(&3).expect("present");
        assert_eq!(elem, Entry { key: 3, value: 30 });
        t.two_phase_pop_delete(pos);
        assert_eq!(t.find(&3), None);
    }
}
