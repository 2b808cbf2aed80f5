//! Bucket-chain probing: the shared traversal both lookup and insertion
//! walk, diverging only in when they stop.
//!
//! Lookup stops at the first bucket that was never probed past
//! (`!everfull`), since a key can only live further down the chain if an
//! earlier bucket in the chain once overflowed. Insertion ignores
//! `everfull` entirely and walks until it finds a bucket with a free slot,
//! marking every full bucket it passes as `everfull` on the way — that
//! marking is what makes the next lookup's short-circuit correct.

use super::bucket::high_bits;
use super::cursor::next_cursor;
use super::layout::ELEMENTS_PER_BUCKET;
use super::side::Side;
use crate::config::TableType;

/// Searches one side for the slot holding `key`, returning its
/// `(bucket_index, pos_in_bucket)` if found.
pub(crate) fn find<T, Ty: TableType<T> + ?Sized>(side: &Side<T>, ty: &Ty, mask: usize, hash: u64, key: &Ty::Key) -> Option<(usize, usize)> {
    if !side.is_allocated() {
        return None;
    }
    let top = high_bits(hash);
    let mut cursor = hash as usize & mask;
    loop {
        let bucket = side.bucket(cursor);
        for pos in 0..ELEMENTS_PER_BUCKET {
            if bucket.is_present(pos) && bucket.hash_byte(pos) == top {
                // SAFETY: presence bit `pos` is set, so the slot holds a
                // live, initialized `T`.
                let elem = unsafe { bucket.as_ref(pos) };
                if ty.key_compare(ty.element_key(elem), key) {
                    return Some((cursor, pos));
                }
            }
        }
        if !bucket.everfull() {
            return None;
        }
        cursor = next_cursor(cursor, mask);
    }
}

/// Finds the first free slot along `hash`'s probe chain. Does not look at
/// `everfull` at all: a full bucket is skipped purely because it has no
/// free presence bit, and it is the *destination* bucket of whichever
/// insert fills it completely that marks its own `everfull` bit (see
/// `HashTable::insert_raw`) — not this traversal. Always terminates: the
/// caller is required to have already verified the side is not full (see
/// `resize::should_expand`'s check before every insert), so some bucket in
/// the chain has a free slot.
pub(crate) fn find_bucket_for_insert<T>(side: &mut Side<T>, mask: usize, hash: u64) -> (usize, usize) {
    let mut cursor = hash as usize & mask;
    loop {
        let bucket = side.bucket_mut(cursor);
        if let Some(pos) = (0..ELEMENTS_PER_BUCKET).find(|&p| !bucket.is_present(p)) {
            return (cursor, pos);
        }
        cursor = next_cursor(cursor, mask);
    }
}
