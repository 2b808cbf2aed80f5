use std::cell::Cell;
use std::collections::HashSet;

use cachetab::config::ResizePolicy;
use cachetab::{HashTable, InsertSlot, ScanFlags, TableType};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

// Backing storage for the string-keyed scenario: each static holds the
// actual `&'static str`, and the table stores only an `&'static &'static
// str` handle pointing at one of them — a single machine word, same as any
// other element, rather than the 16-byte fat pointer `&'static str` itself
// would be.
static STR_A: &str = "a";
static STR_B: &str = "b";
static STR_C: &str = "c";

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
struct StrEntry(&'static &'static str);

struct StrType;
impl TableType<StrEntry> for StrType {
    type Key = &'static str;
    fn element_key<'e>(&self, elem: &'e StrEntry) -> &'e &'static str {
        elem.0
    }
}

#[test]
fn basic_round_trip() {
    let mut t = HashTable::new(StrType);
    t.insert(StrEntry(&STR_A));
    t.insert(StrEntry(&STR_B));
    t.insert(StrEntry(&STR_C));

    assert_eq!(t.find(&"a"), Some(StrEntry(&STR_A)));
    assert_eq!(t.find(&"b"), Some(StrEntry(&STR_B)));
    assert_eq!(t.find(&"c"), Some(StrEntry(&STR_C)));
    assert_eq!(t.len(), 3);

    assert!(t.delete(&"b"));
    assert_eq!(t.find(&"b"), None);
    assert_eq!(t.len(), 2);
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
struct IntEntry {
    key: i64,
}

struct IntType;
impl TableType<IntEntry> for IntType {
    type Key = i64;
    fn element_key<'e>(&self, elem: &'e IntEntry) -> &'e i64 {
        &elem.key
    }
}

#[test]
fn grow_shrink_cycle_keeps_every_prior_key_findable() {
    let mut t = HashTable::new(IntType);
    for batch in 0..10u64 {
        for i in (batch * 1_000)..((batch + 1) * 1_000) {
            t.insert(IntEntry { key: i as i64 });
        }
        assert_eq!(t.len() as u64, (batch + 1) * 1_000);
        for i in 0..((batch + 1) * 1_000) {
            assert_eq!(t.find(&(i as i64)), Some(IntEntry { key: i as i64 }));
        }
    }

    for i in (0..10_000i64).rev() {
        assert!(t.delete(&i));
    }
    assert!(t.is_empty());
}

/// A key type whose `hash` always returns the same value, forcing every
/// insert down the same probe chain.
struct ConstantHashType;
impl TableType<IntEntry> for ConstantHashType {
    type Key = i64;
    fn hash(&self, _key: &i64) -> u64
    where
        i64: std::hash::Hash,
    {
        0
    }
    fn element_key<'e>(&self, elem: &'e IntEntry) -> &'e i64 {
        &elem.key
    }
}

#[test]
fn forced_probing_keeps_every_element_findable() {
    let mut t = HashTable::new(ConstantHashType);
    for i in 0..100i64 {
        t.insert(IntEntry { key: i });
    }
    for i in 0..100i64 {
        assert_eq!(t.find(&i), Some(IntEntry { key: i }));
    }
    assert!(t.longest_probing_chain() >= 100 / 7);
    for i in 0..100i64 {
        assert!(t.delete(&i));
    }
}

#[test]
fn scan_under_mutation_emits_every_stable_element_at_least_once() {
    let mut t = HashTable::new(IntType);
    for i in 0..1_000i64 {
        t.insert(IntEntry { key: i });
    }
    let stable: HashSet<i64> = (0..1_000i64).step_by(2).collect();
    let mutable: HashSet<i64> = (1..1_000i64).step_by(2).collect();

    let mut rng = SmallRng::seed_from_u64(9);
    let mut emitted: Vec<i64> = Vec::new();
    let mut remaining = mutable.clone();
    let mut next_fresh_key = 1_000_000i64;

    let mut cursor = 0usize;
    loop {
        cursor = t.scan(cursor, ScanFlags::empty(), |e| emitted.push(e.key));
        if !remaining.is_empty() && rng.gen_bool(0.5) {
            let victim = *remaining.iter().next().unwrap();
            remaining.remove(&victim);
            t.delete(&victim);
            t.insert(IntEntry { key: next_fresh_key });
            next_fresh_key += 1;
        }
        if cursor == 0 {
            break;
        }
    }

    let mut counts = std::collections::HashMap::new();
    for k in &emitted {
        *counts.entry(*k).or_insert(0u32) += 1;
    }
    for k in &stable {
        assert!(counts.get(k).copied().unwrap_or(0) >= 1, "stable key {k} not emitted");
        assert!(counts[k] <= 2, "stable key {k} emitted more than twice");
    }
}

#[test]
fn policy_avoid_mid_rehash_still_accepts_inserts() {
    let mut t = HashTable::new(IntType);
    for i in 0..2_000i64 {
        t.insert(IntEntry { key: i });
    }
    assert!(t.is_rehashing_public() || t.capacity() > 0);

    cachetab::set_resize_policy(ResizePolicy::Avoid);
    for i in 2_000..3_000i64 {
        assert!(t.insert(IntEntry { key: i }));
    }
    for i in 0..3_000i64 {
        assert_eq!(t.find(&i), Some(IntEntry { key: i }));
    }
    cachetab::set_resize_policy(ResizePolicy::Allow);
}

#[test]
fn two_phase_insert_saves_a_hash_call_per_key() {
    thread_local! {
        static HASH_CALLS: Cell<u32> = Cell::new(0);
    }

    struct CountingType;
    impl TableType<IntEntry> for CountingType {
        type Key = i64;
        fn hash(&self, key: &i64) -> u64
        where
            i64: std::hash::Hash,
        {
            HASH_CALLS.with(|c| c.set(c.get() + 1));
            cachetab::hash::keyed_hash(key)
        }
        fn element_key<'e>(&self, elem: &'e IntEntry) -> &'e i64 {
            &elem.key
        }
    }

    let mut t = HashTable::new(CountingType);
    let mut rng = SmallRng::seed_from_u64(3);
    let keys: Vec<i64> = (0..50).map(|_| rng.gen_range(0, 1_000_000)).collect();

    for &k in &keys {
        HASH_CALLS.with(|c| c.set(0));
        match t.find_position_for_insert(&k) {
            InsertSlot::Reserved(pos) => {
                t.insert_at(pos, IntEntry { key: k });
            }
            InsertSlot::Occupied(_) => continue,
        }
        // One hash call for the whole find+reserve step, none extra for the write.
        assert_eq!(HASH_CALLS.with(|c| c.get()), 1);
    }

    for &k in &keys {
        assert_eq!(t.find(&k), Some(IntEntry { key: k }));
    }
}

#[test]
fn empty_table_boundary_behaviors_do_not_fault() {
    let mut t: HashTable<IntEntry, IntType> = HashTable::new(IntType);
    assert_eq!(t.find(&0), None);
    assert_eq!(t.pop(&0), None);
    assert!(!t.delete(&0));
    assert_eq!(t.scan(0, ScanFlags::empty(), |_| {}), 0);
    let mut rng = SmallRng::seed_from_u64(1);
    assert_eq!(t.random_element(&mut rng), None);
}

#[test]
fn single_element_scan_emits_it_and_completes() {
    let mut t = HashTable::new(IntType);
    t.insert(IntEntry { key: 42 });
    let mut emitted = Vec::new();
    let cursor = t.scan(0, ScanFlags::empty(), |e| emitted.push(e.key));
    assert_eq!(cursor, 0);
    assert_eq!(emitted, vec![42]);
}
