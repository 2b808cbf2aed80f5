//! Random sampling, built entirely on repeated single-step scans.
//!
//! The table keeps no PRNG of its own — a starting cursor and any further
//! randomness are obtained from an injected `&mut impl RngCore` so that
//! callers who care about determinism (tests) or a specific generator
//! (`rand::thread_rng()`, a seeded `SmallRng`, ...) can supply one without
//! this crate depending on a particular default.

use rand::RngCore;

use super::scan::ScanFlags;
use super::HashTable;
use crate::config::TableType;

/// Sample size used by [`HashTable::random_element`].
pub const WEAK_RANDOM_SAMPLE_SIZE: usize = super::layout::ELEMENTS_PER_BUCKET;
/// Sample size used by [`HashTable::fair_random_element`], forty times
/// larger than the weak sample for a more uniform pick at a higher cost.
pub const FAIR_RANDOM_SAMPLE_SIZE: usize = 40 * super::layout::ELEMENTS_PER_BUCKET;

impl<T: Copy, Ty: TableType<T>> HashTable<T, Ty> {
    /// Fills `dst` with up to `dst.len()` elements sampled starting at a
    /// random cursor, via repeated `SINGLE_STEP` scans. Returns the number
    /// of elements written, which is `dst.len()` unless the table holds
    /// fewer elements than that.
    pub fn sample_elements(&mut self, dst: &mut [T], rng: &mut impl RngCore) -> usize {
        let want = dst.len().min(self.len());
        if want == 0 {
            return 0;
        }
        let mut count = 0;
        let mut cursor = rng.next_u64() as usize;
        while count < want {
            cursor = self.scan(cursor, ScanFlags::SINGLE_STEP, |elem| {
                if count < dst.len() {
                    dst[count] = elem;
                    count += 1;
                }
            });
        }
        count
    }

    /// A uniformly chosen element from a small sample
    /// ([`WEAK_RANDOM_SAMPLE_SIZE`] elements), cheap but slightly biased
    /// toward elements that share a probe chain with the sample's starting
    /// bucket. `None` iff the table is empty.
    pub fn random_element(&mut self, rng: &mut impl RngCore) -> Option<T> {
        let mut samples = [None::<T>; WEAK_RANDOM_SAMPLE_SIZE];
        self.sample_into(&mut samples, rng)
    }

    /// Like [`HashTable::random_element`], but draws from a sample forty
    /// times larger ([`FAIR_RANDOM_SAMPLE_SIZE`]), trading cost for a more
    /// uniform distribution across the whole table.
    pub fn fair_random_element(&mut self, rng: &mut impl RngCore) -> Option<T> {
        let mut samples = [None::<T>; FAIR_RANDOM_SAMPLE_SIZE];
        self.sample_into(&mut samples, rng)
    }

    fn sample_into(&mut self, samples: &mut [Option<T>], rng: &mut impl RngCore) -> Option<T> {
        let target = samples.len().min(self.len());
        if target == 0 {
            return None;
        }
        let mut count = 0;
        let mut cursor = rng.next_u64() as usize;
        while count < target {
            cursor = self.scan(cursor, ScanFlags::SINGLE_STEP, |elem| {
                if count < samples.len() {
                    samples[count] = Some(elem);
                    count += 1;
                }
            });
        }
        let idx = (rng.next_u32() as usize) % count;
        samples[idx]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    #[derive(Clone, Copy, PartialEq, Eq, Debug)]
    struct Entry(i64);

    struct IntType;
    impl TableType<Entry> for IntType {
        type Key = i64;
        fn element_key<'e>(&self, elem: &'e Entry) -> &'e i64 {
            &elem.0
        }
    }

    #[test]
    fn random_element_on_empty_table_is_none() {
        let mut t: HashTable<Entry, IntType> = HashTable::new(IntType);
        let mut rng = SmallRng::seed_from_u64(1);
        assert_eq!(t.random_element(&mut rng), None);
    }

    #[test]
    fn random_element_returns_a_member() {
        let mut t = HashTable::new(IntType);
        for i in 0..200i64 {
            t.insert(Entry(i));
        }
        let mut rng = SmallRng::seed_from_u64(42);
        for _ in 0..20 {
            let e = t.random_element(&mut rng).expect("non-empty table");
            assert!((0..200).contains(&e.0));
        }
    }

    #[test]
    fn sample_elements_fills_requested_count() {
        let mut t = HashTable::new(IntType);
        for i in 0..500i64 {
            t.insert(Entry(i));
        }
        let mut dst = [Entry(0); 30];
        let mut rng = SmallRng::seed_from_u64(7);
        let n = t.sample_elements(&mut dst, &mut rng);
        assert_eq!(n, 30);
    }
}
