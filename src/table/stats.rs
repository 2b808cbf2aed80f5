//! Diagnostic/debug surface: chain-length distribution, a bucket-occupancy
//! dump, and a compact one-character-per-bucket histogram.
//!
//! This is the table's only introspection surface — there is no separate
//! metrics or logging layer over it, so `dump`/`histogram` print straight
//! to stdout the way `hashtabDump`/`hashtabHistogram` do, gated behind
//! `cfg(any(test, feature = "debug"))` since they're diagnostic-only.

use std::fmt;

use super::cursor::next_cursor;
use super::layout::ELEMENTS_PER_BUCKET;
use super::HashTable;
use crate::config::TableType;

const STATS_VECTOR_LEN: usize = 50;

/// Per-table statistics, as returned by `hashtabGetStatsHt`.
#[derive(Debug, Clone)]
pub struct Stats {
    pub table_index: usize,
    pub buckets: u64,
    pub size: u64,
    pub used: u64,
    pub max_chain_len: u64,
    pub total_chain_len: u64,
    pub chain_len_histogram: [u64; STATS_VECTOR_LEN],
    /// Whether the per-bucket fields above were actually computed (`stats(true)`)
    /// or left zeroed (`stats(false)`) — `Display` uses this to decide
    /// whether to print the chain-length section at all.
    pub full: bool,
}

/// Combined stats for a table, one [`Stats`] per allocated side (both, while
/// rehashing). Mirrors `hashtabGetStats`'s buffer output, but as structured
/// data plus a `Display` impl instead of a caller-managed `char*` buffer.
#[derive(Debug, Clone)]
pub struct TableStats {
    pub tables: Vec<Stats>,
}

impl<T: Copy, Ty: TableType<T>> HashTable<T, Ty> {
    /// Computes statistics for every allocated side. `full` also walks every
    /// bucket to build the chain-length histogram; without it, only the
    /// cheap `buckets`/`size`/`used` fields are populated.
    pub fn stats(&self, full: bool) -> TableStats {
        let mut tables = Vec::with_capacity(2);
        for side in 0..2 {
            if !self.tables[side].is_allocated() {
                continue;
            }
            tables.push(self.stats_for_side(side, full));
        }
        TableStats { tables }
    }

    fn stats_for_side(&self, side: usize, full: bool) -> Stats {
        let buckets = self.tables[side].buckets() as u64;
        let mut stats = Stats {
            table_index: side,
            buckets,
            size: buckets * ELEMENTS_PER_BUCKET as u64,
            used: self.tables[side].used as u64,
            max_chain_len: 0,
            total_chain_len: 0,
            chain_len_histogram: [0; STATS_VECTOR_LEN],
            full,
        };
        if !full {
            return stats;
        }
        let mut chain_len: u64 = 0;
        for idx in 0..self.tables[side].buckets() {
            let b = self.tables[side].bucket(idx);
            if b.everfull() {
                stats.total_chain_len += 1;
                chain_len += 1;
            } else {
                let slot = (chain_len as usize).min(STATS_VECTOR_LEN - 1);
                stats.chain_len_histogram[slot] += 1;
                stats.max_chain_len = stats.max_chain_len.max(chain_len);
                chain_len = 0;
            }
        }
        stats
    }

    /// The length of the longest run of consecutive `everfull` buckets
    /// across either side, i.e. the worst-case probe chain a lookup might
    /// have to walk. Mirrors `hashtabLongestProbingChain`.
    pub fn longest_probing_chain(&self) -> usize {
        let mut maxlen = 0usize;
        for side in 0..2 {
            if !self.tables[side].is_allocated() {
                continue;
            }
            let mask = self.tables[side].mask();
            let mut cursor = 0usize;
            let mut chain_len = 0usize;
            loop {
                if self.tables[side].bucket(cursor).everfull() {
                    chain_len += 1;
                    maxlen = maxlen.max(chain_len);
                } else {
                    chain_len = 0;
                }
                cursor = next_cursor(cursor, mask);
                if cursor == 0 {
                    break;
                }
            }
        }
        maxlen
    }
}

#[cfg(any(test, feature = "debug"))]
impl<T: Copy, Ty: TableType<T>> HashTable<T, Ty>
where
    Ty::Key: fmt::Display,
{
    /// Prints every bucket's presence/everfull/key state to stdout.
    /// Diagnostic-only; matches `hashtabDump`.
    pub fn dump(&self) {
        for side in 0..2 {
            if !self.tables[side].is_allocated() {
                println!("Table {side}: unallocated");
                continue;
            }
            println!("Table {side}, used {}, exp {}", self.tables[side].used, self.tables[side].exp());
            for idx in 0..self.tables[side].buckets() {
                let b = self.tables[side].bucket(idx);
                println!("Bucket {side}:{idx} everfull:{}", b.everfull());
                for pos in 0..ELEMENTS_PER_BUCKET {
                    if b.is_present(pos) {
                        // SAFETY: presence bit `pos` is set.
                        let elem = unsafe { b.as_ref(pos) };
                        println!("  {pos} h2 {:02x}, key {}", b.hash_byte(pos), self.table_type().element_key(elem));
                    } else {
                        println!("  {pos} (empty)");
                    }
                }
            }
        }
    }
}

#[cfg(any(test, feature = "debug"))]
impl<T: Copy, Ty: TableType<T>> HashTable<T, Ty> {
    /// One compact character per bucket: `0`-`9` for its live element
    /// count (or `X` for an empty-but-everfull bucket). Diagnostic-only;
    /// matches `hashtabHistogram`.
    pub fn histogram(&self) -> String {
        let mut out = String::new();
        for side in 0..2 {
            if !self.tables[side].is_allocated() {
                continue;
            }
            for idx in 0..self.tables[side].buckets() {
                let b = self.tables[side].bucket(idx);
                let count = b.presence().count_ones();
                let c = if count == 0 && b.everfull() { 'X' } else { char::from_digit(count, 10).unwrap_or('?') };
                out.push(c);
            }
            if side == 0 {
                out.push(' ');
            }
        }
        out
    }
}

impl fmt::Display for TableStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for stats in &self.tables {
            let label = if stats.table_index == 0 { "main hash table" } else { "rehashing target" };
            if stats.used == 0 {
                writeln!(f, "Hash table {} stats ({label}):", stats.table_index)?;
                writeln!(f, "No stats available for empty hash tables")?;
                continue;
            }
            writeln!(f, "Hash table {} stats ({label}):", stats.table_index)?;
            writeln!(f, " table size: {}", stats.size)?;
            writeln!(f, " number of elements: {}", stats.used)?;
            if stats.full {
                writeln!(f, " buckets: {}", stats.buckets)?;
                writeln!(f, " max chain length: {}", stats.max_chain_len)?;
                writeln!(f, " avg chain length (counted): {:.2}", stats.total_chain_len as f64 / stats.buckets as f64)?;
                writeln!(f, " avg chain length (computed): {:.2}", stats.used as f64 / stats.buckets as f64)?;
                writeln!(f, " Chain length distribution:")?;
                for (i, &count) in stats.chain_len_histogram[..STATS_VECTOR_LEN - 1].iter().enumerate() {
                    if count == 0 {
                        continue;
                    }
                    writeln!(f, "   {i}: {count} ({:.2}%)", (count as f64 / stats.size as f64) * 100.0)?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

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
    fn stats_on_empty_table_reports_zero_used() {
        let t: HashTable<Entry, IntType> = HashTable::new(IntType);
        let stats = t.stats(true);
        assert!(stats.tables.iter().all(|s| s.used == 0));
    }

    #[test]
    fn full_stats_report_used_and_buckets() {
        let mut t = HashTable::new(IntType);
        for i in 0..1_000i64 {
            t.insert(Entry(i));
        }
        let stats = t.stats(true);
        let total_used: u64 = stats.tables.iter().map(|s| s.used).sum();
        assert_eq!(total_used, 1_000);
        assert!(stats.tables.iter().any(|s| s.buckets > 0));
    }

    #[test]
    fn longest_probing_chain_is_bounded_by_bucket_count() {
        let mut t = HashTable::new(IntType);
        for i in 0..5_000i64 {
            t.insert(Entry(i));
        }
        let chain = t.longest_probing_chain();
        let buckets: u64 = t.stats(false).tables.iter().map(|s| s.buckets).sum();
        assert!((chain as u64) <= buckets);
    }
}
