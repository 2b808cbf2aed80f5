use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use itertools::Itertools;
use once_cell::sync::Lazy;
use rand::Rng;

use cachetab::{HashTable, TableType};

const CAPACITY: [usize; 3] = [512, 4096, 65536];
const FILL_FACTORS: [f32; 3] = [0.3, 0.5, 0.8];
const TOTAL_KEYS: u64 = 10_000;
const TOTAL_OPERATIONS: u64 = 1_000;

static RANDOM_INDEXES: Lazy<Vec<u64>> = Lazy::new(|| {
    let mut rng = rand::thread_rng();
    (0..TOTAL_OPERATIONS).map(|_| rng.gen_range(0, TOTAL_KEYS)).collect()
});

#[derive(Clone, Copy)]
struct Entry {
    key: u64,
    value: u64,
}

struct U64Type;
impl TableType<Entry> for U64Type {
    type Key = u64;
    fn element_key<'e>(&self, elem: &'e Entry) -> &'e u64 {
        &elem.key
    }
}

fn filled_table(capacity: usize, fill_factor: f32) -> HashTable<Entry, U64Type> {
    let mut t = HashTable::new(U64Type);
    t.expand(capacity);
    let n = (capacity as f32 * fill_factor) as u64;
    for i in 0..n {
        t.insert(Entry { key: i, value: i });
    }
    t
}

fn hash(c: &mut Criterion) {
    let mut group = c.benchmark_group("hashtable");
    group.throughput(Throughput::Elements(TOTAL_OPERATIONS));

    for (capacity, fill_factor) in CAPACITY.iter().cartesian_product(FILL_FACTORS.iter()) {
        let (capacity, fill_factor) = (*capacity, *fill_factor);
        let description = format!("capacity: {capacity}, fill: {fill_factor}");

        group.bench_with_input(BenchmarkId::new("find (hit)", description.clone()), &(capacity, fill_factor), |b, &(capacity, fill_factor)| {
            let mut t = filled_table(capacity, fill_factor);
            let n = (capacity as f32 * fill_factor) as u64;
            b.iter(|| {
                for &i in RANDOM_INDEXES.iter() {
                    let _ = t.find(&(i % n.max(1)));
                }
            });
        });

        group.bench_with_input(BenchmarkId::new("insert", description.clone()), &(capacity, fill_factor), |b, &(capacity, fill_factor)| {
            b.iter_batched(
                || filled_table(capacity, fill_factor),
                |mut t| {
                    for &i in RANDOM_INDEXES.iter() {
                        t.replace(Entry { key: i + TOTAL_KEYS, value: i });
                    }
                },
                criterion::BatchSize::LargeInput,
            );
        });

        group.bench_with_input(BenchmarkId::new("delete", description.clone()), &(capacity, fill_factor), |b, &(capacity, fill_factor)| {
            b.iter_batched(
                || filled_table(capacity, fill_factor),
                |mut t| {
                    let n = (capacity as f32 * fill_factor) as u64;
                    for &i in RANDOM_INDEXES.iter() {
                        t.delete(&(i % n.max(1)));
                    }
                },
                criterion::BatchSize::LargeInput,
            );
        });
    }

    group.bench_function("grow past 100k entries", |b| {
        b.iter_batched(
            || HashTable::new(U64Type),
            |mut t: HashTable<Entry, U64Type>| {
                for i in 0..100_000u64 {
                    t.insert(Entry { key: i, value: i });
                }
            },
            criterion::BatchSize::LargeInput,
        );
    });

    group.finish()
}

criterion_group!(benches, hash);
criterion_main!(benches);
