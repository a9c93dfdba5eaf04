//! Benchmarks for the tree index against std's BTreeMap.

use std::collections::BTreeMap;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use voltaic_store::TreeIndex;

fn bench_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("index_insert");

    for size in [64u32, 512, 4000] {
        group.bench_with_input(BenchmarkId::new("tree_index", size), &size, |b, &size| {
            b.iter(|| {
                let mut index = TreeIndex::new(8, size as usize).unwrap();
                for key in 0..size {
                    index.put(black_box(key), key).unwrap();
                }
                index
            });
        });
        group.bench_with_input(BenchmarkId::new("btree_map", size), &size, |b, &size| {
            b.iter(|| {
                let mut map = BTreeMap::new();
                for key in 0..size {
                    map.insert(black_box(key), key);
                }
                map
            });
        });
    }

    group.finish();
}

fn bench_lookup(c: &mut Criterion) {
    let mut group = c.benchmark_group("index_lookup");

    for size in [64u32, 512, 4000] {
        let mut index = TreeIndex::new(8, size as usize).unwrap();
        for key in 0..size {
            index.put(key, key).unwrap();
        }
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            b.iter(|| {
                let mut sum = 0u64;
                for key in 0..size {
                    sum += u64::from(index.get(black_box(key)).unwrap().unwrap());
                }
                sum
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_insert, bench_lookup);
criterion_main!(benches);
