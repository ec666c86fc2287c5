//! B-tree benchmarks for batchtree.
//!
//! Measures the three operations that touch the index file: insertion with
//! splits, point lookups and range scans along the leaf chain.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use tempfile::{tempdir, TempDir};

use batchtree::BTree;

fn build_tree(count: i32, node_capacity: usize) -> (TempDir, BTree) {
    let dir = tempdir().unwrap();
    let mut tree = BTree::open(dir.path().join("bench.idx"), node_capacity).unwrap();
    for key in 0..count {
        tree.put(key, format!("value{:08}", key).as_bytes()).unwrap();
    }
    (dir, tree)
}

fn bench_put(c: &mut Criterion) {
    let mut group = c.benchmark_group("btree_put");

    for count in [100, 1000] {
        group.throughput(Throughput::Elements(count as u64));
        for capacity in [5usize, 64] {
            group.bench_with_input(
                BenchmarkId::new(format!("sequential_cap{}", capacity), count),
                &count,
                |b, &count| {
                    b.iter_with_setup(
                        || tempdir().unwrap(),
                        |dir| {
                            let mut tree =
                                BTree::open(dir.path().join("bench.idx"), capacity).unwrap();
                            for key in 0..count {
                                tree.put(key, b"value").unwrap();
                            }
                            dir
                        },
                    );
                },
            );
        }

        group.bench_with_input(BenchmarkId::new("descending", count), &count, |b, &count| {
            b.iter_with_setup(
                || tempdir().unwrap(),
                |dir| {
                    let mut tree = BTree::open(dir.path().join("bench.idx"), 5).unwrap();
                    for key in (0..count).rev() {
                        tree.put(key, b"value").unwrap();
                    }
                    dir
                },
            );
        });
    }

    group.finish();
}

fn bench_get(c: &mut Criterion) {
    let mut group = c.benchmark_group("btree_get");

    for count in [100, 1000] {
        let (_dir, tree) = build_tree(count, 5);
        group.bench_with_input(BenchmarkId::new("existing_key", count), &count, |b, &count| {
            let mut key = 0;
            b.iter(|| {
                key = (key + 7) % count;
                black_box(tree.get(key).unwrap())
            });
        });
        group.bench_with_input(BenchmarkId::new("missing_key", count), &count, |b, &count| {
            b.iter(|| black_box(tree.get(count + 1).unwrap()));
        });
    }

    group.finish();
}

fn bench_range(c: &mut Criterion) {
    let mut group = c.benchmark_group("btree_range");
    let (_dir, tree) = build_tree(1000, 5);

    for width in [10, 100, 1000] {
        group.throughput(Throughput::Elements(width as u64));
        group.bench_with_input(BenchmarkId::new("scan", width), &width, |b, &width| {
            b.iter(|| {
                let count = tree
                    .get_in_range(0, width - 1)
                    .unwrap()
                    .map(|item| item.unwrap())
                    .count();
                black_box(count)
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_put, bench_get, bench_range);
criterion_main!(benches);
