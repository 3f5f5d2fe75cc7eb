//! # Pool Allocator Benchmark
//!
//! Pooled alloc/release against one boxed allocation per object.
//!
//! Run with: `cargo bench --package pool_alloc`

// Benchmarks don't need docs
#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use pool_alloc::{PoolManager, SizeClassPool, DEFAULT_MAX_CHUNK_BYTES};

const BATCH: usize = 10_000;

/// Benchmark: alloc then release a batch from one size class.
fn bench_size_class_pool(c: &mut Criterion) {
    let mut pool = SizeClassPool::new(32, 512);
    let mut blocks = Vec::with_capacity(BATCH);

    c.bench_function("size_class_pool_batch", |b| {
        b.iter(|| {
            blocks.extend((0..BATCH).map(|_| pool.alloc()));
            for block in blocks.drain(..) {
                pool.release(black_box(block));
            }
        });
    });
}

/// Benchmark: manager dispatch across several request sizes.
fn bench_manager(c: &mut Criterion) {
    let mut group = c.benchmark_group("manager_batch");
    let mut pools = PoolManager::with_step(256, 16, DEFAULT_MAX_CHUNK_BYTES).unwrap();
    let mut handles = Vec::with_capacity(BATCH);

    for size in [8, 24, 100, 256] {
        group.bench_with_input(BenchmarkId::new("pooled", size), &size, |b, &size| {
            b.iter(|| {
                handles.extend((0..BATCH).map(|_| pools.alloc(black_box(size))));
                for handle in handles.drain(..) {
                    pools.release(handle);
                }
            });
        });

        group.bench_with_input(BenchmarkId::new("boxed", size), &size, |b, &size| {
            b.iter(|| {
                let boxes: Vec<Box<[u8]>> = (0..BATCH)
                    .map(|_| vec![0u8; black_box(size)].into_boxed_slice())
                    .collect();
                black_box(boxes)
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_size_class_pool, bench_manager);
criterion_main!(benches);
