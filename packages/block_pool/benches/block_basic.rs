//! Basic benchmarks for the `block_pool` crate.
#![allow(
    missing_docs,
    reason = "No need for API documentation in benchmark code"
)]

use std::hint::black_box;
use std::iter;
use std::time::Instant;

use alloc_tracker::Allocator;
use block_pool::BlockPool;
use criterion::{Criterion, criterion_group, criterion_main};
use new_zealand::nz;

criterion_group!(benches, entrypoint);
criterion_main!(benches);

#[global_allocator]
static ALLOCATOR: Allocator<std::alloc::System> = Allocator::system();

type TestItem = [u64; 4];

fn new_pool() -> BlockPool {
    BlockPool::builder()
        .object_layout_of::<TestItem>()
        .build()
        .unwrap()
}

fn entrypoint(c: &mut Criterion) {
    let allocs = alloc_tracker::Session::new();

    let mut group = c.benchmark_group("block_basic");

    let allocs_op = allocs.operation("build_empty");
    group.bench_function("build_empty", |b| {
        b.iter_custom(|iters| {
            let _span = allocs_op.measure_thread().iterations(iters);

            let start = Instant::now();

            for _ in 0..iters {
                drop(black_box(new_pool()));
            }

            start.elapsed()
        });
    });

    let allocs_op = allocs.operation("acquire_first");
    group.bench_function("acquire_first", |b| {
        b.iter_custom(|iters| {
            let mut pools = iter::repeat_with(new_pool)
                .take(usize::try_from(iters).unwrap())
                .collect::<Vec<_>>();

            let _span = allocs_op.measure_thread().iterations(iters);

            let start = Instant::now();

            for pool in &mut pools {
                _ = black_box(pool.acquire().unwrap());
            }

            start.elapsed()
        });
    });

    let allocs_op = allocs.operation("acquire_release_warm");
    group.bench_function("acquire_release_warm", |b| {
        b.iter_custom(|iters| {
            let mut pool = new_pool();
            pool.reserve(1).unwrap();

            let _span = allocs_op.measure_thread().iterations(iters);

            let start = Instant::now();

            for _ in 0..iters {
                let slot = black_box(pool.acquire().unwrap());
                pool.release(slot);
            }

            start.elapsed()
        });
    });

    group.finish();

    let mut group = c.benchmark_group("block_slow");

    let allocs_op = allocs.operation("acquire_10k");
    group.bench_function("acquire_10k", |b| {
        b.iter_custom(|iters| {
            let mut pools = iter::repeat_with(new_pool)
                .take(usize::try_from(iters).unwrap())
                .collect::<Vec<_>>();

            let _span = allocs_op.measure_thread().iterations(iters);

            let start = Instant::now();

            for pool in &mut pools {
                for _ in 0..10_000 {
                    _ = black_box(pool.acquire().unwrap());
                }
            }

            start.elapsed()
        });
    });

    let allocs_op = allocs.operation("release_10k");
    group.bench_function("release_10k", |b| {
        b.iter_custom(|iters| {
            let mut pools = iter::repeat_with(|| {
                let mut pool = new_pool();
                let slots = iter::repeat_with(|| pool.acquire().unwrap())
                    .take(10_000)
                    .collect::<Vec<_>>();
                (pool, slots)
            })
            .take(usize::try_from(iters).unwrap())
            .collect::<Vec<_>>();

            let _span = allocs_op.measure_thread().iterations(iters);

            let start = Instant::now();

            for (pool, slots) in &mut pools {
                for slot in slots.drain(..) {
                    pool.release(slot);
                }
            }

            start.elapsed()
        });
    });

    group.finish();

    allocs.print_to_stdout();
}
