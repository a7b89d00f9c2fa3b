//! Basic benchmarks for the `chained_map` crate.
#![allow(
    missing_docs,
    reason = "No need for API documentation in benchmark code"
)]

use std::hint::black_box;
use std::iter;
use std::time::Instant;

use alloc_tracker::Allocator;
use chained_map::{ChainedMap, DefaultChainedMap};
use criterion::{Criterion, criterion_group, criterion_main};
use new_zealand::nz;

criterion_group!(benches, entrypoint);
criterion_main!(benches);

#[global_allocator]
static ALLOCATOR: Allocator<std::alloc::System> = Allocator::system();

type TestKey = u64;
type TestValue = u64;
const TEST_VALUE: TestValue = 1024;

fn new_map() -> DefaultChainedMap<TestKey, TestValue> {
    ChainedMap::with_default_hasher(nz!(1024)).unwrap()
}

fn entrypoint(c: &mut Criterion) {
    let allocs = alloc_tracker::Session::new();

    let mut group = c.benchmark_group("chained_basic");

    let allocs_op = allocs.operation("build_empty");
    group.bench_function("build_empty", |b| {
        b.iter_custom(|iters| {
            let _span = allocs_op.measure_thread().iterations(iters);

            let start = Instant::now();

            for _ in 0..iters {
                drop(black_box(new_map()));
            }

            start.elapsed()
        });
    });

    let allocs_op = allocs.operation("set_one");
    group.bench_function("set_one", |b| {
        b.iter_custom(|iters| {
            let mut maps = iter::repeat_with(new_map)
                .take(usize::try_from(iters).unwrap())
                .collect::<Vec<_>>();

            let _span = allocs_op.measure_thread().iterations(iters);

            let start = Instant::now();

            for map in &mut maps {
                _ = black_box(map.set(black_box(1), black_box(TEST_VALUE)).unwrap());
            }

            start.elapsed()
        });
    });

    let allocs_op = allocs.operation("get_one");
    group.bench_function("get_one", |b| {
        b.iter_custom(|iters| {
            let mut map = new_map();
            map.set(1, TEST_VALUE).unwrap();

            let _span = allocs_op.measure_thread().iterations(iters);

            let start = Instant::now();

            for _ in 0..iters {
                _ = black_box(map.get(black_box(&1)));
            }

            start.elapsed()
        });
    });

    let allocs_op = allocs.operation("delete_one");
    group.bench_function("delete_one", |b| {
        b.iter_custom(|iters| {
            let mut maps = iter::repeat_with(|| {
                let mut map = new_map();
                map.set(1, TEST_VALUE).unwrap();
                map
            })
            .take(usize::try_from(iters).unwrap())
            .collect::<Vec<_>>();

            let _span = allocs_op.measure_thread().iterations(iters);

            let start = Instant::now();

            for map in &mut maps {
                _ = black_box(map.delete(black_box(&1)));
            }

            start.elapsed()
        });
    });

    group.finish();

    let mut group = c.benchmark_group("chained_slow");

    let allocs_op = allocs.operation("set_10k");
    group.bench_function("set_10k", |b| {
        b.iter_custom(|iters| {
            let mut maps = iter::repeat_with(new_map)
                .take(usize::try_from(iters).unwrap())
                .collect::<Vec<_>>();

            let _span = allocs_op.measure_thread().iterations(iters);

            let start = Instant::now();

            for map in &mut maps {
                for key in 0..10_000 {
                    _ = black_box(map.set(black_box(key), TEST_VALUE).unwrap());
                }
            }

            start.elapsed()
        });
    });

    let allocs_op = allocs.operation("get_10k_long_chains");
    group.bench_function("get_10k_long_chains", |b| {
        // 10 000 keys in 1024 buckets means chains of about ten pairs each.
        b.iter_custom(|iters| {
            let mut map = new_map();

            for key in 0..10_000 {
                map.set(key, TEST_VALUE).unwrap();
            }

            let _span = allocs_op.measure_thread().iterations(iters);

            let start = Instant::now();

            for _ in 0..iters {
                for key in 0..10_000 {
                    _ = black_box(map.get(black_box(&key)));
                }
            }

            start.elapsed()
        });
    });

    group.finish();

    allocs.print_to_stdout();
}
