//! Basic benchmarks for the `hft_pools` crate.
#![allow(
    missing_docs,
    reason = "No need for API documentation in benchmark code"
)]

use std::hint::black_box;

use criterion::{Criterion, criterion_group, criterion_main};
use hft_pools::{LockFreeObjectPool, ObjectPool};

criterion_group!(benches, entrypoint);
criterion_main!(benches);

type TestItem = [u64; 4];
const TEST_VALUE: TestItem = [1, 2, 3, 4];

fn entrypoint(c: &mut Criterion) {
    let mut group = c.benchmark_group("pool_basic");

    group.bench_function("object_pool_construct_destroy", |b| {
        let mut pool = ObjectPool::<TestItem>::new().unwrap();

        b.iter(|| {
            let item = pool.construct(black_box(TEST_VALUE)).unwrap();
            // SAFETY: From this pool, holds a live value.
            unsafe { pool.destroy(black_box(item)) };
        });
    });

    group.bench_function("lock_free_allocate_deallocate", |b| {
        let pool = LockFreeObjectPool::<TestItem>::with_capacity(1).unwrap();

        b.iter(|| {
            let mut slot = pool.allocate().unwrap();
            slot.write(black_box(TEST_VALUE));
            pool.deallocate(black_box(slot));
        });
    });

    group.bench_function("box_new_drop", |b| {
        b.iter(|| drop(black_box(Box::new(black_box(TEST_VALUE)))));
    });

    group.finish();
}
