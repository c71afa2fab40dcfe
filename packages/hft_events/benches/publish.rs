//! Benchmarks for publishing on the `hft_events` bus.
#![allow(
    missing_docs,
    reason = "No need for API documentation in benchmark code"
)]

use std::hint::black_box;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use criterion::{Criterion, criterion_group, criterion_main};
use hft_events::{Event, EventBus};

struct Tick {
    price: u64,
}

impl Event for Tick {}

struct Unobserved;

impl Event for Unobserved {}

criterion_group!(benches, entrypoint);
criterion_main!(benches);

fn entrypoint(c: &mut Criterion) {
    let mut group = c.benchmark_group("publish");

    let total = Arc::new(AtomicU64::new(0));

    let sync_bus = EventBus::new();
    subscribe_summing(&sync_bus, &total, 4);

    group.bench_function("sync_4_handlers", |b| {
        b.iter(|| sync_bus.publish(black_box(Tick { price: 100 })));
    });

    let async_bus = EventBus::new();
    subscribe_summing(&async_bus, &total, 4);
    async_bus.set_async_mode(true);

    group.bench_function("async_4_handlers_flush_every_100", |b| {
        b.iter(|| {
            for _ in 0..100 {
                async_bus.publish(black_box(Tick { price: 100 }));
            }

            async_bus.flush();
        });
    });

    group.bench_function("no_handlers", |b| {
        b.iter(|| sync_bus.publish(black_box(Unobserved)));
    });

    group.finish();

    black_box(total.load(Ordering::Relaxed));
}

fn subscribe_summing(bus: &EventBus, total: &Arc<AtomicU64>, handlers: usize) {
    for _ in 0..handlers {
        let total = Arc::clone(total);
        bus.subscribe::<Tick, _>(move |tick| {
            total.fetch_add(tick.price, Ordering::Relaxed);
        });
    }
}
