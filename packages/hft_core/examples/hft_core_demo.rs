//! Walks through every component, wired together from a single composition root.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use hft_core::config::Config;
use hft_core::events::{Event, EventBus};
use hft_core::log::{LogLevel, Logger, LoggerConfig};
use hft_core::pools::ObjectPool;
use hft_core::tasks::{PriorityTaskScheduler, TaskScheduler};
use hft_core::time::{ScopedTimer, monotonic_nanos};
use tracing::{info, warn};

#[derive(Debug)]
struct TradeEvent {
    symbol: String,
    price: f64,
    quantity: u32,
}

impl Event for TradeEvent {}

impl From<(&str, f64, u32)> for TradeEvent {
    fn from((symbol, price, quantity): (&str, f64, u32)) -> Self {
        Self {
            symbol: symbol.to_string(),
            price,
            quantity,
        }
    }
}

#[derive(Debug)]
struct Order {
    symbol: String,
    price: f64,
    quantity: u32,
}

fn main() {
    let logger = Logger::new(&LoggerConfig::new().min_level(LogLevel::Info))
        .expect("console logger creation failure is not supported in the demo");
    logger
        .install_global()
        .expect("the demo installs the only global logger");

    println!("1. Configuration");
    let config = Config::new();
    config.set("test.threads", 4_i64);
    config.set("test.latency_limit", 100.0);
    config.set("test.enabled", true);

    let threads = config.get("test.threads", 1_i64);
    println!("  threads: {threads}");
    println!("  latency limit: {}us", config.get("test.latency_limit", 0.0));
    println!("  enabled: {}", config.get("test.enabled", false));

    println!("2. Logger");
    info!("core components initialized");
    warn!("this is a warning message");

    println!("3. Event bus");
    let bus = EventBus::new();
    let trade_count = Arc::new(AtomicUsize::new(0));

    bus.subscribe::<TradeEvent, _>({
        let trade_count = Arc::clone(&trade_count);
        move |event| {
            trade_count.fetch_add(1, Ordering::Relaxed);
            println!(
                "  trade: {} @ {} x {}",
                event.symbol, event.price, event.quantity
            );
        }
    });

    bus.emit::<TradeEvent, _>(("AAPL", 150.25, 1000));
    bus.emit::<TradeEvent, _>(("GOOGL", 2800.50, 500));

    bus.set_async_mode(true);
    bus.emit::<TradeEvent, _>(("MSFT", 410.10, 200));
    bus.flush();

    println!("4. Object pool");
    let mut order_pool = ObjectPool::<Order>::new().expect("the demo pool fits in memory");
    let mut orders = Vec::new();

    for i in 0..5_u32 {
        let order = order_pool
            .construct(Order {
                symbol: format!("SYMBOL{i}"),
                price: 100.0 + f64::from(i),
                quantity: 100 * (i + 1),
            })
            .expect("the demo pool fits in memory");

        // SAFETY: Just constructed and not yet destroyed.
        let order_ref = unsafe { order.as_ref() };
        println!(
            "  order: {} @ {} x {}",
            order_ref.symbol, order_ref.price, order_ref.quantity
        );

        orders.push(order);
    }

    for order in orders {
        // SAFETY: Each order came from this pool and is destroyed exactly once.
        unsafe { order_pool.destroy(order) };
    }

    println!("5. Schedulers");
    let scheduler = TaskScheduler::builder()
        .worker_count(2.try_into().expect("2 is not zero"))
        .build();

    let sum = scheduler
        .submit(|| {
            thread::sleep(Duration::from_millis(10));
            10 + 20
        })
        .expect("the scheduler is running");

    let message = scheduler
        .submit(|| format!("Processed: {}", "Market Data"))
        .expect("the scheduler is running");

    println!("  task 1: {}", sum.join().expect("the task does not panic"));
    println!("  task 2: {}", message.join().expect("the task does not panic"));

    let priority = PriorityTaskScheduler::new();
    let urgent = priority
        .submit(monotonic_nanos)
        .expect("the scheduler is running");
    println!(
        "  priority task ran at {} ns",
        urgent.join().expect("the task does not panic")
    );

    println!("6. Timer");
    let mut duration_ns = 0;
    {
        let _timer = ScopedTimer::new(&mut duration_ns);
        thread::sleep(Duration::from_micros(100));
    }
    println!("  measured: {duration_ns} ns");
    println!("  monotonic clock: {} ns", monotonic_nanos());

    println!("7. Summary");
    println!("  trades processed: {}", trade_count.load(Ordering::Relaxed));
    println!("  order pool capacity: {}", order_pool.capacity());
    println!("  scheduler size: {}", scheduler.size());

    info!("demo completed");

    bus.shutdown();
    scheduler.shutdown();
    priority.shutdown();
}
