#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Building blocks for latency-sensitive trading services.
//!
//! This crate gathers the `hft_*` packages under one dependency:
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`tasks`] | [`TaskScheduler`][tasks::TaskScheduler] and [`PriorityTaskScheduler`][tasks::PriorityTaskScheduler] worker pools |
//! | [`pools`] | [`ObjectPool`][pools::ObjectPool] and [`LockFreeObjectPool`][pools::LockFreeObjectPool] |
//! | [`events`] | Type-keyed [`EventBus`][events::EventBus] |
//! | [`config`] | Key/value [`Config`][config::Config] store backed by `key=value` files |
//! | [`log`] | [`Logger`][log::Logger] built on `tracing` |
//! | [`time`] | Monotonic clock, cycle counter and [`ScopedTimer`][time::ScopedTimer] |
//!
//! None of the components is a global singleton. A service creates the ones it needs at startup
//! and hands references to the code that uses them. See `examples/hft_core_demo.rs` for a
//! complete composition root.

#[doc(inline)]
pub use hft_config as config;
#[doc(inline)]
pub use hft_events as events;
#[doc(inline)]
pub use hft_log as log;
#[doc(inline)]
pub use hft_pools as pools;
#[doc(inline)]
pub use hft_tasks as tasks;
#[doc(inline)]
pub use hft_time as time;
