#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Timestamps and duration measurement for latency-sensitive code.
//!
//! * [`monotonic_nanos()`] and [`monotonic_micros()`] read a monotonic clock relative to a
//!   process-wide anchor taken the first time any clock function is called.
//! * [`cycles()`] reads the CPU timestamp counter where one is available and
//!   [`cycles_to_nanos()`] converts a pair of readings into nanoseconds.
//! * [`ScopedTimer`] writes the time it was alive into a caller-provided variable when dropped.
//!
//! ```rust
//! use std::thread;
//! use std::time::Duration;
//!
//! use hft_time::ScopedTimer;
//!
//! let mut elapsed_nanos = 0;
//!
//! {
//!     let _timer = ScopedTimer::new(&mut elapsed_nanos);
//!     thread::sleep(Duration::from_millis(1));
//! }
//!
//! assert!(elapsed_nanos >= 1_000_000);
//! ```

mod clock;
mod cycles;
mod scoped;

pub use clock::*;
pub use cycles::*;
pub use scoped::*;
