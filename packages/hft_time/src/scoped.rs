use std::any::type_name;
use std::fmt;
use std::time::Instant;

use crate::saturating_nanos;

/// Measures how long it is alive and writes the elapsed nanoseconds into a borrowed variable
/// when dropped.
///
/// The measurement uses the monotonic clock, so it is never shorter than the real interval. The
/// value is written during unwinding as well, which means a panicking scope still reports how
/// long it ran.
///
/// ```rust
/// use hft_time::ScopedTimer;
///
/// let mut order_latency = 0;
///
/// {
///     let _timer = ScopedTimer::new(&mut order_latency);
///     // Send the order.
/// }
///
/// println!("order sent in {order_latency} ns");
/// ```
#[must_use = "the timer measures until it is dropped; binding it to `_` drops it immediately"]
pub struct ScopedTimer<'a> {
    target: &'a mut u64,
    started: Instant,
}

impl<'a> ScopedTimer<'a> {
    /// Starts measuring. The target is overwritten when the timer is dropped.
    pub fn new(target: &'a mut u64) -> Self {
        Self {
            target,
            started: Instant::now(),
        }
    }

    /// Nanoseconds since the timer was started, without stopping it.
    #[must_use]
    pub fn elapsed_nanos(&self) -> u64 {
        saturating_nanos(self.started.elapsed())
    }
}

impl Drop for ScopedTimer<'_> {
    fn drop(&mut self) {
        *self.target = self.elapsed_nanos();
    }
}

impl fmt::Debug for ScopedTimer<'_> {
    #[cfg_attr(test, mutants::skip)] // No API contract.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("started", &self.started)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::panic::{self, AssertUnwindSafe};
    use std::thread;
    use std::time::Duration;

    use static_assertions::assert_impl_all;

    use super::*;

    assert_impl_all!(ScopedTimer<'static>: Send, Sync);

    #[cfg_attr(miri, ignore)]
    #[test]
    fn writes_at_least_the_slept_interval() {
        let mut nanos = u64::MAX;

        {
            let _timer = ScopedTimer::new(&mut nanos);
            thread::sleep(Duration::from_millis(3));
        }

        assert!(nanos >= 3_000_000);
        assert!(nanos < 10_000_000_000);
    }

    #[cfg_attr(miri, ignore)]
    #[test]
    fn writes_during_unwinding() {
        let mut nanos = 0;

        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            let _timer = ScopedTimer::new(&mut nanos);
            thread::sleep(Duration::from_millis(2));
            panic!("order rejected");
        }));

        assert!(result.is_err());
        assert!(nanos >= 2_000_000);
    }

    #[cfg_attr(miri, ignore)]
    #[test]
    fn elapsed_grows_while_running() {
        let mut nanos = 0;
        let timer = ScopedTimer::new(&mut nanos);

        let first = timer.elapsed_nanos();
        thread::sleep(Duration::from_millis(1));
        assert!(timer.elapsed_nanos() > first);

        drop(timer);
        assert!(nanos >= 1_000_000);
    }
}
