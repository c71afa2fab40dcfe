use std::sync::LazyLock;
use std::time::{Duration, Instant};

static ANCHOR: LazyLock<Instant> = LazyLock::new(Instant::now);

/// Time elapsed since the process anchor.
///
/// The anchor is taken the first time any function in this crate reads the clock.
#[must_use]
pub fn since_anchor() -> Duration {
    ANCHOR.elapsed()
}

/// Nanoseconds elapsed since the process anchor.
///
/// Values from the same process never decrease.
#[must_use]
#[inline]
pub fn monotonic_nanos() -> u64 {
    saturating_nanos(since_anchor())
}

/// Microseconds elapsed since the process anchor.
#[must_use]
#[inline]
pub fn monotonic_micros() -> u64 {
    u64::try_from(since_anchor().as_micros()).unwrap_or(u64::MAX)
}

pub(crate) fn saturating_nanos(duration: Duration) -> u64 {
    u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX)
}
