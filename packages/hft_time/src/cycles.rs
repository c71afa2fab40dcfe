use std::sync::LazyLock;
#[cfg(target_arch = "x86_64")]
use std::arch::x86_64::_rdtsc;
#[cfg(target_arch = "x86_64")]
use std::thread;
#[cfg(target_arch = "x86_64")]
use std::time::Duration;

use tracing::debug;

#[cfg(target_arch = "x86_64")]
use crate::{saturating_nanos, since_anchor};
#[cfg(not(target_arch = "x86_64"))]
use crate::monotonic_nanos;

/// How long calibration sleeps while counting cycles against the monotonic clock.
#[cfg(target_arch = "x86_64")]
const CALIBRATION_INTERVAL: Duration = Duration::from_millis(10);

static CYCLES_PER_NANOSECOND: LazyLock<f64> = LazyLock::new(calibrate);

/// Reads the CPU cycle counter.
///
/// On `x86_64` this is the timestamp counter. Other targets have no portable cycle counter, so
/// the value is [`monotonic_nanos()`][crate::monotonic_nanos] instead and one cycle equals one
/// nanosecond.
///
/// Only the difference between two readings is meaningful. Convert it with [`cycles_to_nanos()`].
#[must_use]
#[inline]
pub fn cycles() -> u64 {
    #[cfg(target_arch = "x86_64")]
    {
        // SAFETY: RDTSC is available on every x86_64 processor and has no preconditions.
        unsafe { _rdtsc() }
    }

    #[cfg(not(target_arch = "x86_64"))]
    {
        monotonic_nanos()
    }
}

/// Number of [`cycles()`] ticks per nanosecond.
///
/// Calibrated once per process on first use. The first call blocks for a few milliseconds.
#[must_use]
pub fn cycles_per_nanosecond() -> f64 {
    *CYCLES_PER_NANOSECOND
}

/// Converts two [`cycles()`] readings into the nanoseconds between them.
///
/// Returns zero if `end` is before `start`.
#[must_use]
#[expect(
    clippy::cast_precision_loss,
    reason = "cycle deltas far beyond 2^52 are not a realistic measurement"
)]
#[expect(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    reason = "the quotient is non-negative and float to int casts saturate"
)]
pub fn cycles_to_nanos(start: u64, end: u64) -> u64 {
    let delta = end.saturating_sub(start);

    (delta as f64 / cycles_per_nanosecond()) as u64
}

#[cfg(target_arch = "x86_64")]
#[cfg_attr(test, mutants::skip)] // Depends on real elapsed time; only sanity-checked by tests.
#[expect(
    clippy::cast_precision_loss,
    reason = "calibration deltas are a few hundred million at most"
)]
fn calibrate() -> f64 {
    let clock_start = since_anchor();
    let cycles_start = cycles();

    thread::sleep(CALIBRATION_INTERVAL);

    let cycles_end = cycles();
    let elapsed_nanos = saturating_nanos(since_anchor().saturating_sub(clock_start));
    let elapsed_cycles = cycles_end.saturating_sub(cycles_start);

    if elapsed_nanos == 0 || elapsed_cycles == 0 {
        debug!(
            elapsed_nanos,
            elapsed_cycles,
            "cycle counter calibration inconclusive, assuming one cycle per nanosecond"
        );
        return 1.0;
    }

    let ratio = elapsed_cycles as f64 / elapsed_nanos as f64;

    debug!(
        cycles_per_nanosecond = ratio,
        elapsed_nanos, elapsed_cycles, "calibrated cycle counter"
    );

    ratio
}

#[cfg(not(target_arch = "x86_64"))]
fn calibrate() -> f64 {
    debug!("no cycle counter on this target, cycles are monotonic nanoseconds");
    1.0
}
