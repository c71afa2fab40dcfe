#![cfg_attr(
    test,
    expect(
        clippy::struct_field_names,
        reason = "false positive from automock generated code"
    )
)]

use std::fmt::Debug;
use std::io;

use libc::{cpu_set_t, pthread_t};

/// Bindings for the operating system calls that change how threads are scheduled.
///
/// All such calls go through this trait so the fallback paths can be tested with mocks.
#[cfg_attr(test, mockall::automock)]
pub(crate) trait Bindings: Debug + Send + Sync + 'static {
    // pthread_setschedparam() with SCHED_FIFO at its maximum priority, for the current thread
    fn set_fifo_max_priority_current(&self) -> Result<(), io::Error>;

    // setpriority() for the current thread
    fn set_nice_current(&self, nice: i32) -> Result<(), io::Error>;

    // sched_setaffinity() for the current thread
    fn sched_setaffinity_current(&self, cpuset: &cpu_set_t) -> Result<(), io::Error>;

    // pthread_setaffinity_np() for any thread of this process
    fn pthread_setaffinity(&self, thread: pthread_t, cpuset: &cpu_set_t)
    -> Result<(), io::Error>;
}
