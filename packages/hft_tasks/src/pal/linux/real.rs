use std::fmt::Debug;
use std::io;

use libc::{cpu_set_t, pthread_t, sched_param};

use crate::pal::Bindings;

/// Bindings that call into the real operating system the build is targeting.
#[derive(Debug, Default)]
pub(crate) struct BuildTargetBindings;

// Excluded from coverage: the error paths depend on process privileges.
#[cfg_attr(coverage_nightly, coverage(off))]
impl Bindings for BuildTargetBindings {
    #[cfg_attr(test, mutants::skip)] // Real OS call; callers are tested against mocked bindings.
    fn set_fifo_max_priority_current(&self) -> Result<(), io::Error> {
        // SAFETY: No safety requirements.
        let priority = unsafe { libc::sched_get_priority_max(libc::SCHED_FIFO) };

        if priority == -1 {
            return Err(io::Error::last_os_error());
        }

        let param = sched_param {
            sched_priority: priority,
        };

        // pthread functions return the error number instead of setting errno.
        // SAFETY: pthread_self() is always a valid thread handle for the calling thread.
        let result =
            unsafe { libc::pthread_setschedparam(libc::pthread_self(), libc::SCHED_FIFO, &param) };

        if result == 0 {
            Ok(())
        } else {
            Err(io::Error::from_raw_os_error(result))
        }
    }

    #[cfg_attr(test, mutants::skip)] // Real OS call; callers are tested against mocked bindings.
    fn set_nice_current(&self, nice: i32) -> Result<(), io::Error> {
        // On Linux, "who" 0 with PRIO_PROCESS targets the calling thread only.
        // SAFETY: No safety requirements beyond passing valid arguments.
        let result = unsafe { libc::setpriority(libc::PRIO_PROCESS, 0, nice) };

        if result == 0 {
            Ok(())
        } else {
            Err(io::Error::last_os_error())
        }
    }

    #[cfg_attr(test, mutants::skip)] // Real OS call; callers are tested against mocked bindings.
    fn sched_setaffinity_current(&self, cpuset: &cpu_set_t) -> Result<(), io::Error> {
        // 0 means current thread.
        // SAFETY: No safety requirements beyond passing valid arguments.
        let result = unsafe { libc::sched_setaffinity(0, size_of::<cpu_set_t>(), cpuset) };

        if result == 0 {
            Ok(())
        } else {
            Err(io::Error::last_os_error())
        }
    }

    #[cfg_attr(test, mutants::skip)] // Real OS call; callers are tested against mocked bindings.
    fn pthread_setaffinity(
        &self,
        thread: pthread_t,
        cpuset: &cpu_set_t,
    ) -> Result<(), io::Error> {
        // SAFETY: The caller passes the handle of a thread that has not been joined yet.
        let result =
            unsafe { libc::pthread_setaffinity_np(thread, size_of::<cpu_set_t>(), cpuset) };

        if result == 0 {
            Ok(())
        } else {
            Err(io::Error::from_raw_os_error(result))
        }
    }
}
