use std::num::NonZero;
use std::thread;

use tracing::debug;

#[cfg(target_os = "linux")]
use crate::pal::{Bindings, BindingsFacade, STRONGEST_NICE, single_processor_set};
use crate::{Result, SchedulerCore, TaskHandle};

const DEFAULT_WORKER_COUNT: usize = 2;
const DEFAULT_NAME_PREFIX: &str = "hft-priority";

/// A small set of worker threads for latency-critical tasks.
///
/// Behaves like [`TaskScheduler`][crate::TaskScheduler], with its own queue and workers. In
/// addition, every worker tries to raise its own scheduling priority when it starts:
///
/// 1. It requests the real-time `SCHED_FIFO` class at the maximum priority. If that is refused,
///    typically for lack of privileges, it sets the strongest `nice` value instead.
/// 2. It pins itself to logical processor `worker_index % available_processors`.
///
/// Both steps are best effort. A refusal is logged at debug level and the worker carries on with
/// whatever scheduling it has. Elevation is only attempted on Linux.
///
/// # Example
///
/// ```rust
/// use hft_tasks::PriorityTaskScheduler;
///
/// let scheduler = PriorityTaskScheduler::new();
/// assert_eq!(scheduler.size(), 2);
///
/// let handle = scheduler.submit(|| "order routed").unwrap();
/// assert_eq!(handle.join().unwrap(), "order routed");
/// ```
#[derive(Debug)]
pub struct PriorityTaskScheduler {
    core: SchedulerCore,
}

impl PriorityTaskScheduler {
    /// Creates a scheduler with two elevated workers.
    ///
    /// Use [`PriorityTaskScheduler::builder()`] for custom configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Creates a builder for configuring the scheduler.
    #[must_use]
    pub fn builder() -> PriorityTaskSchedulerBuilder {
        PriorityTaskSchedulerBuilder::new()
    }

    /// Queues a task for execution on one of the elevated workers.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SchedulerClosed`][crate::Error::SchedulerClosed] if the scheduler has
    /// been shut down.
    pub fn submit<R, F>(&self, task: F) -> Result<TaskHandle<R>>
    where
        R: Send + 'static,
        F: FnOnce() -> R + Send + 'static,
    {
        self.core.submit(task)
    }

    /// Number of worker threads.
    #[must_use]
    pub fn size(&self) -> usize {
        self.core.workers().worker_count()
    }

    /// Number of tasks waiting for a worker. May be stale.
    #[must_use]
    pub fn pending_tasks(&self) -> usize {
        self.core.pending_tasks()
    }

    /// Whether [`shutdown()`][Self::shutdown] has been called.
    #[must_use]
    pub fn is_shutdown(&self) -> bool {
        self.core.is_shutdown()
    }

    /// Stops accepting tasks, runs every task already queued and waits for the workers to exit.
    ///
    /// Calling this more than once is harmless.
    pub fn shutdown(&self) {
        self.core.shutdown();
    }
}

impl Default for PriorityTaskScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for PriorityTaskScheduler {
    fn drop(&mut self) {
        self.core.shutdown();
    }
}

/// Builder for configuring a [`PriorityTaskScheduler`].
#[derive(Debug)]
pub struct PriorityTaskSchedulerBuilder {
    worker_count: NonZero<usize>,
    name_prefix: String,

    #[cfg(target_os = "linux")]
    bindings: BindingsFacade,
}

impl PriorityTaskSchedulerBuilder {
    fn new() -> Self {
        Self {
            worker_count: NonZero::new(DEFAULT_WORKER_COUNT)
                .expect("default worker count is a non-zero constant"),
            name_prefix: DEFAULT_NAME_PREFIX.to_string(),
            #[cfg(target_os = "linux")]
            bindings: BindingsFacade::target(),
        }
    }

    /// Sets the number of worker threads.
    ///
    /// Default is 2.
    #[must_use]
    pub fn worker_count(mut self, count: NonZero<usize>) -> Self {
        self.worker_count = count;
        self
    }

    /// Sets the prefix of the worker thread names. Worker `i` is named `{prefix}-{i}`.
    ///
    /// Default is `hft-priority`.
    #[must_use]
    pub fn name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.name_prefix = prefix.into();
        self
    }

    #[cfg(all(test, target_os = "linux"))]
    pub(crate) fn bindings(mut self, bindings: BindingsFacade) -> Self {
        self.bindings = bindings;
        self
    }

    /// Starts the worker threads and returns the scheduler.
    #[must_use]
    pub fn build(self) -> PriorityTaskScheduler {
        let processor_count = thread::available_parallelism().map_or(1, NonZero::get);

        #[cfg(target_os = "linux")]
        let on_start = {
            let bindings = self.bindings;
            move |worker_index: usize| {
                let elevation = elevate_current_thread(&bindings, worker_index, processor_count);

                debug!(
                    worker_index,
                    priority = ?elevation.priority,
                    pinned_to = ?elevation.pinned_to,
                    "worker elevation finished"
                );
            }
        };

        #[cfg(not(target_os = "linux"))]
        let on_start = move |worker_index: usize| {
            debug!(
                worker_index,
                processor_count, "thread priority elevation is not supported on this platform"
            );
        };

        PriorityTaskScheduler {
            core: SchedulerCore::start(self.worker_count.get(), &self.name_prefix, on_start),
        }
    }
}

/// How a worker's scheduling priority ended up after elevation.
#[cfg(target_os = "linux")]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum PriorityOutcome {
    RealTime,
    Nice,
    Unchanged,
}

#[cfg(target_os = "linux")]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) struct Elevation {
    pub(crate) priority: PriorityOutcome,
    pub(crate) pinned_to: Option<usize>,
}

#[cfg(target_os = "linux")]
pub(crate) fn elevate_current_thread(
    bindings: &impl Bindings,
    worker_index: usize,
    processor_count: usize,
) -> Elevation {
    let priority = match bindings.set_fifo_max_priority_current() {
        Ok(()) => PriorityOutcome::RealTime,
        Err(fifo_error) => {
            debug!(worker_index, error = %fifo_error, "SCHED_FIFO refused, falling back to nice");

            match bindings.set_nice_current(STRONGEST_NICE) {
                Ok(()) => PriorityOutcome::Nice,
                Err(nice_error) => {
                    debug!(
                        worker_index,
                        error = %nice_error,
                        "nice refused, keeping default priority"
                    );
                    PriorityOutcome::Unchanged
                }
            }
        }
    };

    #[expect(clippy::arithmetic_side_effects, reason = "divisor is at least one")]
    let processor_index = worker_index % processor_count.max(1);

    let pinned_to = match single_processor_set(processor_index)
        .and_then(|cpuset| bindings.sched_setaffinity_current(&cpuset))
    {
        Ok(()) => Some(processor_index),
        Err(error) => {
            debug!(worker_index, processor_index, %error, "worker could not be pinned");
            None
        }
    };

    Elevation {
        priority,
        pinned_to,
    }
}
