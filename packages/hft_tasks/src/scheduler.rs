use std::num::NonZero;
use std::thread;

#[cfg(target_os = "linux")]
use std::os::unix::thread::JoinHandleExt;

use crate::{Result, SchedulerCore, TaskHandle};
#[cfg(target_os = "linux")]
use crate::{
    Error,
    pal::{Bindings, BindingsFacade, single_processor_set},
};

const DEFAULT_NAME_PREFIX: &str = "hft-worker";

/// A fixed set of worker threads executing submitted tasks in submission order.
///
/// Tasks are closures that capture whatever they need. Each submission returns a
/// [`TaskHandle`] through which the caller obtains the closure's return value, or the panic it
/// raised.
///
/// # Lifetime
///
/// [`shutdown()`][Self::shutdown] stops accepting new tasks, lets the workers finish every task
/// already queued and then joins them. Dropping the scheduler does the same.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicU32, Ordering};
///
/// use hft_tasks::TaskScheduler;
///
/// let scheduler = TaskScheduler::new();
/// let counter = Arc::new(AtomicU32::new(0));
///
/// let handles: Vec<_> = (0..10)
///     .map(|_| {
///         let counter = Arc::clone(&counter);
///         scheduler
///             .submit(move || counter.fetch_add(1, Ordering::Relaxed))
///             .unwrap()
///     })
///     .collect();
///
/// for handle in handles {
///     handle.join().unwrap();
/// }
///
/// assert_eq!(counter.load(Ordering::Relaxed), 10);
/// ```
#[derive(Debug)]
pub struct TaskScheduler {
    core: SchedulerCore,

    #[cfg(target_os = "linux")]
    bindings: BindingsFacade,
}

impl TaskScheduler {
    /// Creates a scheduler with one worker per available processor.
    ///
    /// Use [`TaskScheduler::builder()`] for custom configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Creates a builder for configuring the scheduler.
    #[must_use]
    pub fn builder() -> TaskSchedulerBuilder {
        TaskSchedulerBuilder::new()
    }

    /// Queues a task for execution on one of the workers.
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

    /// Number of tasks waiting for a worker.
    ///
    /// The value may be stale by the time the caller sees it.
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

    /// Restricts one worker thread to a single processor.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IndexOutOfRange`] if `worker_index` is not smaller than
    /// [`size()`][Self::size], [`Error::SchedulerClosed`] if the workers have already been
    /// joined and [`Error::Affinity`] if the operating system refuses the request, for example
    /// because the processor does not exist.
    #[cfg(target_os = "linux")]
    #[cfg_attr(docsrs, doc(cfg(target_os = "linux")))]
    pub fn set_thread_affinity(&self, worker_index: usize, processor_index: usize) -> Result<()> {
        let worker_count = self.size();

        if worker_index >= worker_count {
            return Err(Error::IndexOutOfRange {
                index: worker_index,
                worker_count,
            });
        }

        let affinity_error = |source| Error::Affinity {
            worker_index,
            processor_index,
            source,
        };

        let cpuset = single_processor_set(processor_index).map_err(affinity_error)?;

        self.core
            .workers()
            .with_handle(worker_index, |handle| {
                self.bindings
                    .pthread_setaffinity(handle.as_pthread_t(), &cpuset)
            })
            .ok_or(Error::SchedulerClosed)?
            .map_err(affinity_error)?;

        tracing::debug!(worker_index, processor_index, "worker pinned to processor");

        Ok(())
    }
}

impl Default for TaskScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TaskScheduler {
    fn drop(&mut self) {
        self.core.shutdown();
    }
}

/// Builder for configuring a [`TaskScheduler`].
#[derive(Debug)]
pub struct TaskSchedulerBuilder {
    worker_count: Option<NonZero<usize>>,
    name_prefix: String,

    #[cfg(target_os = "linux")]
    bindings: BindingsFacade,
}

impl TaskSchedulerBuilder {
    fn new() -> Self {
        Self {
            worker_count: None,
            name_prefix: DEFAULT_NAME_PREFIX.to_string(),
            #[cfg(target_os = "linux")]
            bindings: BindingsFacade::target(),
        }
    }

    /// Sets the number of worker threads.
    ///
    /// Default is the available parallelism of the system, as reported by
    /// [`std::thread::available_parallelism()`].
    #[must_use]
    pub fn worker_count(mut self, count: NonZero<usize>) -> Self {
        self.worker_count = Some(count);
        self
    }

    /// Sets the prefix of the worker thread names. Worker `i` is named `{prefix}-{i}`.
    ///
    /// Default is `hft-worker`.
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
    pub fn build(self) -> TaskScheduler {
        let worker_count = self
            .worker_count
            .or_else(|| thread::available_parallelism().ok())
            .map_or(1, NonZero::get);

        TaskScheduler {
            core: SchedulerCore::start(worker_count, &self.name_prefix, |_| {}),
            #[cfg(target_os = "linux")]
            bindings: self.bindings,
        }
    }
}
