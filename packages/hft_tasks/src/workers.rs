use std::any::type_name;
use std::sync::Arc;
use std::thread::{self, JoinHandle, ThreadId};
use std::{fmt, mem, panic};

use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::WorkQueue;

/// The worker threads of one scheduler, all consuming from the same [`WorkQueue`].
pub(crate) struct WorkerSet {
    handles: Mutex<Vec<JoinHandle<()>>>,

    /// Fixed at spawn time, so it can be checked without taking the `handles` lock.
    thread_ids: Vec<ThreadId>,

    worker_count: usize,
}

impl WorkerSet {
    /// Starts `worker_count` threads named `{name_prefix}-{index}`.
    ///
    /// Each thread calls `on_start` with its worker index before it takes its first task.
    pub(crate) fn spawn<S>(
        worker_count: usize,
        name_prefix: &str,
        queue: &Arc<WorkQueue>,
        on_start: S,
    ) -> Self
    where
        S: Fn(usize) + Send + Sync + 'static,
    {
        let on_start = Arc::new(on_start);

        let handles: Vec<_> = (0..worker_count)
            .map(|worker_index| {
                let queue = Arc::clone(queue);
                let on_start = Arc::clone(&on_start);

                thread::Builder::new()
                    .name(format!("{name_prefix}-{worker_index}"))
                    .spawn(move || {
                        on_start(worker_index);

                        debug!(worker_index, "worker thread started");
                        worker_loop(&queue, worker_index);
                        debug!(worker_index, "worker thread exiting");
                    })
                    .expect(
                        "failed to spawn worker thread: thread spawning failure is not supported",
                    )
            })
            .collect();

        let thread_ids = handles.iter().map(|handle| handle.thread().id()).collect();

        Self {
            handles: Mutex::new(handles),
            thread_ids,
            worker_count,
        }
    }

    pub(crate) fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Runs `f` with the join handle of one worker, or returns `None` if the workers have
    /// already been joined.
    pub(crate) fn with_handle<R>(
        &self,
        worker_index: usize,
        f: impl FnOnce(&JoinHandle<()>) -> R,
    ) -> Option<R> {
        self.handles.lock().get(worker_index).map(f)
    }

    /// Waits for every worker to exit. The queue must have been closed first.
    ///
    /// Concurrent callers all return only after the workers are gone. A worker of this set that
    /// calls this returns at once: it cannot wait for itself, and waiting for its siblings could
    /// deadlock against a sibling doing the same. The workers still exit once the closed queue is
    /// drained and a later call from outside the set joins them.
    pub(crate) fn join_all(&self) {
        if self.is_worker_thread() {
            trace!("join requested from a worker thread, leaving workers to exit on their own");
            return;
        }

        // The lock is held while joining so that a second caller waits for the first.
        let mut handles = self.handles.lock();

        for handle in mem::take(&mut *handles) {
            if let Err(payload) = handle.join() {
                // Tasks run inside a panic trap, so a panicking worker means the worker loop
                // itself is broken. That must not go unnoticed.
                panic::resume_unwind(payload);
            }
        }
    }

    fn is_worker_thread(&self) -> bool {
        self.thread_ids.contains(&thread::current().id())
    }
}

impl fmt::Debug for WorkerSet {
    #[cfg_attr(test, mutants::skip)] // No API contract.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("worker_count", &self.worker_count)
            .field("running", &self.handles.lock().len())
            .finish()
    }
}

fn worker_loop(queue: &WorkQueue, worker_index: usize) {
    while let Some(task) = queue.pop_blocking() {
        task();
        trace!(worker_index, "executed task");
    }
}
