use std::sync::Arc;

use tracing::debug;

use crate::{Result, TaskHandle, WorkQueue, WorkerSet, wrap_task};

/// The queue and worker threads shared by every scheduler flavor.
#[derive(Debug)]
pub(crate) struct SchedulerCore {
    queue: Arc<WorkQueue>,
    workers: WorkerSet,
}

impl SchedulerCore {
    pub(crate) fn start<S>(worker_count: usize, name_prefix: &str, on_start: S) -> Self
    where
        S: Fn(usize) + Send + Sync + 'static,
    {
        let queue = Arc::new(WorkQueue::new());
        let workers = WorkerSet::spawn(worker_count, name_prefix, &queue, on_start);

        debug!(worker_count, name_prefix, "scheduler started");

        Self { queue, workers }
    }

    pub(crate) fn submit<R, F>(&self, task: F) -> Result<TaskHandle<R>>
    where
        R: Send + 'static,
        F: FnOnce() -> R + Send + 'static,
    {
        let (sender, receiver) = oneshot::channel();
        self.queue.push(wrap_task(task, sender))?;

        Ok(TaskHandle::new(receiver))
    }

    pub(crate) fn workers(&self) -> &WorkerSet {
        &self.workers
    }

    pub(crate) fn pending_tasks(&self) -> usize {
        self.queue.len()
    }

    pub(crate) fn is_shutdown(&self) -> bool {
        self.queue.is_closed()
    }

    pub(crate) fn shutdown(&self) {
        if self.queue.close() {
            debug!(
                pending_tasks = self.queue.len(),
                "scheduler shutting down, draining queue"
            );
        }

        self.workers.join_all();
    }
}
