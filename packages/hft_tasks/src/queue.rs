use std::any::type_name;
use std::collections::VecDeque;
use std::fmt;

use parking_lot::{Condvar, Mutex};

use crate::{Error, Result, Task};

/// An unbounded FIFO of tasks shared between submitters and a set of worker threads.
///
/// Once closed, the queue rejects new tasks but still hands out the ones it already holds, so
/// workers drain it completely before they observe the end of the queue.
#[derive(Default)]
pub(crate) struct WorkQueue {
    state: Mutex<QueueState>,
    available: Condvar,
}

#[derive(Default)]
struct QueueState {
    tasks: VecDeque<Task>,
    closed: bool,
}

impl WorkQueue {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&self, task: Task) -> Result<()> {
        let mut state = self.state.lock();

        if state.closed {
            return Err(Error::SchedulerClosed);
        }

        state.tasks.push_back(task);
        drop(state);

        self.available.notify_one();
        Ok(())
    }

    /// Blocks until a task is available or the queue is both closed and empty.
    ///
    /// Returns `None` only in the latter case.
    pub(crate) fn pop_blocking(&self) -> Option<Task> {
        let mut state = self.state.lock();

        loop {
            if let Some(task) = state.tasks.pop_front() {
                return Some(task);
            }

            if state.closed {
                return None;
            }

            self.available.wait(&mut state);
        }
    }

    /// Stops accepting tasks and wakes every waiting worker.
    ///
    /// Returns `true` if this call closed the queue, `false` if it was already closed.
    pub(crate) fn close(&self) -> bool {
        let mut state = self.state.lock();

        if state.closed {
            return false;
        }

        state.closed = true;
        drop(state);

        self.available.notify_all();
        true
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    pub(crate) fn len(&self) -> usize {
        self.state.lock().tasks.len()
    }
}

impl fmt::Debug for WorkQueue {
    #[cfg_attr(test, mutants::skip)] // No API contract.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();

        f.debug_struct(type_name::<Self>())
            .field("len", &state.tasks.len())
            .field("closed", &state.closed)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    use testing::with_watchdog;

    use super::*;

    fn recording_task(log: &Arc<parking_lot::Mutex<Vec<usize>>>, value: usize) -> Task {
        let log = Arc::clone(log);
        Box::new(move || log.lock().push(value))
    }

    #[test]
    fn debug_output_reports_length_and_state() {
        let queue = WorkQueue::new();
        queue.push(Box::new(|| ())).unwrap();
        queue.close();

        let output = format!("{queue:?}");

        assert!(output.contains("len: 1"));
        assert!(output.contains("closed: true"));
    }

    #[test]
    fn tasks_come_out_in_submission_order() {
        let queue = WorkQueue::new();
        let log = Arc::new(parking_lot::Mutex::new(Vec::new()));

        for value in 0..5 {
            queue.push(recording_task(&log, value)).unwrap();
        }

        assert_eq!(queue.len(), 5);

        queue.close();

        while let Some(task) = queue.pop_blocking() {
            task();
        }

        assert_eq!(*log.lock(), vec![0, 1, 2, 3, 4]);
        assert_eq!(queue.len(), 0);
    }

    #[test]
    fn closed_queue_rejects_new_tasks() {
        let queue = WorkQueue::new();

        assert!(queue.close());
        assert!(!queue.close());
        assert!(queue.is_closed());

        let result = queue.push(Box::new(|| {}));
        assert!(matches!(result, Err(Error::SchedulerClosed)));
    }

    #[cfg_attr(miri, ignore)]
    #[test]
    fn close_wakes_blocked_consumers() {
        with_watchdog(|| {
            let queue = Arc::new(WorkQueue::new());
            let finished = Arc::new(AtomicUsize::new(0));

            let consumers: Vec<_> = (0..3)
                .map(|_| {
                    let queue = Arc::clone(&queue);
                    let finished = Arc::clone(&finished);

                    thread::spawn(move || {
                        while let Some(task) = queue.pop_blocking() {
                            task();
                        }

                        finished.fetch_add(1, Ordering::Relaxed);
                    })
                })
                .collect();

            queue.close();

            for consumer in consumers {
                consumer.join().unwrap();
            }

            assert_eq!(finished.load(Ordering::Relaxed), 3);
        });
    }
}
