use std::any::type_name;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use oneshot::{RecvTimeoutError, TryRecvError};

use crate::{TaskFailure, TaskResult};

/// A handle to a submitted task through which its result can be retrieved.
///
/// The result is either the value returned by the task or a [`TaskFailure`] describing why there
/// is no value, typically because the task panicked. Retrieve it by blocking with
/// [`join()`][Self::join], by polling with [`try_join()`][Self::try_join] or
/// [`join_timeout()`][Self::join_timeout], or by awaiting the handle.
///
/// Dropping the handle detaches the task: it still runs, but its result is discarded. If a
/// detached task panics, the panic is logged as a warning.
///
/// # Example
///
/// ```rust
/// use hft_tasks::TaskScheduler;
///
/// let scheduler = TaskScheduler::new();
/// let handle = scheduler.submit(|| 6 * 7).unwrap();
///
/// assert_eq!(handle.join().unwrap(), 42);
/// ```
pub struct TaskHandle<R> {
    receiver: oneshot::Receiver<TaskResult<R>>,
}

impl<R> TaskHandle<R> {
    pub(crate) fn new(receiver: oneshot::Receiver<TaskResult<R>>) -> Self {
        Self { receiver }
    }

    /// Blocks the current thread until the task has finished.
    ///
    /// # Errors
    ///
    /// Returns [`TaskFailure::Panicked`] if the task panicked and [`TaskFailure::Abandoned`] if
    /// it was discarded without running.
    pub fn join(self) -> Result<R, TaskFailure> {
        match self.receiver.recv() {
            Ok(result) => result.map_err(TaskFailure::from_panic),
            Err(_) => Err(TaskFailure::Abandoned),
        }
    }

    /// Returns the outcome of the task if it has already finished, or gives the handle back
    /// if it has not.
    ///
    /// # Errors
    ///
    /// Returns the handle itself if the task is still queued or running.
    pub fn try_join(self) -> Result<Result<R, TaskFailure>, Self> {
        match self.receiver.try_recv() {
            Ok(result) => Ok(result.map_err(TaskFailure::from_panic)),
            Err(TryRecvError::Empty) => Err(self),
            Err(TryRecvError::Disconnected) => Ok(Err(TaskFailure::Abandoned)),
        }
    }

    /// Blocks the current thread until the task has finished or the timeout elapses.
    ///
    /// # Errors
    ///
    /// Returns the handle itself if the task did not finish within `timeout`.
    pub fn join_timeout(self, timeout: Duration) -> Result<Result<R, TaskFailure>, Self> {
        match self.receiver.recv_timeout(timeout) {
            Ok(result) => Ok(result.map_err(TaskFailure::from_panic)),
            Err(RecvTimeoutError::Timeout) => Err(self),
            Err(RecvTimeoutError::Disconnected) => Ok(Err(TaskFailure::Abandoned)),
        }
    }
}

impl<R> Future for TaskHandle<R> {
    type Output = Result<R, TaskFailure>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.receiver).poll(cx) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(Ok(result)) => Poll::Ready(result.map_err(TaskFailure::from_panic)),
            Poll::Ready(Err(_)) => Poll::Ready(Err(TaskFailure::Abandoned)),
        }
    }
}

impl<R> fmt::Debug for TaskHandle<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>()).finish_non_exhaustive()
    }
}
