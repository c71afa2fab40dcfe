//! Type-erased units of work and the wrapper that carries their results back to the submitter.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use tracing::warn;

use crate::format_panic_payload;

/// A task as stored in a work queue: runs once and reports its own result.
pub(crate) type Task = Box<dyn FnOnce() + Send + 'static>;

pub(crate) type TaskResult<R> = Result<R, Box<dyn Any + Send>>;

/// Wraps a user closure so that its return value or panic is delivered through `sender`.
///
/// The wrapped task never unwinds into the worker thread that runs it.
pub(crate) fn wrap_task<R, F>(task: F, sender: oneshot::Sender<TaskResult<R>>) -> Task
where
    R: Send + 'static,
    F: FnOnce() -> R + Send + 'static,
{
    Box::new(move || {
        let result = panic::catch_unwind(AssertUnwindSafe(task));

        if let Err(unsent) = sender.send(result) {
            // The handle is gone. A panic would otherwise disappear without a trace.
            if let Err(payload) = unsent.into_inner() {
                warn!(
                    panic_message = %format_panic_payload(&*payload),
                    "task panicked but its handle was dropped without being joined"
                );
            }
        }
    })
}
