use std::any::{Any, type_name};
use std::{fmt, io, panic};

use thiserror::Error;

/// Errors returned by scheduler operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The scheduler has been shut down and no longer accepts work.
    #[error("the scheduler has been shut down and no longer accepts tasks")]
    SchedulerClosed,

    /// A worker index did not refer to one of the scheduler's workers.
    #[error("worker index {index} is out of range for a scheduler with {worker_count} workers")]
    IndexOutOfRange {
        /// The index that was requested.
        index: usize,

        /// How many workers the scheduler has.
        worker_count: usize,
    },

    /// The operating system refused to change the processor affinity of a worker thread.
    #[error("failed to pin worker {worker_index} to processor {processor_index}")]
    Affinity {
        /// The worker whose affinity was being changed.
        worker_index: usize,

        /// The processor the worker was to be pinned to.
        processor_index: usize,

        /// The error reported by the operating system.
        source: io::Error,
    },
}

/// A specialized `Result` type for scheduler operations, returning the crate's
/// [`Error`] type as the error value.
pub(crate) type Result<T> = std::result::Result<T, Error>;

/// Why a task did not produce a value.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TaskFailure {
    /// The task panicked while running. The panic was caught on the worker thread.
    #[error("task panicked: {message}")]
    Panicked {
        /// The panic message, if the payload was a string, or a placeholder otherwise.
        message: String,

        /// The original panic payload.
        payload: PanicPayload,
    },

    /// The task was dropped without ever running, so no result will arrive.
    #[error("task was abandoned before it could run")]
    Abandoned,
}

impl TaskFailure {
    pub(crate) fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        Self::Panicked {
            message: format_panic_payload(&*payload),
            payload: PanicPayload(payload),
        }
    }

    /// Re-raises the original panic on the current thread.
    ///
    /// A task that was abandoned raises a new panic describing that instead.
    pub fn resume_unwind(self) -> ! {
        match self {
            Self::Panicked { payload, .. } => panic::resume_unwind(payload.0),
            Self::Abandoned => panic!("task was abandoned before it could run"),
        }
    }
}

/// The payload of a panic captured from a task, as passed to [`std::panic::panic_any`].
pub struct PanicPayload(Box<dyn Any + Send>);

impl PanicPayload {
    /// Returns the boxed payload, for example to inspect it with `downcast_ref()`.
    #[must_use]
    pub fn into_inner(self) -> Box<dyn Any + Send> {
        self.0
    }
}

impl fmt::Debug for PanicPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple(type_name::<Self>())
            .field(&format_panic_payload(&*self.0))
            .finish()
    }
}

pub(crate) fn format_panic_payload(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
