#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Fixed-size worker pools that execute closures in submission order.
//!
//! Two schedulers are provided:
//!
//! * [`TaskScheduler`] - a general purpose pool, by default with one worker per available
//!   processor. On Linux, individual workers can be pinned to processors with
//!   [`TaskScheduler::set_thread_affinity()`].
//! * [`PriorityTaskScheduler`] - a small pool (two workers by default) whose workers try to run
//!   with real-time scheduling priority, each pinned to its own processor.
//!
//! Both share the same contract: [`submit()`][TaskScheduler::submit] queues a closure and returns
//! a [`TaskHandle`] that yields the closure's return value, or a [`TaskFailure`] if the closure
//! panicked. Workers take tasks from a single FIFO queue, so tasks start in the order they were
//! submitted, though with more than one worker they may finish in any order.
//!
//! # Shutdown behavior
//!
//! Shutting down a scheduler, explicitly or by dropping it, rejects further submissions with
//! [`Error::SchedulerClosed`], runs every task that was already queued and joins the workers.
//!
//! # Quick start
//!
//! ```rust
//! use hft_tasks::{TaskFailure, TaskScheduler};
//!
//! let scheduler = TaskScheduler::new();
//!
//! let sum = scheduler.submit(|| (1..=10).sum::<u32>()).unwrap();
//! let broken = scheduler.submit(|| -> u32 { panic!("bad input") }).unwrap();
//!
//! assert_eq!(sum.join().unwrap(), 55);
//! assert!(matches!(broken.join(), Err(TaskFailure::Panicked { .. })));
//!
//! scheduler.shutdown();
//! assert!(scheduler.submit(|| ()).is_err());
//! ```

mod error;
mod handle;
mod pal;
mod priority;
mod queue;
mod scheduler;
mod scheduler_core;
mod task;
mod workers;

pub use error::*;
pub use handle::*;
pub use priority::{PriorityTaskScheduler, PriorityTaskSchedulerBuilder};
pub(crate) use queue::*;
pub use scheduler::*;
pub(crate) use scheduler_core::*;
pub(crate) use task::*;
pub(crate) use workers::*;
