#![cfg_attr(coverage_nightly, coverage(off))]

use std::fmt::Debug;
use std::io;
#[cfg(test)]
use std::sync::Arc;

use libc::{cpu_set_t, pthread_t};

#[cfg(test)]
use crate::pal::MockBindings;
use crate::pal::{Bindings, BuildTargetBindings};

/// Enum to hide the real/mock choice behind a single wrapper type.
#[derive(Clone)]
pub(crate) enum BindingsFacade {
    Target(&'static BuildTargetBindings),

    #[cfg(test)]
    Mock(Arc<MockBindings>),
}

impl BindingsFacade {
    pub(crate) const fn target() -> Self {
        Self::Target(&BuildTargetBindings)
    }

    #[cfg(test)]
    pub(crate) fn from_mock(mock: MockBindings) -> Self {
        Self::Mock(Arc::new(mock))
    }
}

impl Default for BindingsFacade {
    fn default() -> Self {
        Self::target()
    }
}

impl Bindings for BindingsFacade {
    fn set_fifo_max_priority_current(&self) -> Result<(), io::Error> {
        match self {
            Self::Target(bindings) => bindings.set_fifo_max_priority_current(),
            #[cfg(test)]
            Self::Mock(mock) => mock.set_fifo_max_priority_current(),
        }
    }

    fn set_nice_current(&self, nice: i32) -> Result<(), io::Error> {
        match self {
            Self::Target(bindings) => bindings.set_nice_current(nice),
            #[cfg(test)]
            Self::Mock(mock) => mock.set_nice_current(nice),
        }
    }

    fn sched_setaffinity_current(&self, cpuset: &cpu_set_t) -> Result<(), io::Error> {
        match self {
            Self::Target(bindings) => bindings.sched_setaffinity_current(cpuset),
            #[cfg(test)]
            Self::Mock(mock) => mock.sched_setaffinity_current(cpuset),
        }
    }

    fn pthread_setaffinity(
        &self,
        thread: pthread_t,
        cpuset: &cpu_set_t,
    ) -> Result<(), io::Error> {
        match self {
            Self::Target(bindings) => bindings.pthread_setaffinity(thread, cpuset),
            #[cfg(test)]
            Self::Mock(mock) => mock.pthread_setaffinity(thread, cpuset),
        }
    }
}

impl Debug for BindingsFacade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Target(inner) => inner.fmt(f),
            #[cfg(test)]
            Self::Mock(inner) => inner.fmt(f),
        }
    }
}
