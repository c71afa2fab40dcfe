use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use tracing::Metadata;
use tracing::subscriber::Interest;
use tracing_subscriber::layer::{Context, Filter};

use crate::LogLevel;

/// Lets through events at or above a minimum level that can be changed while logging.
///
/// Every call site is re-evaluated on every event, so a level change applies immediately
/// without rebuilding the subscriber.
#[derive(Clone, Debug)]
pub(crate) struct MinLevelFilter {
    min_level: Arc<AtomicU8>,
}

impl MinLevelFilter {
    pub(crate) fn new(min_level: LogLevel) -> Self {
        Self {
            min_level: Arc::new(AtomicU8::new(min_level as u8)),
        }
    }

    pub(crate) fn min_level(&self) -> LogLevel {
        LogLevel::from_u8(self.min_level.load(Ordering::Relaxed))
    }

    pub(crate) fn set_min_level(&self, level: LogLevel) {
        self.min_level.store(level as u8, Ordering::Relaxed);
    }

    pub(crate) fn allows(&self, level: LogLevel) -> bool {
        level >= self.min_level()
    }
}

impl<S> Filter<S> for MinLevelFilter {
    fn enabled(&self, metadata: &Metadata<'_>, _cx: &Context<'_, S>) -> bool {
        self.allows(LogLevel::of(metadata))
    }

    fn callsite_enabled(&self, _metadata: &'static Metadata<'static>) -> Interest {
        Interest::sometimes()
    }
}
