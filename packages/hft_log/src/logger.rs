use std::any::type_name;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::{fmt, io};

use tracing::Dispatch;
use tracing::dispatcher::{self, DefaultGuard};
use tracing_appender::non_blocking::{NonBlockingBuilder, WorkerGuard};
use tracing_subscriber::Layer as _;
use tracing_subscriber::layer::SubscriberExt as _;

use crate::{Error, LineFormat, LogLevel, MinLevelFilter, Result};

const WRITER_THREAD_NAME: &str = "hft-log-writer";

/// Where log lines are written.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub enum LogOutput {
    /// Standard output.
    #[default]
    Console,

    /// A file, created if missing and appended to otherwise.
    File(PathBuf),
}

/// Settings for creating a [`Logger`].
#[derive(Clone, Debug, Default)]
pub struct LoggerConfig {
    min_level: LogLevel,
    output: LogOutput,
}

impl LoggerConfig {
    /// Console output at [`LogLevel::Info`] and above.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the least severe level that is written.
    #[must_use]
    pub fn min_level(mut self, level: LogLevel) -> Self {
        self.min_level = level;
        self
    }

    /// Sets where log lines are written.
    #[must_use]
    pub fn output(mut self, output: LogOutput) -> Self {
        self.output = output;
        self
    }

    /// Shorthand for writing to a file.
    #[must_use]
    pub fn file(self, path: impl Into<PathBuf>) -> Self {
        self.output(LogOutput::File(path.into()))
    }
}

/// A `tracing` subscriber that writes formatted lines on a background thread.
///
/// Events are filtered by level and formatted on the thread that emits them, then handed to a
/// dedicated writer thread so the emitting thread never waits for I/O. Lines look like this:
///
/// ```text
/// 2024-05-01 14:03:07.412 [INFO] [strategy-1] order accepted order_id=17 (src/engine.rs:88)
/// ```
///
/// Code emits events with the regular `tracing` macros and [`fatal!`][crate::fatal]. A logger
/// only receives them while it is the active subscriber: install it for the whole process with
/// [`install_global()`][Self::install_global], for one thread with
/// [`set_default()`][Self::set_default], or for one closure with [`in_scope()`][Self::in_scope].
///
/// Dropping the logger waits until every line it accepted has been written.
///
/// # Example
///
/// ```rust
/// use hft_log::{LogLevel, Logger, LoggerConfig};
///
/// let logger = Logger::new(&LoggerConfig::new().min_level(LogLevel::Debug)).unwrap();
///
/// logger.in_scope(|| {
///     tracing::debug!(symbol = "ETHUSD", "subscribed");
///     tracing::trace!("not written");
/// });
/// ```
pub struct Logger {
    dispatch: Dispatch,
    filter: MinLevelFilter,
    output: LogOutput,

    // Dropped last; flushes the writer thread.
    _writer_guard: WorkerGuard,
}

impl Logger {
    /// Creates a logger and starts its writer thread.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the output is a file that cannot be opened for appending.
    pub fn new(config: &LoggerConfig) -> Result<Self> {
        let builder = NonBlockingBuilder::default()
            .lossy(false)
            .thread_name(WRITER_THREAD_NAME);

        let (writer, writer_guard) = match &config.output {
            LogOutput::Console => builder.finish(io::stdout()),
            LogOutput::File(path) => builder.finish(open_for_append(path)?),
        };

        let filter = MinLevelFilter::new(config.min_level);

        let layer = tracing_subscriber::fmt::layer()
            .event_format(LineFormat)
            .with_writer(writer)
            .with_filter(filter.clone());

        let dispatch = Dispatch::new(tracing_subscriber::registry().with(layer));

        Ok(Self {
            dispatch,
            filter,
            output: config.output.clone(),
            _writer_guard: writer_guard,
        })
    }

    /// The subscriber, for use with the `tracing::dispatcher` functions directly.
    #[must_use]
    pub fn dispatch(&self) -> &Dispatch {
        &self.dispatch
    }

    /// Makes this logger the subscriber for every thread that has no scoped subscriber.
    ///
    /// This can be done once per process. The logger must be kept alive for as long as lines
    /// should be written; once it is dropped, later events are discarded.
    ///
    /// # Errors
    ///
    /// Returns [`Error::GlobalAlreadyInstalled`] if a global subscriber was installed before.
    pub fn install_global(&self) -> Result<()> {
        dispatcher::set_global_default(self.dispatch.clone())
            .map_err(|_| Error::GlobalAlreadyInstalled)
    }

    /// Makes this logger the subscriber for the current thread until the guard is dropped.
    #[must_use = "the logger is only active until the guard is dropped"]
    pub fn set_default(&self) -> DefaultGuard {
        dispatcher::set_default(&self.dispatch)
    }

    /// Runs `f` with this logger as the subscriber for the current thread.
    pub fn in_scope<R>(&self, f: impl FnOnce() -> R) -> R {
        dispatcher::with_default(&self.dispatch, f)
    }

    /// The least severe level currently written.
    #[must_use]
    pub fn min_level(&self) -> LogLevel {
        self.filter.min_level()
    }

    /// Changes the least severe level that is written. Takes effect immediately on all threads.
    pub fn set_min_level(&self, level: LogLevel) {
        self.filter.set_min_level(level);
    }

    /// Whether events at `level` are currently written.
    #[must_use]
    pub fn is_enabled(&self, level: LogLevel) -> bool {
        self.filter.allows(level)
    }

    /// Where this logger writes.
    #[must_use]
    pub fn output(&self) -> &LogOutput {
        &self.output
    }
}

impl fmt::Debug for Logger {
    #[cfg_attr(test, mutants::skip)] // No API contract.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("min_level", &self.min_level())
            .field("output", &self.output)
            .finish_non_exhaustive()
    }
}

fn open_for_append(path: &Path) -> Result<File> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })
}
