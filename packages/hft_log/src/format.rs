use std::fmt;
use std::thread;

use tracing::{Event, Subscriber};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::registry::LookupSpan;

use crate::LogLevel;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// Renders events as `timestamp [LEVEL] [thread] message key=value (file:line)`.
///
/// The timestamp is local time with millisecond precision. The thread is the thread's name if
/// it has one and its ID otherwise. The source location is omitted when the event has none.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct LineFormat;

impl<S, N> FormatEvent<S, N> for LineFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let metadata = event.metadata();

        write!(
            writer,
            "{} [{}] ",
            chrono::Local::now().format(TIMESTAMP_FORMAT),
            LogLevel::of(metadata)
        )?;

        let current = thread::current();
        match current.name() {
            Some(name) => write!(writer, "[{name}] ")?,
            None => write!(writer, "[{:?}] ", current.id())?,
        }

        ctx.field_format().format_fields(writer.by_ref(), event)?;

        if let (Some(file), Some(line)) = (metadata.file(), metadata.line()) {
            write!(writer, " ({file}:{line})")?;
        }

        writeln!(writer)
    }
}
