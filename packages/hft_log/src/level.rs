use std::fmt;
use std::str::FromStr;

use tracing::{Level, Metadata};

use crate::{Error, FATAL_TARGET};

/// Severity of a log message, from least to most severe.
///
/// The first five levels map one-to-one onto [`tracing::Level`]. [`Fatal`][Self::Fatal] is an
/// error-level event emitted through [`fatal!`][crate::fatal], which tags it with a dedicated
/// target so it can be told apart from ordinary errors.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[repr(u8)]
pub enum LogLevel {
    /// Very detailed diagnostics.
    Trace = 0,

    /// Diagnostics useful when investigating a problem.
    Debug = 1,

    /// Normal operational messages.
    #[default]
    Info = 2,

    /// Something unexpected that the system can cope with.
    Warn = 3,

    /// An operation failed.
    Error = 4,

    /// The system cannot continue.
    Fatal = 5,
}

impl LogLevel {
    /// The upper-case label written into log lines.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Trace => "TRACE",
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warn => "WARN",
            Self::Error => "ERROR",
            Self::Fatal => "FATAL",
        }
    }

    /// The level of a `tracing` event or span.
    #[must_use]
    pub fn of(metadata: &Metadata<'_>) -> Self {
        match *metadata.level() {
            Level::TRACE => Self::Trace,
            Level::DEBUG => Self::Debug,
            Level::INFO => Self::Info,
            Level::WARN => Self::Warn,
            // Only ERROR remains.
            _ if metadata.target() == FATAL_TARGET => Self::Fatal,
            _ => Self::Error,
        }
    }

    pub(crate) fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Trace,
            1 => Self::Debug,
            2 => Self::Info,
            3 => Self::Warn,
            4 => Self::Error,
            _ => Self::Fatal,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = Error;

    /// Parses a level name, ignoring case.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "TRACE" => Ok(Self::Trace),
            "DEBUG" => Ok(Self::Debug),
            "INFO" => Ok(Self::Info),
            "WARN" | "WARNING" => Ok(Self::Warn),
            "ERROR" => Ok(Self::Error),
            "FATAL" => Ok(Self::Fatal),
            _ => Err(Error::UnknownLevel {
                value: value.to_string(),
            }),
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn levels_are_ordered_by_severity() {
        assert!(LogLevel::Trace < LogLevel::Debug);
        assert!(LogLevel::Debug < LogLevel::Info);
        assert!(LogLevel::Info < LogLevel::Warn);
        assert!(LogLevel::Warn < LogLevel::Error);
        assert!(LogLevel::Error < LogLevel::Fatal);
    }

    #[test]
    fn u8_representation_round_trips() {
        for level in [
            LogLevel::Trace,
            LogLevel::Debug,
            LogLevel::Info,
            LogLevel::Warn,
            LogLevel::Error,
            LogLevel::Fatal,
        ] {
            assert_eq!(LogLevel::from_u8(level as u8), level);
        }
    }

    #[test]
    fn parsing_ignores_case() {
        assert_eq!("info".parse::<LogLevel>().unwrap(), LogLevel::Info);
        assert_eq!("Fatal".parse::<LogLevel>().unwrap(), LogLevel::Fatal);
        assert_eq!(" warning ".parse::<LogLevel>().unwrap(), LogLevel::Warn);
        assert!("verbose".parse::<LogLevel>().is_err());
    }

    #[test]
    fn display_uses_upper_case_label() {
        assert_eq!(LogLevel::Warn.to_string(), "WARN");
    }
}
