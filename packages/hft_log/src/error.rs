use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur when setting up logging.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The log file could not be opened for appending.
    #[error("log file {} could not be opened", path.display())]
    Io {
        /// The log file.
        path: PathBuf,

        /// The underlying I/O error.
        source: io::Error,
    },

    /// A global default subscriber has already been installed in this process.
    #[error("a global logger has already been installed")]
    GlobalAlreadyInstalled,

    /// Text that does not name a log level.
    #[error("'{value}' is not a log level")]
    UnknownLevel {
        /// The text that was parsed.
        value: String,
    },
}

/// A specialized `Result` type for logging setup, returning the crate's
/// [`Error`] type as the error value.
pub(crate) type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::fmt::Debug;

    use static_assertions::assert_impl_all;

    use super::*;

    assert_impl_all!(Error: Send, Sync, Debug);

    #[test]
    fn unknown_level_quotes_input() {
        let error = Error::UnknownLevel {
            value: "LOUD".to_string(),
        };

        assert_eq!(error.to_string(), "'LOUD' is not a log level");
    }
}
