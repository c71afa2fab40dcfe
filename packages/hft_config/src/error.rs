use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur when reading or writing configuration files.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// A configuration file could not be read or written.
    #[error("configuration file {} could not be accessed", path.display())]
    Io {
        /// The file that was being read or written.
        path: PathBuf,

        /// The underlying I/O error.
        source: io::Error,
    },
}

/// A specialized `Result` type for configuration operations, returning the crate's
/// [`Error`] type as the error value.
pub(crate) type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::error::Error as _;
    use std::fmt::Debug;

    use static_assertions::assert_impl_all;

    use super::*;

    assert_impl_all!(Error: Send, Sync, Debug);

    #[test]
    fn io_error_names_file_and_keeps_source() {
        let error = Error::Io {
            path: PathBuf::from("/etc/hft/engine.conf"),
            source: io::Error::from(io::ErrorKind::NotFound),
        };

        assert_eq!(
            error.to_string(),
            "configuration file /etc/hft/engine.conf could not be accessed"
        );
        assert!(error.source().is_some());
    }
}
