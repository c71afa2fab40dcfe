#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Leveled logging for trading components.
//!
//! Components log through the ordinary [`tracing`] macros. This crate provides the [`Logger`]
//! that receives those events: it filters them against a minimum [`LogLevel`] that can be
//! changed at runtime, formats each one as a single line with timestamp, level, thread name
//! and source location, and writes the lines to the console or a file from a background
//! thread.
//!
//! On top of the five `tracing` levels there is a sixth, [`LogLevel::Fatal`], emitted with the
//! [`fatal!`] macro for conditions the system cannot continue from.
//!
//! There is no implicit global logger. The application creates one and decides whether to
//! install it process-wide or only for some threads.
//!
//! ```rust
//! use hft_log::{LogLevel, Logger, LoggerConfig, fatal};
//!
//! let logger = Logger::new(&LoggerConfig::new().min_level(LogLevel::Warn)).unwrap();
//!
//! logger.in_scope(|| {
//!     tracing::info!("suppressed");
//!     tracing::warn!(latency_us = 850, "slow acknowledgement");
//!     fatal!("exchange connection lost");
//! });
//! ```

mod error;
mod filter;
mod format;
mod level;
mod logger;

pub use error::*;
pub(crate) use filter::*;
pub(crate) use format::*;
pub use level::*;
pub use logger::*;

/// Target of the events emitted by [`fatal!`], which is how they are recognized as
/// [`LogLevel::Fatal`].
pub const FATAL_TARGET: &str = "hft_log::fatal";

/// Emits an event at [`LogLevel::Fatal`].
///
/// Accepts the same arguments as [`tracing::error!`] except for `target:`, which it sets itself.
///
/// ```rust
/// use hft_log::fatal;
///
/// fatal!(venue = "XLON", "all sessions down");
/// ```
#[macro_export]
macro_rules! fatal {
    ($($arg:tt)+) => {
        $crate::__private::tracing::error!(target: $crate::FATAL_TARGET, $($arg)+)
    };
}

#[doc(hidden)]
pub mod __private {
    pub use tracing;
}
