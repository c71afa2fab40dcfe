#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Typed key/value configuration for trading components.
//!
//! A [`Config`] holds string, integer, float and boolean values under string keys. It can be
//! loaded from and saved to a plain `key=value` text file, and is safe to read and update from
//! any number of threads.
//!
//! There is no global instance. The application creates a `Config`, loads it and hands it (or
//! an `Arc` of it) to the components that need it.

mod config;
mod error;
mod value;

pub use config::*;
pub use error::*;
pub use value::*;
