//! Platform abstraction layer for thread scheduling calls. This is private API.

#[cfg(target_os = "linux")]
mod linux;
#[cfg(target_os = "linux")]
pub(crate) use linux::*;
