#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! An in-process event bus that routes events to handlers by type.
//!
//! Any type that implements the [`Event`] marker trait can be published. Handlers are closures
//! subscribed for one event type; publishing a value invokes all handlers subscribed for its
//! type in subscription order.
//!
//! The [`EventBus`] dispatches either synchronously on the publishing thread or asynchronously
//! on a dedicated dispatcher thread that preserves publication order. Handler panics are caught,
//! logged through `tracing` and never reach the publisher.
//!
//! ```rust
//! use hft_events::{Event, EventBus};
//!
//! struct Heartbeat;
//! impl Event for Heartbeat {}
//!
//! struct Fill {
//!     quantity: u32,
//! }
//! impl Event for Fill {}
//!
//! impl From<u32> for Fill {
//!     fn from(quantity: u32) -> Self {
//!         Self { quantity }
//!     }
//! }
//!
//! let bus = EventBus::new();
//! bus.subscribe::<Fill, _>(|fill| println!("filled {}", fill.quantity));
//!
//! bus.emit::<Fill, _>(100);
//! bus.publish(Heartbeat); // No handlers, nothing happens.
//!
//! assert_eq!(bus.handler_count::<Fill>(), 1);
//! assert_eq!(bus.unsubscribe::<Fill>(), 1);
//! ```

mod bus;
mod event;
mod queue;
mod registry;

pub use bus::*;
pub use event::*;
pub(crate) use queue::*;
pub(crate) use registry::*;
