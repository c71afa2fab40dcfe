use std::any::{Any, TypeId, type_name};
use std::fmt;
use std::ops::Deref;

use hft_time::monotonic_nanos;

/// Marker for types that can be published on an [`EventBus`][crate::EventBus].
///
/// The concrete type is the routing key: handlers subscribed for `E` receive every published
/// value of type `E` and nothing else. Events must be `Send` because in asynchronous mode they
/// are moved to the dispatcher thread.
///
/// # Example
///
/// ```rust
/// use hft_events::Event;
///
/// #[derive(Debug)]
/// struct OrderFilled {
///     order_id: u64,
///     quantity: u32,
/// }
///
/// impl Event for OrderFilled {}
/// ```
pub trait Event: Any + Send {}

/// An event as handlers receive it: the published value plus the moment it was published.
///
/// Dereferences to the event, so handlers can read the event's fields directly.
///
/// ```rust
/// use hft_events::{Event, EventBus};
///
/// struct OrderFilled {
///     quantity: u32,
/// }
///
/// impl Event for OrderFilled {}
///
/// let bus = EventBus::new();
///
/// bus.subscribe::<OrderFilled, _>(|fill| {
///     let age_nanos = hft_time::monotonic_nanos().saturating_sub(fill.timestamp_nanos());
///     println!("{} filled, handled {age_nanos} ns after publishing", fill.quantity);
/// });
///
/// bus.publish(OrderFilled { quantity: 100 });
/// ```
pub struct Published<E> {
    event: E,
    timestamp_nanos: u64,
}

impl<E> Published<E> {
    /// Wraps an event, stamping it with the current monotonic time.
    pub(crate) fn new(event: E) -> Self {
        Self {
            event,
            timestamp_nanos: monotonic_nanos(),
        }
    }

    /// The published event.
    #[must_use]
    pub fn event(&self) -> &E {
        &self.event
    }

    /// When the event was published, in [`hft_time::monotonic_nanos()`] units.
    ///
    /// Events published later on the same thread never carry an earlier timestamp.
    #[must_use]
    pub fn timestamp_nanos(&self) -> u64 {
        self.timestamp_nanos
    }
}

impl<E> Deref for Published<E> {
    type Target = E;

    fn deref(&self) -> &E {
        &self.event
    }
}

impl<E: fmt::Debug> fmt::Debug for Published<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("event", &self.event)
            .field("timestamp_nanos", &self.timestamp_nanos)
            .finish()
    }
}

/// A published event that has been type-erased so that events of any kind can share one queue.
///
/// The payload is a `Published<E>`; `type_id` identifies `E`.
pub(crate) struct QueuedEvent {
    pub(crate) type_id: TypeId,
    pub(crate) type_name: &'static str,
    pub(crate) payload: Box<dyn Any + Send>,
}

impl QueuedEvent {
    pub(crate) fn new<E: Event>(published: Published<E>) -> Self {
        Self {
            type_id: TypeId::of::<E>(),
            type_name: type_name::<E>(),
            payload: Box::new(published),
        }
    }
}

impl fmt::Debug for QueuedEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("type_name", &self.type_name)
            .finish_non_exhaustive()
    }
}
