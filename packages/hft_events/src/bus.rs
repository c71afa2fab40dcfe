use std::any::{Any, TypeId, type_name};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::thread::{self, JoinHandle, ThreadId};
use std::{fmt, mem, panic};

use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use crate::{Event, EventQueue, HandlerRegistry, Published, QueuedEvent};

const DISPATCHER_THREAD_NAME: &str = "hft-event-dispatcher";

/// A publish/subscribe hub that routes events to handlers by the event's type.
///
/// Handlers are closures subscribed for one event type. Publishing a value of that type invokes
/// every handler subscribed for it, in the order they were subscribed. Handlers receive the event
/// wrapped in [`Published`], which carries the time of publication. A handler that panics is
/// logged and skipped without affecting the publisher or the other handlers.
///
/// # Dispatch modes
///
/// In synchronous mode (the default), [`publish()`][Self::publish] invokes the handlers on the
/// calling thread before it returns.
///
/// In asynchronous mode, [`publish()`][Self::publish] only moves the event into a queue and
/// returns. A dedicated dispatcher thread, started the first time asynchronous mode is
/// enabled, takes events off the queue in publication order and invokes their handlers.
/// [`flush()`][Self::flush] waits until every event published before it has been dispatched.
///
/// Switching modes does not flush or reorder queued events. Events published synchronously
/// after switching back may therefore be dispatched before older events still in the queue.
/// Call [`flush()`][Self::flush] before switching if that matters.
///
/// # Shutdown
///
/// [`shutdown()`][Self::shutdown] dispatches everything still queued and stops the dispatcher
/// thread. It is final: once shut down, the bus dispatches every event synchronously on the
/// publishing thread, even if asynchronous mode is enabled. Dropping the bus shuts it down.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicU64, Ordering};
///
/// use hft_events::{Event, EventBus};
///
/// struct PriceUpdate {
///     price_ticks: u64,
/// }
///
/// impl Event for PriceUpdate {}
///
/// let bus = EventBus::new();
/// let last_price = Arc::new(AtomicU64::new(0));
///
/// bus.subscribe::<PriceUpdate, _>({
///     let last_price = Arc::clone(&last_price);
///     move |update| last_price.store(update.price_ticks, Ordering::Relaxed)
/// });
///
/// bus.publish(PriceUpdate { price_ticks: 10_050 });
/// assert_eq!(last_price.load(Ordering::Relaxed), 10_050);
///
/// bus.set_async_mode(true);
/// bus.publish(PriceUpdate { price_ticks: 10_075 });
/// bus.flush();
/// assert_eq!(last_price.load(Ordering::Relaxed), 10_075);
/// ```
pub struct EventBus {
    shared: Arc<Shared>,
    dispatcher: Mutex<DispatcherState>,

    /// Set once when the dispatcher thread starts and kept after it stops.
    dispatcher_thread: OnceLock<ThreadId>,
}

struct Shared {
    registry: HandlerRegistry,
    queue: EventQueue,
    async_mode: AtomicBool,
}

enum DispatcherState {
    NotStarted,
    Running(JoinHandle<()>),
    Stopped,
}

impl EventBus {
    /// Creates a bus in synchronous mode with no handlers.
    #[must_use]
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                registry: HandlerRegistry::new(),
                queue: EventQueue::new(),
                async_mode: AtomicBool::new(false),
            }),
            dispatcher: Mutex::new(DispatcherState::NotStarted),
            dispatcher_thread: OnceLock::new(),
        }
    }

    /// Adds a handler for events of type `E`.
    ///
    /// Handlers accumulate: subscribing twice means both handlers run. A handler subscribed
    /// while an event is being dispatched does not see that event.
    pub fn subscribe<E, H>(&self, handler: H)
    where
        E: Event,
        H: Fn(&Published<E>) + Send + Sync + 'static,
    {
        self.shared.registry.subscribe::<E, H>(handler);
        trace!(event_type = type_name::<E>(), "handler subscribed");
    }

    /// Removes every handler for events of type `E` and returns how many were removed.
    pub fn unsubscribe<E: Event>(&self) -> usize {
        let removed = self.shared.registry.unsubscribe(TypeId::of::<E>());
        trace!(event_type = type_name::<E>(), removed, "handlers unsubscribed");
        removed
    }

    /// Number of handlers currently subscribed for events of type `E`.
    #[must_use]
    pub fn handler_count<E: Event>(&self) -> usize {
        self.shared.registry.handler_count(TypeId::of::<E>())
    }

    /// Delivers an event to every handler subscribed for its type.
    ///
    /// The event is stamped with the current [`hft_time::monotonic_nanos()`] time. In synchronous
    /// mode the handlers have all run when this returns, and the event never leaves the stack. In
    /// asynchronous mode the event is boxed and queued for the dispatcher thread.
    pub fn publish<E: Event>(&self, event: E) {
        let published = Published::new(event);

        if self.shared.async_mode.load(Ordering::Acquire) {
            match self.shared.queue.push(QueuedEvent::new(published)) {
                Ok(()) => {}
                Err(rejected) => dispatch_queued(&self.shared.registry, &rejected),
            }

            return;
        }

        dispatch(
            &self.shared.registry,
            TypeId::of::<E>(),
            type_name::<E>(),
            &published,
        );
    }

    /// Constructs an event of type `E` from `args` and publishes it.
    pub fn emit<E, A>(&self, args: A)
    where
        E: Event + From<A>,
    {
        self.publish(E::from(args));
    }

    /// Switches between synchronous and asynchronous dispatch.
    ///
    /// Enabling asynchronous mode for the first time starts the dispatcher thread.
    ///
    /// Switching does not flush or reorder events that are already queued; the dispatcher keeps
    /// draining them after a switch back to synchronous mode. There is no ordering guarantee
    /// between events published before and after a switch.
    pub fn set_async_mode(&self, enabled: bool) {
        if enabled {
            self.ensure_dispatcher_started();
        }

        // Release pairs with the Acquire in publish(): a publisher that sees the flag also
        // sees the dispatcher started.
        self.shared.async_mode.store(enabled, Ordering::Release);

        debug!(enabled, "event bus async mode changed");
    }

    /// Whether events are currently queued for the dispatcher thread rather than dispatched
    /// on the publishing thread.
    #[must_use]
    pub fn is_async(&self) -> bool {
        self.shared.async_mode.load(Ordering::Acquire)
    }

    /// Number of events queued and not yet taken by the dispatcher thread. May be stale.
    #[must_use]
    pub fn pending_events(&self) -> usize {
        self.shared.queue.len()
    }

    /// Blocks until every event published asynchronously before this call has been dispatched.
    ///
    /// Returns immediately if nothing is queued. Called from a handler running on the dispatcher
    /// thread, it returns immediately as well, because that thread cannot wait for itself.
    pub fn flush(&self) {
        if self.is_dispatcher_thread() {
            warn!("flush() called from an event handler on the dispatcher thread, ignoring");
            return;
        }

        self.shared.queue.wait_for_dispatch();
    }

    /// Dispatches every queued event, stops the dispatcher thread and waits for it to exit.
    ///
    /// Calling this more than once is harmless.
    pub fn shutdown(&self) {
        if self.shared.queue.close() {
            debug!(
                pending_events = self.shared.queue.len(),
                "event bus shutting down"
            );
        }

        let previous = mem::replace(&mut *self.dispatcher.lock(), DispatcherState::Stopped);

        if let DispatcherState::Running(handle) = previous {
            if handle.thread().id() == thread::current().id() {
                // Shutdown from inside a handler. The dispatcher exits on its own once the
                // queue is drained.
                return;
            }

            if let Err(payload) = handle.join() {
                // Handlers run inside a panic trap, so this is a bug in the dispatcher itself.
                panic::resume_unwind(payload);
            }
        }
    }

    fn ensure_dispatcher_started(&self) {
        let mut state = self.dispatcher.lock();

        if !matches!(*state, DispatcherState::NotStarted) {
            return;
        }

        let shared = Arc::clone(&self.shared);

        let handle = thread::Builder::new()
            .name(DISPATCHER_THREAD_NAME.to_string())
            .spawn(move || {
                debug!("event dispatcher started");
                dispatcher_loop(&shared);
                debug!("event dispatcher exiting");
            })
            .expect("failed to spawn event dispatcher thread: thread spawning failure is not supported");

        // Only the NotStarted state gets here and it never comes back, so this is the first set.
        _ = self.dispatcher_thread.set(handle.thread().id());

        *state = DispatcherState::Running(handle);
    }

    fn is_dispatcher_thread(&self) -> bool {
        self.dispatcher_thread.get() == Some(&thread::current().id())
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for EventBus {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl fmt::Debug for EventBus {
    #[cfg_attr(test, mutants::skip)] // No API contract.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("registry", &self.shared.registry)
            .field("queue", &self.shared.queue)
            .field("async_mode", &self.is_async())
            .finish_non_exhaustive()
    }
}

fn dispatcher_loop(shared: &Shared) {
    while let Some(event) = shared.queue.pop_blocking() {
        dispatch_queued(&shared.registry, &event);
        shared.queue.mark_dispatched();
    }
}

fn dispatch_queued(registry: &HandlerRegistry, event: &QueuedEvent) {
    dispatch(registry, event.type_id, event.type_name, &*event.payload);
}

fn dispatch(
    registry: &HandlerRegistry,
    type_id: TypeId,
    type_name: &'static str,
    published: &dyn Any,
) {
    let failures = registry.dispatch(type_id, type_name, published);

    trace!(event_type = type_name, failures, "event dispatched");
}
