use std::any::{Any, TypeId, type_name};
use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use parking_lot::RwLock;
use smallvec::SmallVec;
use tracing::error;

use crate::{Event, Published};

type ErasedHandler = Arc<dyn Fn(&dyn Any) + Send + Sync>;

/// Handlers captured for one dispatch. Most event types have only a few subscribers.
type HandlerSnapshot = SmallVec<[ErasedHandler; 4]>;

/// Handlers per event type, in subscription order.
#[derive(Default)]
pub(crate) struct HandlerRegistry {
    handlers: RwLock<HashMap<TypeId, Vec<ErasedHandler>>>,
}

impl HandlerRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn subscribe<E, H>(&self, handler: H)
    where
        E: Event,
        H: Fn(&Published<E>) + Send + Sync + 'static,
    {
        let erased: ErasedHandler = Arc::new(move |event: &dyn Any| {
            if let Some(event) = event.downcast_ref::<Published<E>>() {
                handler(event);
            }
        });

        self.handlers
            .write()
            .entry(TypeId::of::<E>())
            .or_default()
            .push(erased);
    }

    /// Removes every handler for the event type, returning how many there were.
    pub(crate) fn unsubscribe(&self, type_id: TypeId) -> usize {
        self.handlers
            .write()
            .remove(&type_id)
            .map_or(0, |removed| removed.len())
    }

    pub(crate) fn handler_count(&self, type_id: TypeId) -> usize {
        self.handlers.read().get(&type_id).map_or(0, Vec::len)
    }

    /// Invokes every handler registered for the event's type, in subscription order.
    ///
    /// `event` is the `Published<E>` for the event type `E` that `type_id` identifies.
    ///
    /// The handlers are copied out under the read lock and invoked after it is released, so
    /// handlers may themselves subscribe, unsubscribe or publish. A panicking handler is logged
    /// and skipped; the remaining handlers still run.
    ///
    /// Returns the number of handlers that panicked.
    pub(crate) fn dispatch(
        &self,
        type_id: TypeId,
        type_name: &'static str,
        event: &dyn Any,
    ) -> usize {
        let snapshot: HandlerSnapshot = match self.handlers.read().get(&type_id) {
            Some(handlers) => handlers.iter().cloned().collect(),
            None => return 0,
        };

        let mut failures = 0_usize;

        for (handler_index, handler) in snapshot.iter().enumerate() {
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| handler(event))) {
                failures = failures.saturating_add(1);

                error!(
                    event_type = type_name,
                    handler_index,
                    panic_message = %format_panic_payload(&*payload),
                    "event handler panicked"
                );
            }
        }

        failures
    }
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("event_types", &self.handlers.read().len())
            .finish_non_exhaustive()
    }
}

fn format_panic_payload(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    struct Tick(u32);
    impl Event for Tick {}

    struct Other;
    impl Event for Other {}

    fn dispatch_tick(registry: &HandlerRegistry, tick: Tick) -> usize {
        registry.dispatch(
            TypeId::of::<Tick>(),
            type_name::<Tick>(),
            &Published::new(tick),
        )
    }

    #[test]
    fn handlers_only_see_their_own_type() {
        let registry = HandlerRegistry::new();
        let seen = Arc::new(AtomicUsize::new(0));

        registry.subscribe::<Tick, _>({
            let seen = Arc::clone(&seen);
            move |tick| {
                seen.fetch_add(usize::try_from(tick.0).unwrap(), Ordering::Relaxed);
            }
        });

        dispatch_tick(&registry, Tick(5));
        registry.dispatch(
            TypeId::of::<Other>(),
            type_name::<Other>(),
            &Published::new(Other),
        );

        assert_eq!(seen.load(Ordering::Relaxed), 5);
    }

    #[test]
    fn unsubscribe_reports_removed_count() {
        let registry = HandlerRegistry::new();

        registry.subscribe::<Tick, _>(|_| {});
        registry.subscribe::<Tick, _>(|_| {});

        assert_eq!(registry.handler_count(TypeId::of::<Tick>()), 2);
        assert_eq!(registry.unsubscribe(TypeId::of::<Tick>()), 2);
        assert_eq!(registry.unsubscribe(TypeId::of::<Tick>()), 0);
        assert_eq!(registry.handler_count(TypeId::of::<Tick>()), 0);
    }

    #[test]
    fn panicking_handler_is_counted_and_skipped() {
        let registry = HandlerRegistry::new();
        let after = Arc::new(AtomicUsize::new(0));

        registry.subscribe::<Tick, _>(|_| panic!("bad handler"));
        registry.subscribe::<Tick, _>({
            let after = Arc::clone(&after);
            move |_| {
                after.fetch_add(1, Ordering::Relaxed);
            }
        });

        assert_eq!(dispatch_tick(&registry, Tick(1)), 1);
        assert_eq!(after.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn handler_may_subscribe_during_dispatch() {
        let registry = Arc::new(HandlerRegistry::new());
        let calls = Arc::new(AtomicUsize::new(0));

        registry.subscribe::<Tick, _>({
            let registry = Arc::clone(&registry);
            let calls = Arc::clone(&calls);
            move |_| {
                let calls = Arc::clone(&calls);
                registry.subscribe::<Tick, _>(move |_| {
                    calls.fetch_add(1, Ordering::Relaxed);
                });
            }
        });

        // The handler added during the first dispatch is not part of that dispatch.
        dispatch_tick(&registry, Tick(0));
        assert_eq!(calls.load(Ordering::Relaxed), 0);

        dispatch_tick(&registry, Tick(0));
        assert_eq!(calls.load(Ordering::Relaxed), 1);

        // The first handler holds the registry; removing it breaks the cycle.
        registry.unsubscribe(TypeId::of::<Tick>());
    }
}
