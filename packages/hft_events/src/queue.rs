use std::any::type_name;
use std::collections::VecDeque;
use std::fmt;

use parking_lot::{Condvar, Mutex};

use crate::QueuedEvent;

/// The FIFO between publishers and the dispatcher thread.
///
/// Besides the events themselves, the queue counts how many events were ever enqueued and how
/// many have finished dispatching. A flush waits for the second counter to reach the value the
/// first had when the flush started, which is exactly "every event published before the flush".
#[derive(Default)]
pub(crate) struct EventQueue {
    state: Mutex<QueueState>,

    /// Signaled when an event is enqueued or the queue is closed.
    available: Condvar,

    /// Signaled when an event has finished dispatching.
    progress: Condvar,
}

#[derive(Default)]
struct QueueState {
    events: VecDeque<QueuedEvent>,
    enqueued: u64,
    dispatched: u64,
    closed: bool,
}

impl EventQueue {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Adds an event at the back of the queue.
    ///
    /// A closed queue hands the event back so the caller can deliver it some other way.
    pub(crate) fn push(&self, event: QueuedEvent) -> Result<(), QueuedEvent> {
        let mut state = self.state.lock();

        if state.closed {
            return Err(event);
        }

        state.events.push_back(event);
        state.enqueued = state.enqueued.wrapping_add(1);
        drop(state);

        self.available.notify_one();
        Ok(())
    }

    /// Blocks until an event is available or the queue is both closed and empty.
    pub(crate) fn pop_blocking(&self) -> Option<QueuedEvent> {
        let mut state = self.state.lock();

        loop {
            if let Some(event) = state.events.pop_front() {
                return Some(event);
            }

            if state.closed {
                return None;
            }

            self.available.wait(&mut state);
        }
    }

    /// Records that an event obtained from [`pop_blocking()`][Self::pop_blocking] has been
    /// fully dispatched.
    pub(crate) fn mark_dispatched(&self) {
        let mut state = self.state.lock();
        state.dispatched = state.dispatched.wrapping_add(1);
        drop(state);

        self.progress.notify_all();
    }

    /// Blocks until every event enqueued before this call has been dispatched.
    pub(crate) fn wait_for_dispatch(&self) {
        let mut state = self.state.lock();
        let target = state.enqueued;

        while state.dispatched < target {
            self.progress.wait(&mut state);
        }
    }

    /// Stops accepting events and wakes the dispatcher so it can drain and exit.
    pub(crate) fn close(&self) -> bool {
        let mut state = self.state.lock();

        if state.closed {
            return false;
        }

        state.closed = true;
        drop(state);

        self.available.notify_all();
        true
    }

    pub(crate) fn len(&self) -> usize {
        self.state.lock().events.len()
    }
}

impl fmt::Debug for EventQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();

        f.debug_struct(type_name::<Self>())
            .field("len", &state.events.len())
            .field("enqueued", &state.enqueued)
            .field("dispatched", &state.dispatched)
            .field("closed", &state.closed)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use testing::with_watchdog;

    use super::*;
    use crate::Event;
    use crate::event::Published;

    struct Ping(u32);
    impl Event for Ping {}

    #[test]
    fn closed_queue_hands_event_back() {
        let queue = EventQueue::new();
        queue.close();

        let rejected = queue.push(QueuedEvent::new(Published::new(Ping(9)))).unwrap_err();
        assert_eq!(rejected.payload.downcast_ref::<Ping>().unwrap().0, 9);
    }

    #[test]
    fn closed_queue_still_drains() {
        let queue = EventQueue::new();

        queue.push(QueuedEvent::new(Published::new(Ping(1)))).unwrap();
        queue.push(QueuedEvent::new(Published::new(Ping(2)))).unwrap();
        queue.close();

        assert_eq!(queue.pop_blocking().unwrap().payload.downcast_ref::<Ping>().unwrap().0, 1);
        assert_eq!(queue.pop_blocking().unwrap().payload.downcast_ref::<Ping>().unwrap().0, 2);
        assert!(queue.pop_blocking().is_none());
    }

    #[test]
    fn wait_for_dispatch_returns_immediately_when_nothing_was_enqueued() {
        let queue = EventQueue::new();
        queue.wait_for_dispatch();
    }

    #[cfg_attr(miri, ignore)]
    #[test]
    fn wait_for_dispatch_waits_for_in_flight_event() {
        with_watchdog(|| {
            let queue = Arc::new(EventQueue::new());
            queue.push(QueuedEvent::new(Published::new(Ping(0)))).unwrap();

            // Taken off the queue but not yet dispatched: the length is zero while the
            // event is still in flight.
            let in_flight = queue.pop_blocking().unwrap();
            assert_eq!(queue.len(), 0);

            let consumer = thread::spawn({
                let queue = Arc::clone(&queue);
                move || {
                    drop(in_flight);
                    thread::sleep(std::time::Duration::from_millis(20));
                    queue.mark_dispatched();
                }
            });

            queue.wait_for_dispatch();
            consumer.join().unwrap();
        });
    }
}
