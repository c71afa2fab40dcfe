use std::any::type_name;
use std::fmt;
use std::marker::PhantomData;
use std::ptr::NonNull;
use std::sync::atomic::{AtomicU32, AtomicU64, AtomicUsize, Ordering};

use crate::arena::{MAX_NODES, NO_NODE, NodeArena};
use crate::{Error, Result, Slot};

/// Identifies pools so that a slot cannot be returned to a pool it did not come from.
static NEXT_POOL_ID: AtomicU64 = AtomicU64::new(1);

/// A thread-safe pool of storage slots for values of one type, built on a lock-free freelist.
///
/// [`allocate()`][Self::allocate] pops the head of an atomic freelist. When the freelist is empty
/// it creates a brand-new node instead of waiting for another thread to return one.
/// [`deallocate()`][Self::deallocate] pushes the slot's node back onto the head. Both use
/// compare-and-swap retry loops: some thread always makes progress under contention, although an
/// individual caller may retry any number of times.
///
/// Nodes live in a segmented arena and are never released while the pool is alive, so a thread
/// holding a stale view of the freelist can still safely read the node it points at. The freelist
/// head stores a version tag next to the node index; every successful update bumps the tag, so a
/// compare-and-swap based on a stale head fails even if the same node is back on top by then.
///
/// The pool does not construct or drop values. Write into the [`Slot`] after allocating and drop
/// the value (if needed) before deallocating. Slots borrow the pool, so the pool outlives every
/// slot it hands out. Values left in slots that were never returned are leaked when the pool is
/// dropped.
///
/// # Example
///
/// ```rust
/// use std::thread;
///
/// use hft_pools::LockFreeObjectPool;
///
/// let pool = LockFreeObjectPool::<String>::with_capacity(16).unwrap();
///
/// let mut slot = thread::scope(|scope| {
///     scope
///         .spawn(|| {
///             let mut slot = pool.allocate().unwrap();
///             slot.write("from another thread".to_string());
///             slot
///         })
///         .join()
///         .unwrap()
/// });
///
/// // SAFETY: The other thread wrote a value into the slot.
/// assert_eq!(unsafe { slot.assume_init_ref() }, "from another thread");
///
/// // SAFETY: The slot holds a value that we no longer need.
/// unsafe { slot.assume_init_drop() };
/// pool.deallocate(slot);
/// ```
pub struct LockFreeObjectPool<T> {
    arena: NodeArena<T>,

    /// Freelist head: the upper 32 bits are a version tag, the lower 32 bits the link to the
    /// first free node (`index + 1`, or zero for an empty list).
    head: AtomicU64,

    /// Number of node indices handed out by the arena so far.
    node_count: AtomicU32,

    /// Approximate number of nodes on the freelist. Incremented before a push becomes visible and
    /// decremented after a pop succeeds, so it never underflows.
    free_count: AtomicUsize,

    pool_id: u64,

    _values: PhantomData<T>,
}

// SAFETY: Values only move between threads through slots, which require `T: Send` themselves.
// The pool's own state is all atomics.
unsafe impl<T: Send> Send for LockFreeObjectPool<T> {}
// SAFETY: As above; sharing the pool lets threads exchange slots, which only moves values.
unsafe impl<T: Send> Sync for LockFreeObjectPool<T> {}

impl<T> LockFreeObjectPool<T> {
    /// Creates an empty pool. The first allocation creates the first node.
    #[must_use]
    pub fn new() -> Self {
        Self {
            arena: NodeArena::new(),
            head: AtomicU64::new(pack(NO_NODE, 0)),
            node_count: AtomicU32::new(0),
            free_count: AtomicUsize::new(0),
            pool_id: NEXT_POOL_ID.fetch_add(1, Ordering::Relaxed),
            _values: PhantomData,
        }
    }

    /// Creates a pool with `capacity` nodes already on the freelist.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage for the nodes cannot be allocated.
    pub fn with_capacity(capacity: usize) -> Result<Self> {
        let pool = Self::new();

        for _ in 0..capacity {
            let index = pool.create_node()?;
            pool.push(index);
        }

        Ok(pool)
    }

    /// Number of nodes the pool has created, whether handed out or free.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.node_count.load(Ordering::Relaxed) as usize
    }

    /// Number of nodes on the freelist.
    ///
    /// This is a snapshot that may be stale by the time the caller looks at it.
    #[must_use]
    pub fn available(&self) -> usize {
        self.free_count.load(Ordering::Relaxed)
    }

    /// Takes a slot from the freelist or, if the freelist is empty, creates a new one.
    ///
    /// Never blocks waiting for another thread to return a slot.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AllocationFailure`] if a new node was needed and its storage could not be
    /// allocated, or [`Error::CapacityExceeded`] if the pool cannot address any more nodes.
    pub fn allocate(&self) -> Result<Slot<'_, T>> {
        let index = match self.pop() {
            Some(index) => index,
            None => self.create_node()?,
        };

        let node = self.arena.node(index);
        let ptr = NonNull::new(node.value.get().cast::<T>())
            .expect("pointers to fields of a live node are never null");

        Ok(Slot::new(ptr, index, self.pool_id))
    }

    /// Returns a slot to the freelist. Whatever value the slot holds is not dropped.
    ///
    /// # Panics
    ///
    /// Panics if the slot was allocated from a different pool.
    pub fn deallocate(&self, slot: Slot<'_, T>) {
        assert!(
            slot.pool_id() == self.pool_id,
            "slot {} was returned to a pool of {} that did not allocate it",
            slot.index(),
            type_name::<T>()
        );

        self.push(slot.index());
    }

    fn create_node(&self) -> Result<u32> {
        let index = self
            .node_count
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |count| {
                (count < MAX_NODES).then(|| count.wrapping_add(1))
            })
            .map_err(|_| Error::CapacityExceeded {
                type_name: type_name::<T>(),
                max_nodes: MAX_NODES as usize,
            })?;

        // If this fails, the index stays claimed but unused; the pool remains consistent.
        self.arena.ensure_node(index)?;

        Ok(index)
    }

    fn pop(&self) -> Option<u32> {
        // Acquire pairs with the Release in `push()`, making the node's link (and anything the
        // previous owner wrote into the value) visible to us.
        let mut head = self.head.load(Ordering::Acquire);

        loop {
            let link = link_of(head);
            if link == NO_NODE {
                return None;
            }

            let index = link.wrapping_sub(1);

            // The node may be popped and pushed again by another thread before our exchange below.
            // In that case the tag has moved on and the exchange fails, so a stale link is harmless.
            let next = self.arena.node(index).next.load(Ordering::Relaxed);
            let new_head = pack(next, tag_of(head).wrapping_add(1));

            match self.head.compare_exchange_weak(
                head,
                new_head,
                Ordering::Acquire,
                Ordering::Acquire,
            ) {
                Ok(_) => {
                    self.free_count.fetch_sub(1, Ordering::Relaxed);
                    return Some(index);
                }
                Err(actual) => head = actual,
            }
        }
    }

    fn push(&self, index: u32) {
        let node = self.arena.node(index);
        let link = index.wrapping_add(1);

        self.free_count.fetch_add(1, Ordering::Relaxed);

        let mut head = self.head.load(Ordering::Relaxed);

        loop {
            node.next.store(link_of(head), Ordering::Relaxed);
            let new_head = pack(link, tag_of(head).wrapping_add(1));

            // Release publishes the link we just stored, plus the caller's writes to the value.
            match self.head.compare_exchange_weak(
                head,
                new_head,
                Ordering::Release,
                Ordering::Relaxed,
            ) {
                Ok(_) => return,
                Err(actual) => head = actual,
            }
        }
    }
}

impl<T> Default for LockFreeObjectPool<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for LockFreeObjectPool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("capacity", &self.capacity())
            .field("available", &self.available())
            .finish_non_exhaustive()
    }
}

fn pack(link: u32, tag: u32) -> u64 {
    (u64::from(tag) << 32) | u64::from(link)
}

#[expect(clippy::cast_possible_truncation, reason = "intentionally taking the low half")]
fn link_of(head: u64) -> u32 {
    head as u32
}

#[expect(clippy::cast_possible_truncation, reason = "the shift leaves only the high half")]
fn tag_of(head: u64) -> u32 {
    (head >> 32) as u32
}
