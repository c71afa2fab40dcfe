use std::alloc::{Layout, alloc, dealloc};
use std::any::type_name;
use std::fmt;
use std::ptr::NonNull;

use scopeguard::ScopeGuard;

use crate::{Error, Result};

/// Default size in bytes of one storage block of an [`ObjectPool`].
pub const DEFAULT_BLOCK_SIZE: usize = 4096;

/// A single-threaded pool of storage slots for values of one type.
///
/// Storage is obtained from the operating system in blocks of `BLOCK_SIZE` bytes, each block
/// contributing `BLOCK_SIZE / size_of::<T>()` slots. Unused slots are kept on a freelist and
/// handed out again by [`allocate()`][Self::allocate], so a warmed-up pool serves allocations
/// without touching the global allocator.
///
/// The pool hands out raw storage. It does not construct or drop values except through the
/// [`construct()`][Self::construct] and [`destroy()`][Self::destroy] convenience pair. The pool
/// never shrinks; blocks are released only when the pool is dropped, and values still alive in
/// the pool at that point are leaked rather than dropped.
///
/// The pool requires `&mut self` for every operation. Use
/// [`LockFreeObjectPool`][crate::LockFreeObjectPool] when slots need to be obtained from multiple
/// threads.
///
/// # Example
///
/// ```rust
/// use hft_pools::ObjectPool;
///
/// let mut pool = ObjectPool::<u64>::new().unwrap();
/// let capacity = pool.capacity();
///
/// let item = pool.construct(42).unwrap();
/// // SAFETY: The slot was initialized by `construct()` and is not aliased.
/// assert_eq!(unsafe { *item.as_ref() }, 42);
/// assert_eq!(pool.available(), capacity - 1);
///
/// // SAFETY: The slot came from this pool and holds a live value.
/// unsafe { pool.destroy(item) };
/// assert_eq!(pool.available(), capacity);
/// ```
pub struct ObjectPool<T, const BLOCK_SIZE: usize = DEFAULT_BLOCK_SIZE> {
    /// First slot of every block we have obtained, in allocation order.
    blocks: Vec<NonNull<T>>,

    /// Slots that are not currently handed out. Reuse order is unspecified.
    free_list: Vec<NonNull<T>>,
}

// SAFETY: The pool exclusively owns its blocks and the values in them are only reachable through
// pointers the caller obtained from the pool. Moving the pool to another thread moves ownership of
// any values left in the blocks, which is fine as long as those values can be sent.
unsafe impl<T: Send, const BLOCK_SIZE: usize> Send for ObjectPool<T, BLOCK_SIZE> {}

impl<T, const BLOCK_SIZE: usize> ObjectPool<T, BLOCK_SIZE> {
    const SLOTS_PER_BLOCK: usize = match BLOCK_SIZE.checked_div(size_of::<T>()) {
        Some(slots) => slots,
        None => 0,
    };

    /// Creates a pool and allocates its first block.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AllocationFailure`] if the first block cannot be allocated.
    ///
    /// # Panics
    ///
    /// Panics if `T` is zero-sized or larger than `BLOCK_SIZE`.
    pub fn new() -> Result<Self> {
        assert!(
            size_of::<T>() > 0,
            "ObjectPool must have non-zero item size"
        );
        assert!(
            Self::SLOTS_PER_BLOCK > 0,
            "ObjectPool block of {BLOCK_SIZE} bytes cannot hold even one {}",
            type_name::<T>()
        );

        let mut pool = Self {
            blocks: Vec::new(),
            free_list: Vec::with_capacity(Self::SLOTS_PER_BLOCK),
        };

        pool.allocate_block()?;

        Ok(pool)
    }

    /// Number of slots each block contributes to the pool.
    #[must_use]
    pub const fn slots_per_block() -> usize {
        Self::SLOTS_PER_BLOCK
    }

    /// Total number of slots in the pool, whether handed out or free.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.blocks
            .len()
            .checked_mul(Self::SLOTS_PER_BLOCK)
            .expect("capacity is bounded by allocated memory, so it cannot overflow")
    }

    /// Number of slots that can be allocated without growing the pool.
    #[must_use]
    pub fn available(&self) -> usize {
        self.free_list.len()
    }

    /// Takes a slot from the freelist, growing the pool by one block if the freelist is empty.
    ///
    /// The returned slot is uninitialized. Write a value into it before reading from it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AllocationFailure`] if the pool needed to grow and the allocation failed.
    pub fn allocate(&mut self) -> Result<NonNull<T>> {
        if self.free_list.is_empty() {
            self.allocate_block()?;
        }

        Ok(self
            .free_list
            .pop()
            .expect("a fresh block always contributes at least one slot"))
    }

    /// Returns a slot to the freelist without dropping whatever value it holds.
    ///
    /// # Safety
    ///
    /// The slot must have been returned by [`allocate()`][Self::allocate] or
    /// [`construct()`][Self::construct] on this pool and must not have been deallocated since.
    /// Any value still in the slot is leaked.
    pub unsafe fn deallocate(&mut self, slot: NonNull<T>) {
        debug_assert!(
            self.owns(slot),
            "deallocate() received a slot that does not belong to this pool of {}",
            type_name::<T>()
        );
        debug_assert!(
            !self.free_list.contains(&slot),
            "deallocate() received a slot of {} that is already free",
            type_name::<T>()
        );

        self.free_list.push(slot);
    }

    /// Allocates a slot and moves `value` into it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AllocationFailure`] if the pool needed to grow and the allocation failed.
    /// The value is dropped in that case.
    pub fn construct(&mut self, value: T) -> Result<NonNull<T>> {
        self.construct_with(|| value)
    }

    /// Allocates a slot and fills it with the value returned by `f`.
    ///
    /// If `f` panics, the slot is returned to the freelist before the panic continues, so a
    /// failed construction does not leak capacity.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AllocationFailure`] if the pool needed to grow and the allocation failed.
    /// `f` is not called in that case.
    pub fn construct_with<F>(&mut self, f: F) -> Result<NonNull<T>>
    where
        F: FnOnce() -> T,
    {
        let slot = self.allocate()?;

        let free_list = &mut self.free_list;
        let rollback = scopeguard::guard(slot, |slot| free_list.push(slot));

        let value = f();
        let slot = ScopeGuard::into_inner(rollback);

        // SAFETY: The slot came from our freelist, so it is valid for writes of `T` and nobody
        // else has a pointer to it yet.
        unsafe {
            slot.as_ptr().write(value);
        }

        Ok(slot)
    }

    /// Drops the value in the slot and returns the slot to the freelist.
    ///
    /// # Safety
    ///
    /// The slot must have been obtained from this pool, must hold an initialized value and must not
    /// be used by the caller after this call.
    pub unsafe fn destroy(&mut self, slot: NonNull<T>) {
        // SAFETY: Forwarding the caller's guarantee that the slot holds a live value.
        unsafe {
            slot.as_ptr().drop_in_place();
        }

        // SAFETY: Forwarding the caller's guarantee that the slot came from this pool.
        unsafe {
            self.deallocate(slot);
        }
    }

    #[expect(
        clippy::arithmetic_side_effects,
        reason = "address is at least start inside the range and T is never zero-sized"
    )]
    fn owns(&self, slot: NonNull<T>) -> bool {
        let address = slot.as_ptr() as usize;

        self.blocks.iter().any(|block| {
            let start = block.as_ptr() as usize;
            let end = start.saturating_add(Self::block_layout().size());

            (start..end).contains(&address) && (address - start) % size_of::<T>() == 0
        })
    }

    fn block_layout() -> Layout {
        Layout::array::<T>(Self::SLOTS_PER_BLOCK).expect("block layout fits in BLOCK_SIZE bytes")
    }

    fn allocate_block(&mut self) -> Result<()> {
        let layout = Self::block_layout();

        // SAFETY: The layout is not zero-sized, guarded by the assertions in `new()`.
        let block = NonNull::new(unsafe { alloc(layout) }.cast::<T>()).ok_or(
            Error::AllocationFailure {
                type_name: type_name::<T>(),
                size: layout.size(),
            },
        )?;

        self.blocks.push(block);

        // Pushed in reverse so that the lowest address is handed out first.
        self.free_list.reserve(Self::SLOTS_PER_BLOCK);
        for index in (0..Self::SLOTS_PER_BLOCK).rev() {
            // SAFETY: The index is within the block, whose layout holds SLOTS_PER_BLOCK items.
            self.free_list.push(unsafe { block.add(index) });
        }

        Ok(())
    }
}

impl<T, const BLOCK_SIZE: usize> Drop for ObjectPool<T, BLOCK_SIZE> {
    fn drop(&mut self) {
        let layout = Self::block_layout();

        for block in self.blocks.drain(..) {
            // SAFETY: Every block was allocated in `allocate_block()` with this same layout.
            unsafe {
                dealloc(block.as_ptr().cast(), layout);
            }
        }
    }
}

impl<T, const BLOCK_SIZE: usize> fmt::Debug for ObjectPool<T, BLOCK_SIZE> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("blocks", &self.blocks.len())
            .field("capacity", &self.capacity())
            .field("available", &self.available())
            .finish()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::cell::Cell;
    use std::collections::HashSet;
    use std::panic::{self, AssertUnwindSafe};
    use std::rc::Rc;

    use static_assertions::{assert_impl_all, assert_not_impl_any};

    use super::*;

    assert_impl_all!(ObjectPool<u64>: Send);
    assert_not_impl_any!(ObjectPool<u64>: Sync);
    assert_not_impl_any!(ObjectPool<Rc<u64>>: Send);

    #[derive(Debug, PartialEq)]
    struct TestObject {
        value: i32,
        data: f64,
    }

    struct DropCounter<'a> {
        drops: &'a Cell<usize>,
    }

    impl Drop for DropCounter<'_> {
        fn drop(&mut self) {
            self.drops.set(self.drops.get() + 1);
        }
    }

    #[test]
    fn new_pool_has_one_block_of_free_slots() {
        let pool = ObjectPool::<u64>::new().unwrap();

        assert_eq!(ObjectPool::<u64>::slots_per_block(), 512);
        assert_eq!(pool.capacity(), 512);
        assert_eq!(pool.available(), pool.capacity());
    }

    #[test]
    fn construct_and_destroy_round_trip() {
        let mut pool = ObjectPool::<TestObject>::new().unwrap();

        let item = pool
            .construct(TestObject {
                value: 42,
                data: 3.5,
            })
            .unwrap();

        // SAFETY: Initialized by construct() and not aliased.
        let object = unsafe { item.as_ref() };
        assert_eq!(object.value, 42);
        assert!((object.data - 3.5).abs() < f64::EPSILON);

        // SAFETY: From this pool, holds a live value.
        unsafe { pool.destroy(item) };
        assert_eq!(pool.available(), pool.capacity());
    }

    #[test]
    fn available_moves_by_one_per_operation() {
        let mut pool = ObjectPool::<u32, 64>::new().unwrap();
        let capacity = pool.capacity();

        let slots = (0..5).map(|_| pool.allocate().unwrap()).collect::<Vec<_>>();
        assert_eq!(pool.available(), capacity - 5);

        for (released, slot) in slots.into_iter().enumerate() {
            // SAFETY: From this pool, not yet deallocated.
            unsafe { pool.deallocate(slot) };
            assert_eq!(pool.available(), capacity - 5 + released + 1);
        }

        assert_eq!(pool.available(), capacity);
    }

    #[test]
    fn grows_only_when_exhausted() {
        // 64 bytes of u64 = 8 slots per block.
        let mut pool = ObjectPool::<u64, 64>::new().unwrap();
        assert_eq!(pool.capacity(), 8);

        let mut slots = Vec::new();
        for _ in 0..8 {
            slots.push(pool.allocate().unwrap());
            assert_eq!(pool.capacity(), 8);
        }
        assert_eq!(pool.available(), 0);

        slots.push(pool.allocate().unwrap());
        assert_eq!(pool.capacity(), 16);
        assert_eq!(pool.available(), 7);

        for slot in slots {
            // SAFETY: From this pool, not yet deallocated.
            unsafe { pool.deallocate(slot) };
            assert!(pool.available() <= pool.capacity());
        }

        // Never shrinks.
        assert_eq!(pool.capacity(), 16);
        assert_eq!(pool.available(), 16);
    }

    #[test]
    fn live_slots_are_distinct() {
        let mut pool = ObjectPool::<u64, 64>::new().unwrap();

        let slots = (0..100).map(|_| pool.allocate().unwrap()).collect::<Vec<_>>();
        let unique = slots.iter().copied().collect::<HashSet<_>>();

        assert_eq!(unique.len(), 100);

        for slot in slots {
            assert_eq!(slot.as_ptr().align_offset(align_of::<u64>()), 0);
            // SAFETY: From this pool, not yet deallocated.
            unsafe { pool.deallocate(slot) };
        }
    }

    #[test]
    fn many_values_keep_their_contents() {
        let mut pool = ObjectPool::<TestObject>::new().unwrap();

        let items = (0..100)
            .map(|i| {
                pool.construct(TestObject {
                    value: i,
                    data: f64::from(i) * 2.0,
                })
                .unwrap()
            })
            .collect::<Vec<_>>();

        for (i, item) in (0..100).zip(&items) {
            // SAFETY: Initialized by construct() and not aliased.
            let object = unsafe { item.as_ref() };
            assert_eq!(
                *object,
                TestObject {
                    value: i,
                    data: f64::from(i) * 2.0
                }
            );
        }

        for item in items {
            // SAFETY: From this pool, holds a live value.
            unsafe { pool.destroy(item) };
        }
    }

    #[test]
    fn destroy_drops_value_and_deallocate_does_not() {
        let drops = Cell::new(0);
        let mut pool = ObjectPool::<DropCounter<'_>>::new().unwrap();

        let first = pool.construct(DropCounter { drops: &drops }).unwrap();
        let second = pool.construct(DropCounter { drops: &drops }).unwrap();

        // SAFETY: From this pool, holds a live value.
        unsafe { pool.destroy(first) };
        assert_eq!(drops.get(), 1);

        // SAFETY: From this pool; the value is intentionally leaked.
        unsafe { pool.deallocate(second) };
        assert_eq!(drops.get(), 1);
    }

    #[test]
    fn panicking_constructor_returns_slot() {
        let mut pool = ObjectPool::<u64>::new().unwrap();
        let capacity = pool.capacity();

        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            pool.construct_with(|| panic!("constructor failed"))
        }));

        assert!(result.is_err());
        assert_eq!(pool.available(), capacity);
    }

    #[test]
    fn dropping_pool_with_live_values_does_not_drop_them() {
        let drops = Cell::new(0);

        {
            let mut pool = ObjectPool::<DropCounter<'_>>::new().unwrap();
            _ = pool.construct(DropCounter { drops: &drops }).unwrap();
        }

        assert_eq!(drops.get(), 0);
    }

    #[test]
    #[should_panic]
    fn zero_sized_type_panics() {
        drop(ObjectPool::<()>::new());
    }

    #[test]
    #[should_panic]
    fn type_larger_than_block_panics() {
        drop(ObjectPool::<[u8; 128], 64>::new());
    }
}
