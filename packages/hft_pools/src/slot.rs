use std::any::type_name;
use std::fmt;
use std::marker::PhantomData;
use std::ptr::NonNull;

/// Exclusive ownership of one storage slot handed out by a
/// [`LockFreeObjectPool`][crate::LockFreeObjectPool].
///
/// The slot starts uninitialized. The pool never constructs or drops values, so the owner writes
/// a value with [`write()`][Self::write] and, if the value needs dropping, drops it with
/// [`assume_init_drop()`][Self::assume_init_drop] before handing the slot back via
/// [`LockFreeObjectPool::deallocate()`][crate::LockFreeObjectPool::deallocate].
///
/// A slot cannot be cloned and is consumed when it is returned, so the same storage can never be
/// on the freelist twice. Dropping a slot without returning it leaks the storage until the pool
/// itself is dropped.
///
/// The slot borrows the pool it came from, so the pool cannot be dropped while a slot is alive:
///
/// ```compile_fail
/// use hft_pools::LockFreeObjectPool;
///
/// let pool = LockFreeObjectPool::<u64>::new();
/// let mut slot = pool.allocate().unwrap();
///
/// drop(pool);
/// slot.write(42);
/// ```
pub struct Slot<'pool, T> {
    ptr: NonNull<T>,
    index: u32,
    pool_id: u64,
    _pool: PhantomData<&'pool ()>,
}

// SAFETY: The slot is the only handle to its storage, so sending it sends the value in it.
unsafe impl<T: Send> Send for Slot<'_, T> {}
// SAFETY: Shared references to the slot only give out shared references to the value.
unsafe impl<T: Sync> Sync for Slot<'_, T> {}

impl<T> Slot<'_, T> {
    pub(crate) fn new(ptr: NonNull<T>, index: u32, pool_id: u64) -> Self {
        Self {
            ptr,
            index,
            pool_id,
            _pool: PhantomData,
        }
    }

    /// Position of the slot's node in the pool's arena.
    ///
    /// Indices are stable for the lifetime of the pool and may be reused after the slot is
    /// returned.
    #[must_use]
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Raw pointer to the slot's storage, valid until the slot is returned to the pool.
    #[must_use]
    pub fn as_ptr(&self) -> *mut T {
        self.ptr.as_ptr()
    }

    /// Moves a value into the slot and returns a reference to it.
    ///
    /// A value that was already in the slot is overwritten without being dropped.
    pub fn write(&mut self, value: T) -> &mut T {
        // SAFETY: The slot has exclusive access to storage valid for writes of `T`.
        unsafe {
            self.ptr.as_ptr().write(value);
            self.ptr.as_mut()
        }
    }

    /// # Safety
    ///
    /// The slot must hold an initialized value.
    #[must_use]
    pub unsafe fn assume_init_ref(&self) -> &T {
        // SAFETY: Forwarding the caller's guarantee that the value is initialized.
        unsafe { self.ptr.as_ref() }
    }

    /// # Safety
    ///
    /// The slot must hold an initialized value.
    #[must_use]
    pub unsafe fn assume_init_mut(&mut self) -> &mut T {
        // SAFETY: Forwarding the caller's guarantee that the value is initialized.
        unsafe { self.ptr.as_mut() }
    }

    /// Moves the value out of the slot, leaving the slot logically uninitialized.
    ///
    /// # Safety
    ///
    /// The slot must hold an initialized value, and that value must not be read again unless it
    /// is written anew.
    #[must_use]
    pub unsafe fn assume_init_read(&mut self) -> T {
        // SAFETY: Forwarding the caller's guarantee that the value is initialized.
        unsafe { self.ptr.as_ptr().read() }
    }

    /// Drops the value in the slot, leaving the slot logically uninitialized.
    ///
    /// # Safety
    ///
    /// The slot must hold an initialized value.
    pub unsafe fn assume_init_drop(&mut self) {
        // SAFETY: Forwarding the caller's guarantee that the value is initialized.
        unsafe { self.ptr.as_ptr().drop_in_place() }
    }

    pub(crate) fn pool_id(&self) -> u64 {
        self.pool_id
    }
}

impl<T> fmt::Debug for Slot<'_, T> {
    #[cfg_attr(test, mutants::skip)] // No API contract.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("index", &self.index)
            .field("ptr", &self.ptr)
            .finish_non_exhaustive()
    }
}
