#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Fixed-type object pools for allocation-free hot paths.
//!
//! This crate provides two pools that hand out raw storage for values of a single type:
//!
//! * [`ObjectPool`] - a single-threaded pool that grows in fixed-size blocks and keeps unused
//!   slots on a plain freelist. Use it when one thread owns the pool.
//! * [`LockFreeObjectPool`] - a pool that any number of threads can allocate from and return to
//!   concurrently. Its freelist is updated only through compare-and-swap, and it grows one node
//!   at a time when the freelist runs dry.
//!
//! Neither pool ever returns memory to the operating system while it is alive. This is what makes
//! the pools cheap to use in steady state and, for the lock-free pool, what makes it safe for a
//! thread to look at a node that another thread has just taken.
//!
//! # Example
//!
//! ```rust
//! use hft_pools::{LockFreeObjectPool, ObjectPool};
//!
//! let mut local = ObjectPool::<[u8; 64]>::new().unwrap();
//! let buffer = local.construct([0; 64]).unwrap();
//! // SAFETY: The slot came from this pool and holds a live value.
//! unsafe { local.destroy(buffer) };
//!
//! let shared = LockFreeObjectPool::<u64>::new();
//! let mut slot = shared.allocate().unwrap();
//! *slot.write(7) += 1;
//! // SAFETY: Written above.
//! assert_eq!(unsafe { *slot.assume_init_ref() }, 8);
//! shared.deallocate(slot);
//! ```

mod arena;
mod error;
mod lock_free_pool;
mod object_pool;
mod slot;

pub use error::*;
pub use lock_free_pool::*;
pub use object_pool::*;
pub use slot::*;
