//! Multi-threaded tests for the lock-free pool. These are ignored under Miri because they are
//! slow there and the arena tests already cover the unsafe code paths single-threaded.

use std::collections::HashSet;
use std::sync::Mutex;

use hft_pools::LockFreeObjectPool;
use testing::{run_on_threads, with_watchdog};

const THREADS: usize = 8;
const ROUNDS: usize = 2_000;
const BATCH: usize = 16;

#[cfg_attr(miri, ignore)]
#[test]
fn concurrent_allocations_never_double_issue() {
    with_watchdog(|| {
        let pool = LockFreeObjectPool::<usize>::with_capacity(64).unwrap();

        run_on_threads(THREADS, |thread_index| {
            for round in 0..ROUNDS {
                let mut slots = (0..BATCH)
                    .map(|_| pool.allocate().unwrap())
                    .collect::<Vec<_>>();

                // Stamp every slot with a value unique to this thread and round. If another
                // thread had been handed the same storage, it would overwrite our stamp.
                let stamp = thread_index * 1_000_000 + round;
                for slot in &mut slots {
                    slot.write(stamp);
                }

                for slot in slots {
                    // SAFETY: Written above.
                    assert_eq!(unsafe { *slot.assume_init_ref() }, stamp);
                    pool.deallocate(slot);
                }
            }
        });

        // Every node that was ever created is back on the freelist.
        assert_eq!(pool.available(), pool.capacity());
        assert!(pool.capacity() <= 64 + THREADS * BATCH);
    });
}

#[cfg_attr(miri, ignore)]
#[test]
fn live_addresses_are_unique_across_threads() {
    with_watchdog(|| {
        let pool = LockFreeObjectPool::<u64>::new();
        let addresses = Mutex::new(HashSet::new());

        let held = run_on_threads(THREADS, |_| {
            let slots = (0..100).map(|_| pool.allocate().unwrap()).collect::<Vec<_>>();

            let mut addresses = addresses.lock().unwrap();
            for slot in &slots {
                assert!(
                    addresses.insert(slot.as_ptr() as usize),
                    "the same storage was handed out twice"
                );
            }

            slots
        });

        for slot in held.into_iter().flatten() {
            pool.deallocate(slot);
        }

        assert_eq!(pool.available(), THREADS * 100);
    });
}

#[cfg_attr(miri, ignore)]
#[test]
fn deallocated_nodes_are_allocatable_again() {
    with_watchdog(|| {
        let pool = LockFreeObjectPool::<u64>::new();

        let first_round = run_on_threads(THREADS, |_| {
            (0..50).map(|_| pool.allocate().unwrap()).collect::<Vec<_>>()
        });
        let created = pool.capacity();

        for slot in first_round.into_iter().flatten() {
            pool.deallocate(slot);
        }

        let second_round = run_on_threads(THREADS, |_| {
            (0..50).map(|_| pool.allocate().unwrap()).collect::<Vec<_>>()
        });

        // Everything was served from the freelist; no new nodes were needed.
        assert_eq!(pool.capacity(), created);
        assert_eq!(pool.available(), 0);

        for slot in second_round.into_iter().flatten() {
            pool.deallocate(slot);
        }
    });
}
