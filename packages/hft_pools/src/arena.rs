use std::alloc::{Layout, alloc, dealloc};
use std::any::type_name;
use std::cell::UnsafeCell;
use std::mem::MaybeUninit;
use std::ptr::{self, NonNull};
use std::sync::atomic::{AtomicPtr, AtomicU32, Ordering};

use crate::{Error, Result};

/// The first segment holds 2^6 = 64 nodes; every following segment doubles the previous one.
const FIRST_SEGMENT_LEN_LOG2: u32 = 6;
const FIRST_SEGMENT_LEN: u64 = 1 << FIRST_SEGMENT_LEN_LOG2;

/// With 26 doubling segments the arena addresses 2^32 - 64 nodes, which keeps every node index
/// (plus one, for the "no node" link value) within a `u32`.
const SEGMENT_COUNT: usize = 26;

/// Maximum number of nodes an arena can hold.
pub(crate) const MAX_NODES: u32 = u32::MAX - (FIRST_SEGMENT_LEN as u32 - 1);

/// Link value that means "no node".
pub(crate) const NO_NODE: u32 = 0;

/// Storage for one pooled value plus the intrusive freelist link.
///
/// Aligned to a cache line so that threads working on neighboring nodes do not contend.
#[repr(C, align(64))]
pub(crate) struct Node<T> {
    /// Link to the next free node, as `index + 1`, or [`NO_NODE`]. Only meaningful while the node
    /// is on the freelist but may be read at any time by a thread holding a stale head.
    pub(crate) next: AtomicU32,

    pub(crate) value: UnsafeCell<MaybeUninit<T>>,
}

/// A growable arena of nodes whose addresses never change.
///
/// The arena is a fixed table of segments. Segment `k` holds `64 << k` nodes and is allocated the
/// first time a node index inside it is needed. Segments are only released when the arena is
/// dropped, so a reference to a node stays valid for the lifetime of the arena and a node index
/// can be turned back into its node with a bit of arithmetic and a table lookup.
pub(crate) struct NodeArena<T> {
    segments: [AtomicPtr<Node<T>>; SEGMENT_COUNT],
}

impl<T> NodeArena<T> {
    pub(crate) fn new() -> Self {
        Self {
            segments: [const { AtomicPtr::new(ptr::null_mut()) }; SEGMENT_COUNT],
        }
    }

    /// Ensures storage exists for the node with the given index.
    ///
    /// Safe to call concurrently for the same segment; exactly one allocation wins and the
    /// others are released again.
    pub(crate) fn ensure_node(&self, index: u32) -> Result<()> {
        let (segment, _) = locate(index);
        self.ensure_segment(segment).map(|_| ())
    }

    /// # Panics
    ///
    /// Panics if storage for the node has not been ensured via [`ensure_node()`][Self::ensure_node].
    pub(crate) fn node(&self, index: u32) -> &Node<T> {
        let (segment, offset) = locate(index);

        // Acquire pairs with the AcqRel publication of the segment in `ensure_segment()`.
        let first = self
            .segments
            .get(segment)
            .expect("locate() only returns segments within the table")
            .load(Ordering::Acquire);

        assert!(
            !first.is_null(),
            "node {index} of arena of {} was never created",
            type_name::<T>()
        );

        // SAFETY: The segment exists and `locate()` guarantees the offset is inside it. Every node
        // in a segment is initialized before the segment is published and segments are never
        // released while the arena is alive.
        unsafe { &*first.add(offset) }
    }

    fn ensure_segment(&self, segment: usize) -> Result<NonNull<Node<T>>> {
        let entry = self
            .segments
            .get(segment)
            .expect("locate() only returns segments within the table");

        if let Some(existing) = NonNull::new(entry.load(Ordering::Acquire)) {
            return Ok(existing);
        }

        let layout = segment_layout::<T>(segment);

        // SAFETY: Node<T> always has non-zero size because of its link field.
        let fresh = NonNull::new(unsafe { alloc(layout) }.cast::<Node<T>>()).ok_or(
            Error::AllocationFailure {
                type_name: type_name::<T>(),
                size: layout.size(),
            },
        )?;

        for offset in 0..segment_len(segment) {
            // SAFETY: The offset is within the segment we just allocated with room for this many.
            unsafe {
                fresh.add(offset).write(Node {
                    next: AtomicU32::new(NO_NODE),
                    value: UnsafeCell::new(MaybeUninit::uninit()),
                });
            }
        }

        match entry.compare_exchange(
            ptr::null_mut(),
            fresh.as_ptr(),
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            Ok(_) => Ok(fresh),
            Err(winner) => {
                // Another thread published the segment first. Nobody has seen ours.
                // SAFETY: Allocated above with the same layout and never shared.
                unsafe {
                    dealloc(fresh.as_ptr().cast(), layout);
                }

                Ok(NonNull::new(winner).expect("the exchange only fails if the entry is non-null"))
            }
        }
    }
}

impl<T> Drop for NodeArena<T> {
    fn drop(&mut self) {
        for (segment, entry) in self.segments.iter_mut().enumerate() {
            let first = *entry.get_mut();

            if !first.is_null() {
                // SAFETY: Allocated in `ensure_segment()` with the layout for this segment. Node
                // links need no drop and pooled values are owned by the caller, not the arena.
                unsafe {
                    dealloc(first.cast(), segment_layout::<T>(segment));
                }
            }
        }
    }
}

fn segment_len(segment: usize) -> usize {
    usize::try_from(FIRST_SEGMENT_LEN << segment)
        .expect("segments that exist in memory fit in the address space")
}

fn segment_layout<T>(segment: usize) -> Layout {
    Layout::array::<Node<T>>(segment_len(segment)).expect("segment layout must be calculable")
}

/// Maps a node index to its segment and the offset within that segment.
#[expect(
    clippy::arithmetic_side_effects,
    reason = "a u32 index plus 64 fits in u64 and a segment never starts past its own indices"
)]
fn locate(index: u32) -> (usize, usize) {
    // Shifting the index by the first segment length makes the segment number equal to the
    // position of the highest set bit, minus the first segment's own bit position.
    let shifted = u64::from(index) + FIRST_SEGMENT_LEN;
    let segment = shifted.ilog2() - FIRST_SEGMENT_LEN_LOG2;
    let offset = shifted - (FIRST_SEGMENT_LEN << segment);

    (
        segment as usize,
        usize::try_from(offset).expect("offset is smaller than a segment that fits in memory"),
    )
}
