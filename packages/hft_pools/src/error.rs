use thiserror::Error;

/// Errors that can occur when a pool needs to obtain more storage.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The operating system refused to provide memory while the pool was growing.
    ///
    /// The pool itself remains usable; only the operation that needed the memory failed.
    #[error("failed to allocate {size} bytes of pool storage for {type_name}")]
    AllocationFailure {
        /// Name of the pooled type.
        type_name: &'static str,

        /// Size in bytes of the allocation that failed.
        size: usize,
    },

    /// The lock-free pool has already created the maximum number of nodes it can address.
    #[error("lock-free pool of {type_name} cannot grow beyond {max_nodes} nodes")]
    CapacityExceeded {
        /// Name of the pooled type.
        type_name: &'static str,

        /// The maximum number of nodes a single pool can hold.
        max_nodes: usize,
    },
}

/// A specialized `Result` type for pool operations, returning the crate's
/// [`Error`] type as the error value.
pub(crate) type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::fmt::Debug;

    use static_assertions::assert_impl_all;

    use super::*;

    assert_impl_all!(Error: Send, Sync, Debug);

    #[test]
    fn allocation_failure_names_type_and_size() {
        let error = Error::AllocationFailure {
            type_name: "u64",
            size: 4096,
        };

        assert_eq!(
            error.to_string(),
            "failed to allocate 4096 bytes of pool storage for u64"
        );
    }
}
