use std::alloc::Layout;

use thiserror::Error;

/// Errors that can occur when creating a [`BlockPool`][crate::BlockPool] or acquiring slots.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The memory allocator could not provide a new block, or room to track one.
    ///
    /// The pool is left exactly as it was before the failed operation.
    #[error("failed to allocate {} bytes (alignment {}) for the pool", layout.size(), layout.align())]
    AllocationFailed {
        /// The layout of the allocation that could not be satisfied.
        layout: Layout,
    },

    /// The object size, after rounding up to the alignment boundary, or the size of a whole block
    /// cannot be represented as a memory layout.
    #[error(
        "blocks of {objects_per_block} objects of {object_size} bytes exceed the addressable memory size"
    )]
    CapacityOverflow {
        /// The object size that was requested, before rounding.
        object_size: usize,

        /// The number of objects per block that was requested.
        objects_per_block: usize,
    },
}

/// A specialized `Result` type for pool operations, returning the crate's
/// [`Error`] type as the error value.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::fmt::Debug;

    use static_assertions::assert_impl_all;

    use super::*;

    assert_impl_all!(Error: Send, Sync, Debug);

    #[test]
    fn allocation_failed_mentions_layout() {
        let error = Error::AllocationFailed {
            layout: Layout::from_size_align(64, 16).unwrap(),
        };

        let message = error.to_string();
        assert!(message.contains("64 bytes"), "unexpected message: {message}");
        assert!(message.contains("alignment 16"), "unexpected message: {message}");
    }

    #[test]
    fn capacity_overflow_mentions_sizes() {
        let error = Error::CapacityOverflow {
            object_size: 100,
            objects_per_block: 7,
        };

        let message = error.to_string();
        assert!(message.contains("7 objects"), "unexpected message: {message}");
        assert!(message.contains("100 bytes"), "unexpected message: {message}");
    }
}
