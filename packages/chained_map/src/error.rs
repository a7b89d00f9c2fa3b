use std::alloc::Layout;

use thiserror::Error;

/// Errors that can occur when creating or growing a [`ChainedMap`][crate::ChainedMap].
///
/// A missing key is not an error. Lookups express that as `None`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The memory allocator could not satisfy a request for the bucket array or a new pair.
    ///
    /// The map is left exactly as it was before the failed operation.
    #[error("failed to allocate {} bytes (alignment {}) for the map", layout.size(), layout.align())]
    AllocationFailed {
        /// The layout of the allocation that could not be satisfied.
        layout: Layout,
    },

    /// The requested number of buckets cannot be represented as a single allocation.
    #[error("a bucket array of {bucket_count} buckets exceeds the addressable memory size")]
    CapacityOverflow {
        /// The number of buckets that was requested.
        bucket_count: usize,
    },
}

/// A specialized `Result` type for map operations, returning the crate's
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
    fn allocation_failed_mentions_size() {
        let error = Error::AllocationFailed {
            layout: Layout::new::<u64>(),
        };

        let message = error.to_string();
        assert!(message.contains("8 bytes"), "unexpected message: {message}");
    }

    #[test]
    fn capacity_overflow_mentions_bucket_count() {
        let error = Error::CapacityOverflow { bucket_count: 42 };

        assert!(error.to_string().contains("42 buckets"));
    }
}
