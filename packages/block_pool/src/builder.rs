use std::alloc::Layout;
use std::cell::Cell;
use std::marker::PhantomData;
use std::num::NonZero;

use crate::{BlockPool, DEFAULT_OBJECTS_PER_BLOCK, DropPolicy, Result};

/// Builder for creating an instance of [`BlockPool`].
///
/// The object size is mandatory and is set with either `.object_size()` or
/// `.object_layout_of::<T>()`. Other settings are optional.
///
/// # Examples
///
/// ```
/// use block_pool::BlockPool;
/// use new_zealand::nz;
///
/// let pool = BlockPool::builder()
///     .object_size(40)
///     .objects_per_block(nz!(32))
///     .build()
///     .unwrap();
///
/// assert_eq!(pool.object_size(), 48);
/// assert_eq!(pool.objects_per_block(), 32);
/// ```
///
/// # Thread safety
///
/// The builder is thread-mobile ([`Send`]) but not thread-safe ([`Sync`]).
#[derive(Debug)]
#[must_use]
pub struct BlockPoolBuilder {
    object_size: Option<usize>,
    objects_per_block: NonZero<usize>,
    drop_policy: DropPolicy,

    _not_sync: PhantomData<Cell<()>>,
}

impl BlockPoolBuilder {
    #[inline]
    pub(crate) fn new() -> Self {
        Self {
            object_size: None,
            objects_per_block: DEFAULT_OBJECTS_PER_BLOCK,
            drop_policy: DropPolicy::default(),
            _not_sync: PhantomData,
        }
    }

    /// Sets the size in bytes of the objects the pool will hold.
    ///
    /// The pool rounds this up to a multiple of [`MAX_ALIGNMENT`][crate::MAX_ALIGNMENT].
    /// A size of zero is accepted and treated as one alignment unit.
    #[inline]
    pub fn object_size(mut self, size: usize) -> Self {
        self.object_size = Some(size);
        self
    }

    /// Sets the object size to the size of `T`.
    ///
    /// # Panics
    ///
    /// Panics if `T` requires stricter alignment than [`MAX_ALIGNMENT`][crate::MAX_ALIGNMENT],
    /// as slots could not hold it.
    #[inline]
    pub fn object_layout_of<T>(mut self) -> Self {
        let layout = Layout::new::<T>();

        assert!(
            layout.align() <= crate::MAX_ALIGNMENT,
            "BlockPool slots cannot satisfy alignment {}",
            layout.align()
        );

        self.object_size = Some(layout.size());
        self
    }

    /// Sets how many objects each block holds. Defaults to [`DEFAULT_OBJECTS_PER_BLOCK`].
    #[inline]
    pub fn objects_per_block(mut self, count: NonZero<usize>) -> Self {
        self.objects_per_block = count;
        self
    }

    /// Sets the [drop policy][DropPolicy] for the pool. This governs what happens if the pool
    /// is dropped while slots are still acquired.
    #[inline]
    pub fn drop_policy(mut self, policy: DropPolicy) -> Self {
        self.drop_policy = policy;
        self
    }

    /// Builds the pool with the specified configuration.
    ///
    /// No block memory is allocated until the first slot is acquired or reserved.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CapacityOverflow`][crate::Error::CapacityOverflow] if the rounded object
    /// size or the resulting block size cannot be represented as a memory layout.
    ///
    /// # Panics
    ///
    /// Panics if no object size has been set using either [`object_size`](Self::object_size) or
    /// [`object_layout_of`](Self::object_layout_of).
    #[inline]
    pub fn build(self) -> Result<BlockPool> {
        let object_size = self.object_size.expect(
            "object size must be set using .object_size() or .object_layout_of::<T>() before calling .build()",
        );

        BlockPool::new_inner(object_size, self.objects_per_block, self.drop_policy)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use new_zealand::nz;
    use static_assertions::{assert_impl_all, assert_not_impl_any};

    use super::*;

    assert_impl_all!(BlockPoolBuilder: Send, std::fmt::Debug);
    assert_not_impl_any!(BlockPoolBuilder: Sync);

    #[test]
    fn new_has_defaults() {
        let builder = BlockPoolBuilder::new();

        assert!(builder.object_size.is_none());
        assert_eq!(builder.objects_per_block, DEFAULT_OBJECTS_PER_BLOCK);
        assert_eq!(builder.drop_policy, DropPolicy::default());
    }

    #[test]
    fn object_layout_of_uses_type_size() {
        let builder = BlockPoolBuilder::new().object_layout_of::<[u32; 5]>();

        assert_eq!(builder.object_size, Some(20));
    }

    #[test]
    fn object_layout_of_zero_sized_type_is_accepted() {
        let pool = BlockPoolBuilder::new().object_layout_of::<()>().build().unwrap();

        assert_eq!(pool.object_size(), crate::MAX_ALIGNMENT);
    }

    #[test]
    #[should_panic]
    fn object_layout_of_over_aligned_type_panics() {
        #[repr(align(64))]
        struct Page;

        _ = BlockPoolBuilder::new().object_layout_of::<Page>();
    }

    #[test]
    fn settings_are_applied() {
        let pool = BlockPoolBuilder::new()
            .object_size(1)
            .objects_per_block(nz!(7))
            .drop_policy(DropPolicy::MustNotDropInUseSlots)
            .build()
            .unwrap();

        assert_eq!(pool.object_size(), 16);
        assert_eq!(pool.objects_per_block(), 7);
    }

    #[test]
    #[should_panic]
    fn build_without_object_size_panics() {
        _ = BlockPoolBuilder::new().build();
    }

    #[test]
    fn build_with_unrepresentable_size_fails() {
        let result = BlockPoolBuilder::new().object_size(usize::MAX).build();

        assert!(matches!(
            result,
            Err(crate::Error::CapacityOverflow { .. })
        ));
    }
}
