use std::fmt;
use std::ptr::NonNull;

use crate::{MAX_ALIGNMENT, SlotCoordinates};

/// Exclusive handle to one slot of raw storage acquired from a [`BlockPool`][crate::BlockPool].
///
/// The slot is `size()` bytes of uninitialized memory aligned to [`MAX_ALIGNMENT`]. The pool never
/// constructs or drops anything at this address; what the bytes mean is entirely up to the caller.
///
/// The handle is not [`Copy`] or [`Clone`]. Passing it to [`BlockPool::release()`] consumes it,
/// so the same slot cannot be released twice through safe code. Simply dropping the handle is
/// also allowed, in which case the slot stays in use until the pool is dropped.
///
/// # Thread safety
///
/// The handle is thread-mobile ([`Send`]) but not thread-safe ([`Sync`]). It is only a pointer
/// and some bookkeeping, so moving it to another thread is harmless by itself. Accessing the
/// memory behind it is governed by the caller's own unsafe code.
///
/// [`BlockPool::release()`]: crate::BlockPool::release
pub struct Slot {
    /// Identifies the pool the slot came from, so it cannot be released into a different one.
    pub(crate) pool_id: u64,

    pub(crate) coordinates: SlotCoordinates,

    ptr: NonNull<u8>,

    /// Usable size in bytes, which is the pool's rounded object size.
    size: usize,
}

impl Slot {
    #[must_use]
    pub(crate) fn new(
        pool_id: u64,
        coordinates: SlotCoordinates,
        ptr: NonNull<u8>,
        size: usize,
    ) -> Self {
        Self {
            pool_id,
            coordinates,
            ptr,
            size,
        }
    }

    /// Address of the first byte of the slot.
    ///
    /// The pointer stays valid for reads and writes of `size()` bytes until the slot is released
    /// or the pool is dropped, whichever happens first.
    #[must_use]
    #[inline]
    pub fn ptr(&self) -> NonNull<u8> {
        self.ptr
    }

    /// Number of usable bytes in the slot.
    ///
    /// This is the object size the pool was created with, rounded up to [`MAX_ALIGNMENT`].
    #[must_use]
    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Address of the slot as a pointer to `T`.
    ///
    /// # Panics
    ///
    /// Panics if `T` does not fit in the slot or needs stricter alignment than [`MAX_ALIGNMENT`].
    ///
    /// # Example
    ///
    /// ```
    /// use block_pool::BlockPool;
    ///
    /// let mut pool = BlockPool::builder().object_layout_of::<u64>().build().unwrap();
    ///
    /// let slot = pool.acquire().unwrap();
    /// let ptr = slot.cast::<u64>();
    ///
    /// // SAFETY: The slot is in use and large enough for a u64.
    /// unsafe {
    ///     ptr.write(42);
    ///     assert_eq!(ptr.read(), 42);
    /// }
    ///
    /// pool.release(slot);
    /// ```
    #[must_use]
    #[inline]
    pub fn cast<T>(&self) -> NonNull<T> {
        assert!(
            size_of::<T>() <= self.size,
            "type of {} bytes does not fit in a slot of {} bytes",
            size_of::<T>(),
            self.size
        );
        assert!(
            align_of::<T>() <= MAX_ALIGNMENT,
            "type alignment {} exceeds the slot alignment {MAX_ALIGNMENT}",
            align_of::<T>()
        );

        self.ptr.cast::<T>()
    }
}

impl fmt::Debug for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Slot")
            .field("pool_id", &self.pool_id)
            .field("block_index", &self.coordinates.block_index())
            .field("index_in_block", &self.coordinates.index_in_block())
            .field("ptr", &self.ptr)
            .field("size", &self.size)
            .finish()
    }
}

// SAFETY: The handle carries no thread-bound state. It is only a pointer into memory owned by a
// pool, and the pool itself is Send. What happens to the memory behind the pointer is up to the
// caller's unsafe code either way.
unsafe impl Send for Slot {}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use static_assertions::{assert_impl_all, assert_not_impl_any};

    use super::*;

    assert_impl_all!(Slot: Send, fmt::Debug);
    assert_not_impl_any!(Slot: Sync, Clone, Copy);

    #[repr(align(32))]
    struct OverAligned(#[expect(dead_code, reason = "only the alignment matters")] u8);

    fn slot_of(size: usize) -> (Box<[u128]>, Slot) {
        let mut storage = vec![0_u128; size / 16].into_boxed_slice();
        let ptr = NonNull::new(storage.as_mut_ptr().cast::<u8>()).unwrap();

        (storage, Slot::new(1, SlotCoordinates::from_parts(0, 0), ptr, size))
    }

    #[test]
    fn cast_fitting_type() {
        let (_storage, slot) = slot_of(16);

        assert_eq!(slot.cast::<u64>().cast::<u8>(), slot.ptr());
        assert_eq!(slot.cast::<u128>().cast::<u8>(), slot.ptr());
        assert_eq!(slot.size(), 16);
    }

    #[test]
    #[should_panic]
    fn cast_too_large_type_panics() {
        let (_storage, slot) = slot_of(16);

        _ = slot.cast::<[u64; 3]>();
    }

    #[test]
    #[should_panic]
    fn cast_over_aligned_type_panics() {
        let (_storage, slot) = slot_of(64);

        _ = slot.cast::<OverAligned>();
    }

    #[test]
    fn debug_shows_coordinates() {
        let (_storage, slot) = slot_of(16);

        let debug_output = format!("{slot:?}");
        assert!(debug_output.contains("block_index: 0"));
        assert!(debug_output.contains("size: 16"));
    }
}
