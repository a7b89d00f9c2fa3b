use std::alloc::{alloc, dealloc};
use std::ptr::NonNull;

use crate::{BlockLayout, Error, Result};

/// One contiguous allocation inside a [`BlockPool`][crate::BlockPool], split into
/// `objects_per_block` slots of `object_size` bytes each.
///
/// Free slots form an intrusive free list: the leading bytes of every free slot hold the index
/// of the next free slot, with the out-of-range index `objects_per_block` terminating the list.
/// An acquired slot is not linked anywhere and its bytes belong to the caller.
///
/// # Out of band access
///
/// The block never creates references to its memory, so callers may access acquired slots via
/// pointers from unsafe code even when not holding a reference to the block.
#[derive(Debug)]
pub(crate) struct Block {
    /// Start of the allocation. Slot `i` starts `i * object_size` bytes later.
    first_slot_ptr: NonNull<u8>,

    layout: BlockLayout,

    /// Head of the intrusive free list. Think of this as a stack of the most recently released
    /// slots, with the stack entries stored in the slots themselves. This points out of bounds
    /// if every slot is acquired.
    next_free_index: usize,

    /// Number of slots currently on the free list.
    free_count: usize,
}

impl Block {
    /// Allocates a new block and links all of its slots into the free list in ascending order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AllocationFailed`] if the allocator cannot provide the memory.
    pub(crate) fn new(layout: BlockLayout) -> Result<Self> {
        let block_layout = layout.block();

        // SAFETY: The layout is valid and not zero-sized, as both the object size and the
        // object count are guaranteed non-zero by BlockLayout::calculate().
        let Some(first_slot_ptr) = NonNull::new(unsafe { alloc(block_layout) }) else {
            tracing::warn!(
                size = block_layout.size(),
                align = block_layout.align(),
                "allocator refused memory for a block"
            );

            return Err(Error::AllocationFailed {
                layout: block_layout,
            });
        };

        let mut block = Self {
            first_slot_ptr,
            layout,
            next_free_index: 0,
            free_count: layout.objects_per_block().get(),
        };

        for index in 0..layout.objects_per_block().get() {
            // For the last slot, this points out of bounds, which terminates the list.
            // Cannot overflow, as that would imply the block is larger than virtual memory.
            block.write_link(index, index.wrapping_add(1));
        }

        Ok(block)
    }

    /// The number of slots in the block, free or acquired.
    #[must_use]
    pub(crate) fn capacity(&self) -> usize {
        self.layout.objects_per_block().get()
    }

    #[must_use]
    #[cfg_attr(test, mutants::skip)] // Can be mutated to infinitely growing memory use.
    pub(crate) fn free_count(&self) -> usize {
        self.free_count
    }

    /// Whether every slot in the block is acquired.
    #[must_use]
    pub(crate) fn is_exhausted(&self) -> bool {
        self.next_free_index >= self.capacity()
    }

    fn slot_ptr(&self, index: usize) -> NonNull<u8> {
        assert!(
            index < self.capacity(),
            "slot {index} index out of bounds in block of capacity {}",
            self.capacity()
        );

        // Cannot overflow because that would imply the block extends beyond virtual memory.
        let offset = index.wrapping_mul(self.layout.object_size());

        // SAFETY: The offset is within the allocation due to the bounds check above.
        unsafe { self.first_slot_ptr.add(offset) }
    }

    #[expect(
        clippy::cast_ptr_alignment,
        reason = "slots start at multiples of MAX_ALIGNMENT, which is at least the usize alignment"
    )]
    fn link_ptr(&self, index: usize) -> NonNull<usize> {
        self.slot_ptr(index).cast::<usize>()
    }

    fn read_link(&self, index: usize) -> usize {
        // SAFETY: The pointer is in bounds and aligned for usize (see link_ptr). The caller only
        // reads links of free slots, whose leading bytes were written by write_link().
        unsafe { self.link_ptr(index).read() }
    }

    #[expect(
        clippy::needless_pass_by_ref_mut,
        reason = "the write goes through a pointer into memory owned by self"
    )]
    fn write_link(&mut self, index: usize, next_free_index: usize) {
        // SAFETY: The pointer is in bounds and aligned for usize (see link_ptr), and every slot
        // is at least MAX_ALIGNMENT bytes, which fits a usize. The slot is free (or becoming
        // free), so no caller is using its bytes.
        unsafe {
            self.link_ptr(index).write(next_free_index);
        }
    }

    /// Pops a slot off the free list, returning its index and address.
    ///
    /// # Panics
    ///
    /// Panics if the block is exhausted.
    #[must_use]
    pub(crate) fn acquire(&mut self) -> (usize, NonNull<u8>) {
        assert!(
            !self.is_exhausted(),
            "cannot acquire a slot from an exhausted block of capacity {}",
            self.capacity()
        );

        let index = self.next_free_index;

        self.next_free_index = self.read_link(index);

        self.free_count = self
            .free_count
            .checked_sub(1)
            .expect("the block was not exhausted, so at least one slot was free");

        #[cfg(debug_assertions)]
        self.integrity_check();

        (index, self.slot_ptr(index))
    }

    /// Pushes a previously acquired slot back onto the free list.
    ///
    /// # Panics
    ///
    /// Panics if the index is out of bounds. In debug builds, panics if the slot was already free.
    pub(crate) fn release(&mut self, index: usize) {
        let next_free_index = self.next_free_index;

        self.write_link(index, next_free_index);
        self.next_free_index = index;

        // Cannot overflow because free_count never exceeds the capacity.
        self.free_count = self.free_count.wrapping_add(1);

        #[cfg(debug_assertions)]
        self.integrity_check();
    }

    #[cfg_attr(test, mutants::skip)] // This is essentially test logic, mutation is meaningless.
    #[cfg(debug_assertions)]
    pub(crate) fn integrity_check(&self) {
        let mut observed_is_free = vec![false; self.capacity()];
        let mut observed_free_count: usize = 0;
        let mut index = self.next_free_index;

        while index != self.capacity() {
            let is_free = observed_is_free.get_mut(index).unwrap_or_else(|| {
                panic!(
                    "free list link {index} is out of bounds in block of capacity {}",
                    self.capacity()
                )
            });

            assert!(
                !*is_free,
                "slot {index} appears twice on the free list (released twice?)"
            );

            *is_free = true;
            observed_free_count = observed_free_count.wrapping_add(1);
            index = self.read_link(index);
        }

        assert_eq!(
            self.free_count, observed_free_count,
            "self.free_count {} does not match the observed free list length {}",
            self.free_count, observed_free_count
        );
    }
}

impl Drop for Block {
    fn drop(&mut self) {
        // SAFETY: The layout must match between alloc and dealloc. It does.
        unsafe {
            dealloc(self.first_slot_ptr.as_ptr(), self.layout.block());
        }
    }
}

// SAFETY: Yes, there are raw pointers involved here but the block only owns plain bytes,
// which are not tied to any particular thread.
unsafe impl Send for Block {}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
#[allow(
    clippy::undocumented_unsafe_blocks,
    clippy::multiple_unsafe_ops_per_block,
    reason = "tests focus on succinct code and do not need to tick all the boxes"
)]
mod tests {
    use std::collections::HashSet;
    use std::num::NonZero;

    use new_zealand::nz;

    use super::*;
    use crate::MAX_ALIGNMENT;

    fn new_block(object_size: usize, objects_per_block: NonZero<usize>) -> Block {
        Block::new(BlockLayout::calculate(object_size, objects_per_block).unwrap()).unwrap()
    }

    #[test]
    fn smoke_test() {
        let mut block = new_block(16, nz!(3));

        assert_eq!(block.capacity(), 3);
        assert_eq!(block.free_count(), 3);

        let (a, _) = block.acquire();
        let (b, _) = block.acquire();
        let (c, _) = block.acquire();

        assert_eq!((a, b, c), (0, 1, 2));
        assert!(block.is_exhausted());
        assert_eq!(block.free_count(), 0);

        block.release(b);

        assert!(!block.is_exhausted());
        assert_eq!(block.free_count(), 1);

        let (d, _) = block.acquire();
        assert_eq!(d, b);
        assert!(block.is_exhausted());
    }

    #[test]
    fn fresh_block_hands_out_slots_left_to_right() {
        let mut block = new_block(32, nz!(4));

        let base = block.slot_ptr(0).as_ptr() as usize;

        for expected_index in 0..4 {
            let (index, ptr) = block.acquire();

            assert_eq!(index, expected_index);
            assert_eq!(ptr.as_ptr() as usize, base + expected_index * 32);
        }
    }

    #[test]
    fn free_list_terminates() {
        let mut block = new_block(16, nz!(2));

        _ = block.acquire();
        _ = block.acquire();

        assert!(block.is_exhausted());
    }

    #[test]
    #[should_panic]
    fn acquire_from_exhausted_block_panics() {
        let mut block = new_block(16, nz!(1));

        _ = block.acquire();
        _ = block.acquire();
    }

    #[test]
    fn released_slots_are_reused_most_recent_first() {
        let mut block = new_block(16, nz!(4));

        let indexes: Vec<_> = (0..4).map(|_| block.acquire().0).collect();

        block.release(indexes[1]);
        block.release(indexes[3]);

        assert_eq!(block.acquire().0, indexes[3]);
        assert_eq!(block.acquire().0, indexes[1]);
    }

    #[test]
    fn slots_are_aligned_and_disjoint() {
        let mut block = new_block(20, nz!(8));

        let mut seen = HashSet::new();

        for value in 0..8_u128 {
            let (_, ptr) = block.acquire();

            assert_eq!(ptr.as_ptr() as usize % MAX_ALIGNMENT, 0);
            assert!(seen.insert(ptr));

            // The rounded slot size is 32 bytes, so a u128 fits and must not clobber neighbors.
            unsafe { ptr.cast::<u128>().write(value) };
        }

        let mut values: Vec<u128> = seen
            .iter()
            .map(|ptr| unsafe { ptr.cast::<u128>().read() })
            .collect();
        values.sort_unstable();

        assert_eq!(values, (0..8).collect::<Vec<_>>());
    }

    #[test]
    fn caller_data_in_acquired_slot_survives_release_of_neighbor() {
        let mut block = new_block(16, nz!(2));

        let (a, a_ptr) = block.acquire();
        let (b, b_ptr) = block.acquire();

        unsafe { a_ptr.cast::<u64>().write(0xdead_beef) };
        unsafe { b_ptr.cast::<u64>().write(0xcafe_babe) };

        block.release(b);

        assert_eq!(unsafe { a_ptr.cast::<u64>().read() }, 0xdead_beef);

        block.release(a);
        assert_eq!(block.free_count(), 2);
    }

    #[test]
    #[should_panic]
    fn release_out_of_bounds_panics() {
        let mut block = new_block(16, nz!(2));

        block.release(2);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic]
    fn double_release_is_detected() {
        let mut block = new_block(16, nz!(2));

        let (a, _) = block.acquire();
        block.release(a);
        block.release(a);
    }
}
