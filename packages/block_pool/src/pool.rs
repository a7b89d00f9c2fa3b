use std::alloc::Layout;
use std::num::NonZero;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;

use new_zealand::nz;

use crate::{
    Block, BlockLayout, BlockPoolBuilder, DropPolicy, Error, Result, Slot, SlotCoordinates,
};

/// Global counter for generating unique pool IDs.
static POOL_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

fn generate_pool_id() -> u64 {
    POOL_ID_COUNTER.fetch_add(1, Ordering::Relaxed)
}

/// How many objects each block holds unless the builder says otherwise.
#[cfg(not(miri))]
pub const DEFAULT_OBJECTS_PER_BLOCK: NonZero<usize> = nz!(128);

// Under Miri, we use smaller blocks because Miri test runtime scales by memory usage.
#[cfg(miri)]
pub const DEFAULT_OBJECTS_PER_BLOCK: NonZero<usize> = nz!(16);

/// A pool of fixed-size memory slots, carved out of blocks that are allocated on demand.
///
/// Every slot in a pool has the same size: the object size given at creation, rounded up to
/// [`MAX_ALIGNMENT`][crate::MAX_ALIGNMENT]. Slots are handed out as raw uninitialized storage by
/// [`acquire()`](Self::acquire) and returned with [`release()`](Self::release). The pool never
/// constructs, inspects or drops anything stored in a slot.
///
/// Memory is requested from the allocator one block at a time, only when every existing block is
/// exhausted. Blocks are never freed individually; all of them go away together when the pool is
/// dropped. Slot addresses are therefore stable for as long as the pool exists.
///
/// # Example
///
/// ```
/// use block_pool::BlockPool;
/// use new_zealand::nz;
///
/// let mut pool = BlockPool::new(12, nz!(4)).unwrap();
///
/// // The object size is padded so every slot is 16-byte aligned.
/// assert_eq!(pool.object_size(), 16);
///
/// let slot = pool.acquire().unwrap();
/// let ptr = slot.cast::<[u32; 3]>();
///
/// // SAFETY: The slot is in use, so we have exclusive access to its bytes.
/// unsafe {
///     ptr.write([1, 2, 3]);
///     assert_eq!(ptr.read()[1], 2);
/// }
///
/// assert_eq!(pool.len(), 1);
/// assert_eq!(pool.block_count(), 1);
///
/// pool.release(slot);
/// assert!(pool.is_empty());
/// ```
///
/// # Thread safety
///
/// The pool is thread-mobile ([`Send`]) but not thread-safe ([`Sync`]).
#[derive(Debug)]
pub struct BlockPool {
    /// We need to uniquely identify each pool to ensure that slots are not returned to the
    /// wrong pool. If the pool ID does not match when a slot is released, we panic.
    pool_id: u64,

    layout: BlockLayout,

    /// Blocks are only ever appended, so a block index in a slot stays valid for the life of
    /// the pool.
    blocks: Vec<Block>,

    /// Lowest index of any block that has a free slot, if known. This being `None` does not
    /// imply that there are no free slots, it just means we do not know what block they are in.
    /// In other words, this is a cache, not the ground truth.
    block_with_free_slot_index: Option<usize>,

    drop_policy: DropPolicy,

    /// Number of slots currently acquired. We track this explicitly to avoid summing across
    /// blocks when calculating the length.
    length: usize,
}

impl BlockPool {
    /// Creates a builder for configuring and constructing a [`BlockPool`].
    ///
    /// # Example
    ///
    /// ```
    /// use block_pool::{BlockPool, DropPolicy};
    ///
    /// let pool = BlockPool::builder()
    ///     .object_layout_of::<[u64; 4]>()
    ///     .drop_policy(DropPolicy::MustNotDropInUseSlots)
    ///     .build()
    ///     .unwrap();
    ///
    /// assert_eq!(pool.object_size(), 32);
    /// ```
    #[inline]
    pub fn builder() -> BlockPoolBuilder {
        BlockPoolBuilder::new()
    }

    /// Creates a pool of `object_size` byte slots, `objects_per_block` slots per block.
    ///
    /// No block is allocated until the first slot is acquired.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CapacityOverflow`] if the rounded object size or the block size cannot
    /// be represented as a memory layout.
    pub fn new(object_size: usize, objects_per_block: NonZero<usize>) -> Result<Self> {
        Self::new_inner(object_size, objects_per_block, DropPolicy::default())
    }

    pub(crate) fn new_inner(
        object_size: usize,
        objects_per_block: NonZero<usize>,
        drop_policy: DropPolicy,
    ) -> Result<Self> {
        let layout = BlockLayout::calculate(object_size, objects_per_block)?;
        let pool_id = generate_pool_id();

        tracing::debug!(
            pool_id,
            requested_object_size = object_size,
            object_size = layout.object_size(),
            objects_per_block = objects_per_block.get(),
            ?drop_policy,
            "created block pool"
        );

        Ok(Self {
            pool_id,
            layout,
            blocks: Vec::new(),
            block_with_free_slot_index: None,
            drop_policy,
            length: 0,
        })
    }

    /// Size in bytes of every slot, after rounding up to [`MAX_ALIGNMENT`][crate::MAX_ALIGNMENT].
    #[must_use]
    #[inline]
    pub fn object_size(&self) -> usize {
        self.layout.object_size()
    }

    /// Number of slots in each block.
    #[must_use]
    #[inline]
    pub fn objects_per_block(&self) -> usize {
        self.layout.objects_per_block().get()
    }

    /// Number of blocks allocated so far.
    #[must_use]
    #[inline]
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// The number of slots the pool can hand out without allocating another block, including
    /// slots that are currently acquired.
    #[must_use]
    #[inline]
    pub fn capacity(&self) -> usize {
        // Overflow here would imply capacity is greater than virtual memory - impossible.
        self.blocks.len().wrapping_mul(self.objects_per_block())
    }

    /// The number of slots currently acquired.
    #[must_use]
    #[cfg_attr(test, mutants::skip)] // Can be mutated to infinitely growing memory use and/or infinite loop.
    #[inline]
    pub fn len(&self) -> usize {
        debug_assert_eq!(
            self.length,
            self.blocks
                .iter()
                .map(|block| block.capacity().wrapping_sub(block.free_count()))
                .sum::<usize>()
        );

        self.length
    }

    /// Whether no slots are currently acquired.
    ///
    /// An empty pool may still be holding allocated blocks.
    #[must_use]
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Allocates blocks until at least `additional` more slots can be acquired without further
    /// allocation.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AllocationFailed`] if a block cannot be allocated. Blocks allocated
    /// before the failure are kept.
    ///
    /// # Panics
    ///
    /// Panics if the requested capacity exceeds the size of virtual memory.
    ///
    /// # Example
    ///
    /// ```
    /// use block_pool::BlockPool;
    /// use new_zealand::nz;
    ///
    /// let mut pool = BlockPool::new(64, nz!(10)).unwrap();
    ///
    /// pool.reserve(25).unwrap();
    ///
    /// assert_eq!(pool.block_count(), 3);
    /// assert_eq!(pool.capacity(), 30);
    /// ```
    #[cfg_attr(test, mutants::skip)] // Can be mutated to infinitely growing memory use and/or infinite loop.
    pub fn reserve(&mut self, additional: usize) -> Result<()> {
        let required_capacity = self
            .len()
            .checked_add(additional)
            .expect("requested capacity exceeds size of virtual memory");

        while self.capacity() < required_capacity {
            let block_index = self.add_new_block()?;
            self.update_free_slot_cache(block_index);
        }

        #[cfg(debug_assertions)]
        self.integrity_check();

        Ok(())
    }

    /// Takes a free slot out of the pool, allocating a new block if every block is exhausted.
    ///
    /// The slot's memory is uninitialized. It stays reserved for the caller until it is passed to
    /// [`release()`](Self::release) or the pool is dropped.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AllocationFailed`] if a new block was needed but could not be allocated.
    /// The pool is left unchanged in that case.
    pub fn acquire(&mut self) -> Result<Slot> {
        let block_index = self.index_of_block_with_free_slot()?;

        #[expect(
            clippy::indexing_slicing,
            reason = "we just received knowledge that there is a block with a free slot at this index"
        )]
        let block = &mut self.blocks[block_index];

        // We invalidate the cache here if this is the last free slot in the block.
        if block.free_count() == 1 {
            self.block_with_free_slot_index = None;
        }

        let (index_in_block, ptr) = block.acquire();

        // This can never overflow since that would mean the pool is greater than virtual memory.
        self.length = self.length.wrapping_add(1);

        Ok(Slot::new(
            self.pool_id,
            SlotCoordinates::from_parts(block_index, index_in_block),
            ptr,
            self.layout.object_size(),
        ))
    }

    /// Returns a slot to the pool so it can be handed out again.
    ///
    /// Nothing stored in the slot is dropped. Any pointers into the slot must no longer be used.
    ///
    /// # Panics
    ///
    /// Panics if the slot was acquired from a different pool.
    pub fn release(&mut self, slot: Slot) {
        assert!(
            slot.pool_id == self.pool_id,
            "attempted to release a slot into a different pool (slot pool ID: {}, current pool ID: {})",
            slot.pool_id,
            self.pool_id
        );

        let coordinates = slot.coordinates;

        let block = self
            .blocks
            .get_mut(coordinates.block_index())
            .expect("a slot from this pool always points to an existing block");

        block.release(coordinates.index_in_block());

        // This cannot wrap around because the slot we just released was counted.
        self.length = self.length.wrapping_sub(1);

        self.update_free_slot_cache(coordinates.block_index());
    }

    /// Allocates a block and appends it, returning its index.
    fn add_new_block(&mut self) -> Result<usize> {
        // Make room to track the block first, so a failure leaves no block allocated.
        self.blocks.try_reserve(1).map_err(|reserve_error| {
            tracing::warn!(
                pool_id = self.pool_id,
                block_count = self.blocks.len(),
                %reserve_error,
                "could not grow the block list"
            );

            Error::AllocationFailed {
                layout: Layout::new::<Block>(),
            }
        })?;

        let block = Block::new(self.layout)?;
        self.blocks.push(block);

        // This can never wrap around because we just added a block, so len() is at least 1.
        let block_index = self.blocks.len().wrapping_sub(1);

        tracing::debug!(
            pool_id = self.pool_id,
            block_index,
            block_size = self.layout.block().size(),
            "allocated block"
        );

        Ok(block_index)
    }

    fn index_of_block_with_free_slot(&mut self) -> Result<usize> {
        if let Some(index) = self.block_with_free_slot_index {
            return Ok(index);
        }

        // If every slot is in use, we know we need to add a new block without checking.
        if self.len() == self.capacity() {
            let index = self.add_new_block()?;
            self.set_free_slot_cache(index);
            return Ok(index);
        }

        // We look up the first block with a free slot, filling the pool from the start.
        let index = self
            .blocks
            .iter()
            .position(|block| !block.is_exhausted())
            .expect("since len() != capacity(), at least one block must have free slots");

        self.set_free_slot_cache(index);
        Ok(index)
    }

    /// Remembers the block as having a free slot if it is lower than the one already cached.
    #[cfg_attr(test, mutants::skip)] // This is just a cache, so mutations only cost performance.
    fn update_free_slot_cache(&mut self, block_with_free_slot_index: usize) {
        if self
            .block_with_free_slot_index
            .is_none_or(|current| current > block_with_free_slot_index)
        {
            self.block_with_free_slot_index = Some(block_with_free_slot_index);
        }
    }

    #[cfg_attr(test, mutants::skip)] // This is just a cache, so mutations only cost performance.
    fn set_free_slot_cache(&mut self, block_index: usize) {
        self.block_with_free_slot_index = Some(block_index);
    }

    #[cfg_attr(test, mutants::skip)] // This is essentially test logic, mutation is meaningless.
    #[cfg(debug_assertions)]
    pub(crate) fn integrity_check(&self) {
        for block in &self.blocks {
            block.integrity_check();
        }

        let in_use = self
            .blocks
            .iter()
            .map(|block| block.capacity().wrapping_sub(block.free_count()))
            .sum::<usize>();

        assert_eq!(
            self.length, in_use,
            "self.length {} does not match the slots in use across blocks {}",
            self.length, in_use
        );

        if let Some(index) = self.block_with_free_slot_index {
            let block = self
                .blocks
                .get(index)
                .expect("cached block index must point to an existing block");

            assert!(
                !block.is_exhausted(),
                "cached block {index} is supposed to have a free slot"
            );
        }
    }
}

impl Drop for BlockPool {
    fn drop(&mut self) {
        let in_use = self.length;

        // We release the memory first and check the policy afterwards. Mostly to make Miri happy.
        self.blocks.clear();

        // If we are already panicking, we do not want to panic again because that will
        // simply obscure whatever the original panic was, leading to debug difficulties.
        if !thread::panicking() && matches!(self.drop_policy, DropPolicy::MustNotDropInUseSlots) {
            assert!(
                in_use == 0,
                "dropped a BlockPool with {in_use} slots in use - this is forbidden by DropPolicy::MustNotDropInUseSlots"
            );
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
#[allow(
    clippy::undocumented_unsafe_blocks,
    clippy::multiple_unsafe_ops_per_block,
    clippy::indexing_slicing,
    clippy::cast_possible_truncation,
    reason = "tests focus on succinct code and do not need to tick all the boxes"
)]
mod tests {
    use std::collections::HashSet;
    use std::panic::{AssertUnwindSafe, catch_unwind};

    use static_assertions::{assert_impl_all, assert_not_impl_any};
    use tracing_test::traced_test;

    use super::*;
    use crate::MAX_ALIGNMENT;

    assert_impl_all!(BlockPool: Send, std::fmt::Debug);
    assert_not_impl_any!(BlockPool: Sync);

    #[test]
    fn new_pool_is_empty_and_unallocated() {
        let pool = BlockPool::new(16, nz!(4)).unwrap();

        assert_eq!(pool.len(), 0);
        assert!(pool.is_empty());
        assert_eq!(pool.block_count(), 0);
        assert_eq!(pool.capacity(), 0);
    }

    #[test]
    fn five_acquisitions_from_blocks_of_four() {
        let mut pool = BlockPool::new(16, nz!(4)).unwrap();

        let slots: Vec<_> = (0..5).map(|_| pool.acquire().unwrap()).collect();

        assert_eq!(pool.block_count(), 2);
        assert_eq!(pool.len(), 5);
        assert_eq!(pool.capacity(), 8);

        let addresses: HashSet<_> = slots.iter().map(|slot| slot.ptr().as_ptr() as usize).collect();
        assert_eq!(addresses.len(), 5);

        for address in &addresses {
            assert_eq!(address % MAX_ALIGNMENT, 0);
        }

        for slot in slots {
            pool.release(slot);
        }

        assert!(pool.is_empty());
        pool.integrity_check();
    }

    #[test]
    fn slots_do_not_overlap() {
        let mut pool = BlockPool::new(40, nz!(3)).unwrap();

        let slots: Vec<_> = (0..10).map(|_| pool.acquire().unwrap()).collect();

        let mut ranges: Vec<_> = slots
            .iter()
            .map(|slot| {
                let start = slot.ptr().as_ptr() as usize;
                (start, start + slot.size())
            })
            .collect();
        ranges.sort_unstable();

        for pair in ranges.windows(2) {
            assert!(pair[0].1 <= pair[1].0, "slots overlap: {pair:?}");
        }

        // Every slot can be filled without disturbing any other.
        for (value, slot) in slots.iter().enumerate() {
            unsafe { slot.ptr().write_bytes(value as u8, slot.size()) };
        }

        for (value, slot) in slots.iter().enumerate() {
            let bytes = unsafe { std::slice::from_raw_parts(slot.ptr().as_ptr(), slot.size()) };
            assert!(bytes.iter().all(|b| *b == value as u8));
        }
    }

    #[test]
    fn release_then_acquire_reuses_slot() {
        let mut pool = BlockPool::new(16, nz!(4)).unwrap();

        let first = pool.acquire().unwrap();
        let second = pool.acquire().unwrap();
        let first_address = first.ptr();

        pool.release(first);

        let reacquired = pool.acquire().unwrap();
        assert_eq!(reacquired.ptr(), first_address);
        assert_ne!(reacquired.ptr(), second.ptr());
        assert_eq!(pool.block_count(), 1);
    }

    #[test]
    fn never_hands_out_slot_in_use() {
        let mut pool = BlockPool::new(8, nz!(2)).unwrap();

        let mut in_use = Vec::new();

        for round in 0..50 {
            in_use.push(pool.acquire().unwrap());
            in_use.push(pool.acquire().unwrap());

            // Release every other slot, oldest first.
            let released = in_use.remove(round % in_use.len());
            pool.release(released);

            let addresses: HashSet<_> = in_use.iter().map(Slot::ptr).collect();
            assert_eq!(addresses.len(), in_use.len());
        }

        assert_eq!(pool.len(), in_use.len());
        pool.integrity_check();
    }

    #[test]
    fn refills_lowest_block_first() {
        let mut pool = BlockPool::new(16, nz!(2)).unwrap();

        let slots: Vec<_> = (0..6).map(|_| pool.acquire().unwrap()).collect();
        assert_eq!(pool.block_count(), 3);

        let mut slots = slots.into_iter();
        let block_0_slot = slots.next().unwrap();
        let block_0_address = block_0_slot.ptr();
        _ = slots.next();
        _ = slots.next();
        _ = slots.next();
        let block_2_slot = slots.next().unwrap();

        pool.release(block_2_slot);
        pool.release(block_0_slot);

        let next = pool.acquire().unwrap();
        assert_eq!(next.ptr(), block_0_address);
        assert_eq!(next.coordinates.block_index(), 0);
    }

    #[test]
    fn zero_object_size_is_one_alignment_unit() {
        let mut pool = BlockPool::new(0, nz!(4)).unwrap();

        assert_eq!(pool.object_size(), MAX_ALIGNMENT);

        let a = pool.acquire().unwrap();
        let b = pool.acquire().unwrap();

        assert_ne!(a.ptr(), b.ptr());
        assert_eq!(a.size(), MAX_ALIGNMENT);
    }

    #[test]
    fn object_size_is_rounded() {
        assert_eq!(BlockPool::new(1, nz!(1)).unwrap().object_size(), 16);
        assert_eq!(BlockPool::new(16, nz!(1)).unwrap().object_size(), 16);
        assert_eq!(BlockPool::new(17, nz!(1)).unwrap().object_size(), 32);
    }

    #[test]
    fn unrepresentable_object_size_is_error() {
        let result = BlockPool::new(usize::MAX, nz!(1));

        assert!(matches!(result, Err(Error::CapacityOverflow { .. })));
    }

    #[test]
    fn reserve_allocates_whole_blocks() {
        let mut pool = BlockPool::new(16, nz!(4)).unwrap();

        pool.reserve(0).unwrap();
        assert_eq!(pool.block_count(), 0);

        pool.reserve(5).unwrap();
        assert_eq!(pool.block_count(), 2);
        assert_eq!(pool.capacity(), 8);

        let _slot = pool.acquire().unwrap();

        // 1 in use + 7 more fits into the existing 8.
        pool.reserve(7).unwrap();
        assert_eq!(pool.block_count(), 2);

        pool.reserve(8).unwrap();
        assert_eq!(pool.block_count(), 3);
    }

    #[test]
    fn reserved_capacity_is_used_before_allocating() {
        let mut pool = BlockPool::new(16, nz!(2)).unwrap();

        pool.reserve(4).unwrap();

        let _slots: Vec<_> = (0..4).map(|_| pool.acquire().unwrap()).collect();
        assert_eq!(pool.block_count(), 2);
    }

    #[test]
    #[should_panic]
    fn release_into_wrong_pool_panics() {
        let mut pool_a = BlockPool::new(16, nz!(4)).unwrap();
        let mut pool_b = BlockPool::new(16, nz!(4)).unwrap();

        let slot = pool_a.acquire().unwrap();
        pool_b.release(slot);
    }

    #[test]
    fn drop_with_slots_in_use_is_allowed_by_default() {
        let mut pool = BlockPool::new(16, nz!(4)).unwrap();

        let _slot = pool.acquire().unwrap();

        drop(pool);
    }

    #[test]
    fn must_not_drop_in_use_slots_panics() {
        let mut pool = BlockPool::builder()
            .object_size(16)
            .drop_policy(DropPolicy::MustNotDropInUseSlots)
            .build()
            .unwrap();

        let _slot = pool.acquire().unwrap();

        let result = catch_unwind(AssertUnwindSafe(move || drop(pool)));
        assert!(result.is_err());
    }

    #[test]
    fn must_not_drop_in_use_slots_allows_empty_pool() {
        let mut pool = BlockPool::builder()
            .object_size(16)
            .drop_policy(DropPolicy::MustNotDropInUseSlots)
            .build()
            .unwrap();

        let slot = pool.acquire().unwrap();
        pool.release(slot);

        drop(pool);
    }

    #[test]
    fn pool_ids_are_unique() {
        let a = BlockPool::new(16, nz!(1)).unwrap();
        let b = BlockPool::new(16, nz!(1)).unwrap();

        assert_ne!(a.pool_id, b.pool_id);
    }

    #[test]
    fn slot_can_move_to_another_thread() {
        let mut pool = BlockPool::new(16, nz!(4)).unwrap();

        let slot = pool.acquire().unwrap();

        let slot = thread::spawn(move || {
            unsafe { slot.cast::<u64>().write(7) };
            slot
        })
        .join()
        .unwrap();

        assert_eq!(unsafe { slot.cast::<u64>().read() }, 7);
        pool.release(slot);
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    #[cfg_attr(miri, ignore = "Miri reports oversized allocations as errors")]
    #[traced_test]
    fn allocation_failure_leaves_pool_unchanged() {
        let mut pool = BlockPool::new(1 << 40, nz!(1_048_576)).unwrap();

        let result = pool.acquire();

        assert!(matches!(result, Err(Error::AllocationFailed { .. })));
        assert_eq!(pool.block_count(), 0);
        assert_eq!(pool.len(), 0);
        assert!(pool.is_empty());
        assert!(logs_contain("allocator refused memory for a block"));
    }

    #[test]
    #[traced_test]
    fn structural_events_are_logged() {
        let mut pool = BlockPool::new(16, nz!(4)).unwrap();

        assert!(logs_contain("created block pool"));
        assert!(!logs_contain("allocated block"));

        let _slot = pool.acquire().unwrap();

        assert!(logs_contain("allocated block"));
    }
}
