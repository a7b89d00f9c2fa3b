use std::alloc::Layout;
use std::num::NonZero;

use crate::{Error, Result};

/// The alignment of every slot handed out by a [`BlockPool`][crate::BlockPool].
///
/// Object sizes are rounded up to a multiple of this value, so consecutive slots in a block
/// keep this alignment and any scalar type can be placed in a slot.
pub const MAX_ALIGNMENT: usize = 16;

const _: () = assert!(MAX_ALIGNMENT.is_power_of_two());
const _: () = assert!(MAX_ALIGNMENT >= align_of::<u128>());
const _: () = assert!(MAX_ALIGNMENT >= align_of::<f64>());
const _: () = assert!(MAX_ALIGNMENT >= align_of::<usize>());

// Every free slot stores the index of the next free slot in its leading bytes.
const _: () = assert!(MAX_ALIGNMENT >= size_of::<usize>());

/// Rounds `size` up to the next multiple of [`MAX_ALIGNMENT`].
///
/// A size of zero is treated as one byte, so every slot is large enough to hold a free list link.
/// Returns `None` if the rounded size does not fit in `usize`.
#[must_use]
pub fn aligned_object_size(size: usize) -> Option<usize> {
    size.max(1).checked_next_multiple_of(MAX_ALIGNMENT)
}

/// Size calculations shared by a pool and all its blocks.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) struct BlockLayout {
    /// Size of one slot, a non-zero multiple of [`MAX_ALIGNMENT`].
    object_size: usize,

    objects_per_block: NonZero<usize>,

    /// Layout of the single allocation backing one block.
    block: Layout,
}

impl BlockLayout {
    /// Calculates the slot and block layout for objects of `requested_object_size` bytes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CapacityOverflow`] if the rounded object size or the block size cannot be
    /// represented as a [`Layout`].
    pub(crate) fn calculate(
        requested_object_size: usize,
        objects_per_block: NonZero<usize>,
    ) -> Result<Self> {
        let overflow = || Error::CapacityOverflow {
            object_size: requested_object_size,
            objects_per_block: objects_per_block.get(),
        };

        let object_size = aligned_object_size(requested_object_size).ok_or_else(overflow)?;

        let block_size = object_size
            .checked_mul(objects_per_block.get())
            .ok_or_else(overflow)?;

        let block = Layout::from_size_align(block_size, MAX_ALIGNMENT).map_err(|layout_error| {
            tracing::warn!(
                object_size,
                objects_per_block = objects_per_block.get(),
                %layout_error,
                "block size is not representable"
            );

            overflow()
        })?;

        Ok(Self {
            object_size,
            objects_per_block,
            block,
        })
    }

    #[must_use]
    pub(crate) fn object_size(&self) -> usize {
        self.object_size
    }

    #[must_use]
    pub(crate) fn objects_per_block(&self) -> NonZero<usize> {
        self.objects_per_block
    }

    #[must_use]
    pub(crate) fn block(&self) -> Layout {
        self.block
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use new_zealand::nz;

    use super::*;

    #[test]
    fn rounds_up_to_alignment() {
        assert_eq!(aligned_object_size(1), Some(16));
        assert_eq!(aligned_object_size(16), Some(16));
        assert_eq!(aligned_object_size(17), Some(32));
        assert_eq!(aligned_object_size(100), Some(112));
    }

    #[test]
    fn zero_size_becomes_one_alignment_unit() {
        assert_eq!(aligned_object_size(0), Some(MAX_ALIGNMENT));
    }

    #[test]
    fn rounding_overflow_is_none() {
        assert_eq!(aligned_object_size(usize::MAX), None);
        assert_eq!(aligned_object_size(usize::MAX - 14), None);
    }

    #[test]
    fn calculate_block_layout() {
        let layout = BlockLayout::calculate(24, nz!(10)).unwrap();

        assert_eq!(layout.object_size(), 32);
        assert_eq!(layout.objects_per_block(), nz!(10));
        assert_eq!(layout.block().size(), 320);
        assert_eq!(layout.block().align(), MAX_ALIGNMENT);
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn block_size_overflow_is_error() {
        let result = BlockLayout::calculate(1 << 40, NonZero::new(1 << 40).unwrap());

        assert!(matches!(
            result,
            Err(Error::CapacityOverflow {
                object_size: 0x100_0000_0000,
                ..
            })
        ));
    }

    #[test]
    fn block_size_beyond_isize_is_error() {
        let half = usize::MAX / 2 + 1;
        let result = BlockLayout::calculate(half, nz!(1));

        assert!(matches!(result, Err(Error::CapacityOverflow { .. })));
    }
}
