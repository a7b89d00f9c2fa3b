/// Internal coordinates for tracking slots within the pool structure.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) struct SlotCoordinates {
    /// The index of the block containing this slot.
    block_index: usize,
    /// The index of the slot within its block.
    index_in_block: usize,
}

impl SlotCoordinates {
    #[must_use]
    pub(crate) fn from_parts(block_index: usize, index_in_block: usize) -> Self {
        Self {
            block_index,
            index_in_block,
        }
    }

    #[must_use]
    pub(crate) fn block_index(&self) -> usize {
        self.block_index
    }

    #[must_use]
    pub(crate) fn index_in_block(&self) -> usize {
        self.index_in_block
    }
}
