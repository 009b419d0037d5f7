//! Block allocation strategies
//!
//! - [`blist`] - radix-tree bitmap allocator, logarithmic in the block count
//! - [`flat`] - one flat bitmap scanned linearly; the reference model the
//!   radix tree is checked and benchmarked against

pub mod blist;
pub mod flat;

use blist::BlockNo;

/// Block allocator trait
///
/// Every implementation starts with all blocks allocated and shares the same
/// contracts: `free` of an already free block and out-of-range arguments
/// are fatal, `fill` never fails.
pub trait BlockAllocator {
    /// Allocate `count` contiguous blocks, returning the first one
    fn allocate(&mut self, count: BlockNo) -> Option<BlockNo>;

    /// Mark a range of allocated blocks free
    fn free(&mut self, blkno: BlockNo, count: BlockNo);

    /// Force a range allocated, returning how many blocks changed state
    fn fill(&mut self, blkno: BlockNo, count: BlockNo) -> BlockNo;

    /// Whether a single block is free
    fn is_free(&self, blkno: BlockNo) -> bool;

    /// Get total number of blocks managed
    fn total_blocks(&self) -> BlockNo;

    /// Get number of free blocks available
    fn free_blocks(&self) -> BlockNo;
}
