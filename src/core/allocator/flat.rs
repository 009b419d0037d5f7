//! Flat bitmap allocator
//!
//! One bit per block in a plain `Vec<u64>`, every operation a linear scan.
//! It has the same free/fill contracts as the radix tree, which makes it the
//! model property tests compare against and the baseline in benchmarks.

use crate::allocator::blist::{Bitmap, BlockNo, LEAF_SPAN};
use crate::allocator::BlockAllocator;

/// Flat bitmap over `total_blocks` blocks
///
/// Represents free/allocated state with bits:
/// - 1 = free block
/// - 0 = allocated block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlatBitmap {
    /// Bitmap words (each word = 64 blocks)
    bitmap: Vec<Bitmap>,

    /// Total number of blocks tracked
    total_blocks: BlockNo,

    /// Number of free blocks available
    free_blocks: BlockNo,
}

impl FlatBitmap {
    /// Create a flat bitmap with every block allocated
    pub fn new(total_blocks: BlockNo) -> Self {
        let num_words = total_blocks.div_ceil(LEAF_SPAN) as usize;
        FlatBitmap {
            bitmap: vec![0; num_words],
            total_blocks,
            free_blocks: 0,
        }
    }

    /// Lowest-addressed run of `count` free blocks, allocated first fit
    ///
    /// Unlike the radix tree, a run may straddle word boundaries.
    pub fn allocate_contiguous(&mut self, count: BlockNo) -> Option<BlockNo> {
        if count == 0 || count > self.free_blocks {
            return None;
        }

        let mut run_start = 0;
        let mut run_len = 0;

        for blkno in 0..self.total_blocks {
            if self.test(blkno) {
                if run_len == 0 {
                    run_start = blkno;
                }
                run_len += 1;
                if run_len == count {
                    self.fill_range(run_start, count);
                    return Some(run_start);
                }
            } else {
                run_len = 0;
            }
        }
        None
    }

    /// Mark `[blkno, blkno + count)` free
    ///
    /// # Panics
    ///
    /// Panics on an out-of-range argument or if a block is already free.
    pub fn free_range(&mut self, blkno: BlockNo, count: BlockNo) {
        self.check_range(blkno, count);

        for block in blkno..blkno + count {
            if self.test(block) {
                panic!("flat bitmap free: freeing free block {}", block);
            }
            let (word, bit) = Self::locate(block);
            self.bitmap[word] |= 1 << bit;
        }
        self.free_blocks += count;
    }

    /// Mark `[blkno, blkno + count)` allocated, returning how many were free
    pub fn fill_range(&mut self, blkno: BlockNo, count: BlockNo) -> BlockNo {
        self.check_range(blkno, count);

        let mut filled = 0;
        for block in blkno..blkno + count {
            if self.test(block) {
                let (word, bit) = Self::locate(block);
                self.bitmap[word] &= !(1 << bit);
                filled += 1;
            }
        }
        self.free_blocks -= filled;
        filled
    }

    /// Length of the longest free run that fits inside one 64-block word
    ///
    /// This is the largest request the radix tree can satisfy for the
    /// same state.
    pub fn largest_aligned_run(&self) -> BlockNo {
        self.bitmap
            .iter()
            .map(|&word| {
                let mut bits = word;
                let mut run = 0;
                while bits != 0 {
                    bits &= bits << 1;
                    run += 1;
                }
                run
            })
            .max()
            .unwrap_or(0)
    }

    fn test(&self, blkno: BlockNo) -> bool {
        let (word, bit) = Self::locate(blkno);
        self.bitmap[word] & (1 << bit) != 0
    }

    fn locate(blkno: BlockNo) -> (usize, BlockNo) {
        ((blkno / LEAF_SPAN) as usize, blkno % LEAF_SPAN)
    }

    fn check_range(&self, blkno: BlockNo, count: BlockNo) {
        assert!(
            blkno
                .checked_add(count)
                .map_or(false, |end| end <= self.total_blocks),
            "flat bitmap: range {}+{} outside 0..{}",
            blkno,
            count,
            self.total_blocks
        );
    }
}

impl BlockAllocator for FlatBitmap {
    fn allocate(&mut self, count: BlockNo) -> Option<BlockNo> {
        self.allocate_contiguous(count)
    }

    fn free(&mut self, blkno: BlockNo, count: BlockNo) {
        self.free_range(blkno, count)
    }

    fn fill(&mut self, blkno: BlockNo, count: BlockNo) -> BlockNo {
        self.fill_range(blkno, count)
    }

    fn is_free(&self, blkno: BlockNo) -> bool {
        self.check_range(blkno, 1);
        self.test(blkno)
    }

    fn total_blocks(&self) -> BlockNo {
        self.total_blocks
    }

    fn free_blocks(&self) -> BlockNo {
        self.free_blocks
    }
}
