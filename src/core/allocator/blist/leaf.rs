//! Leaf nodes: one bitmap word covering `LEAF_SPAN` blocks
//!
//! A set bit means the block is free. Leaves answer alloc/free/fill
//! directly at single-block granularity.

use super::{Bitmap, BlockNo, LEAF_SPAN};

/// Bitmap leaf of the radix tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Leaf {
    /// Bit `i` set means block `i` of this leaf is free
    pub(crate) bitmap: Bitmap,

    /// Upper bound on the largest free run in `bitmap`
    pub(crate) big_hint: BlockNo,
}

impl Leaf {
    /// Every block allocated; the state construction leaves behind
    pub(crate) const ALLOCATED: Leaf = Leaf {
        bitmap: 0,
        big_hint: 0,
    };

    /// Every block free; what an all-free parent expands into
    pub(crate) const FREE: Leaf = Leaf {
        bitmap: Bitmap::MAX,
        big_hint: LEAF_SPAN,
    };

    /// Allocate `count` contiguous blocks from this leaf
    ///
    /// `blk` is the absolute block number of bit 0. On failure the hint is
    /// tightened to `count - 1`, which is exact for a single word.
    pub(crate) fn alloc(&mut self, blk: BlockNo, count: BlockNo) -> Option<BlockNo> {
        debug_assert!((1..=LEAF_SPAN).contains(&count));
        let orig = self.bitmap;

        if orig == 0 {
            // The single-bit path below assumes at least one bit is set.
            self.big_hint = 0;
            return None;
        }

        if count == 1 {
            let r = lowest_set_bit(orig);
            self.bitmap &= !(1 << r);
            return Some(blk + BlockNo::from(r));
        }

        let n = LEAF_SPAN - count;
        let mut mask = Bitmap::MAX >> n;
        for j in 0..=n {
            if orig & mask == mask {
                self.bitmap &= !mask;
                return Some(blk + j);
            }
            mask <<= 1;
        }

        self.big_hint = count - 1;
        None
    }

    /// Mark `[blk, blk + count)` free; the range must lie inside this leaf
    ///
    /// # Panics
    ///
    /// Panics if any block in the range is already free.
    pub(crate) fn free(&mut self, blk: BlockNo, count: BlockNo) {
        let mask = range_mask(blk, count);

        if self.bitmap & mask != 0 {
            panic!(
                "blist leaf free: freeing free block in {}..{} (bitmap {:#018x})",
                blk,
                blk + count,
                self.bitmap
            );
        }
        self.bitmap |= mask;

        // Could be tighter, but it only has to be an upper bound; the next
        // failed probe corrects it.
        self.big_hint = LEAF_SPAN;
    }

    /// Mark `[blk, blk + count)` allocated regardless of prior state
    ///
    /// Returns how many of those blocks were free before the call.
    pub(crate) fn fill(&mut self, blk: BlockNo, count: BlockNo) -> BlockNo {
        let mask = range_mask(blk, count);
        let newly = BlockNo::from((self.bitmap & mask).count_ones());
        self.bitmap &= !mask;
        newly
    }

    /// Length of the longest run of free blocks in this leaf
    pub(crate) fn largest_free_run(&self) -> BlockNo {
        let mut bits = self.bitmap;
        let mut run = 0;
        while bits != 0 {
            bits &= bits << 1;
            run += 1;
        }
        run
    }
}

/// Mask selecting `count` bits starting at `blk`'s offset inside its leaf
pub(crate) fn range_mask(blk: BlockNo, count: BlockNo) -> Bitmap {
    let n = blk & (LEAF_SPAN - 1);
    debug_assert!(count >= 1 && n + count <= LEAF_SPAN);
    (Bitmap::MAX << n) & (Bitmap::MAX >> (LEAF_SPAN - count - n))
}

/// Index of the lowest set bit, found by halving the search window
fn lowest_set_bit(bitmap: Bitmap) -> u32 {
    let mut orig = bitmap;
    let mut j = Bitmap::BITS / 2;
    let mut mask = Bitmap::MAX >> j;
    let mut r = 0;

    while j != 0 {
        if orig & mask == 0 {
            r += j;
            orig >>= j;
        }
        j >>= 1;
        mask >>= j;
    }
    r
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lowest_set_bit_matches_trailing_zeros() {
        for shift in 0..64 {
            let bitmap: Bitmap = 1 << shift;
            assert_eq!(lowest_set_bit(bitmap), shift);
            assert_eq!(lowest_set_bit(bitmap | (1 << 63)), shift);
        }
        assert_eq!(lowest_set_bit(0b1011_0000), 4);
        assert_eq!(lowest_set_bit(Bitmap::MAX), 0);
    }

    #[test]
    fn test_range_mask() {
        assert_eq!(range_mask(0, 1), 0b1);
        assert_eq!(range_mask(3, 2), 0b11000);
        assert_eq!(range_mask(64, 64), Bitmap::MAX);
        assert_eq!(range_mask(130, 62), Bitmap::MAX << 2);
        assert_eq!(range_mask(63, 1), 1 << 63);
    }

    #[test]
    fn test_alloc_from_empty_leaf_fails() {
        let mut leaf = Leaf {
            bitmap: 0,
            big_hint: 40,
        };
        assert_eq!(leaf.alloc(0, 1), None);
        assert_eq!(leaf.big_hint, 0);
    }

    #[test]
    fn test_alloc_single_takes_lowest_free_block() {
        let mut leaf = Leaf {
            bitmap: 0b1010_0000,
            big_hint: LEAF_SPAN,
        };
        assert_eq!(leaf.alloc(128, 1), Some(133));
        assert_eq!(leaf.bitmap, 0b1000_0000);
        assert_eq!(leaf.alloc(128, 1), Some(135));
        assert_eq!(leaf.bitmap, 0);
    }

    #[test]
    fn test_alloc_contiguous_first_fit() {
        // Free blocks 2..4 and 8..13
        let mut leaf = Leaf {
            bitmap: 0b1_1111_0000_1100,
            big_hint: LEAF_SPAN,
        };
        assert_eq!(leaf.alloc(64, 3), Some(72));
        assert_eq!(leaf.bitmap, 0b1_1000_0000_1100);
        assert_eq!(leaf.alloc(64, 2), Some(66));
        assert_eq!(leaf.bitmap, 0b1_1000_0000_0000);
    }

    #[test]
    fn test_alloc_failure_sets_exact_hint() {
        let mut leaf = Leaf {
            bitmap: 0b0111_0111,
            big_hint: LEAF_SPAN,
        };
        assert_eq!(leaf.alloc(0, 4), None);
        assert_eq!(leaf.big_hint, 3);
        assert_eq!(leaf.bitmap, 0b0111_0111);
    }

    #[test]
    fn test_alloc_whole_leaf() {
        let mut leaf = Leaf::FREE;
        assert_eq!(leaf.alloc(0, LEAF_SPAN), Some(0));
        assert_eq!(leaf.bitmap, 0);

        let mut leaf = Leaf::FREE;
        leaf.fill(10, 1);
        assert_eq!(leaf.alloc(0, LEAF_SPAN), None);
        assert_eq!(leaf.big_hint, LEAF_SPAN - 1);
    }

    #[test]
    fn test_free_sets_bits_and_hint() {
        let mut leaf = Leaf::ALLOCATED;
        leaf.free(67, 5);
        assert_eq!(leaf.bitmap, 0b1111_1000);
        assert_eq!(leaf.big_hint, LEAF_SPAN);
    }

    #[test]
    #[should_panic(expected = "freeing free block")]
    fn test_double_free_panics() {
        let mut leaf = Leaf::ALLOCATED;
        leaf.free(0, 4);
        leaf.free(3, 2);
    }

    #[test]
    fn test_fill_counts_transitions() {
        let mut leaf = Leaf {
            bitmap: 0b1100_1100,
            big_hint: LEAF_SPAN,
        };
        assert_eq!(leaf.fill(0, 8), 4);
        assert_eq!(leaf.bitmap, 0);
        assert_eq!(leaf.fill(0, 8), 0);
    }

    #[test]
    fn test_largest_free_run() {
        assert_eq!(Leaf::ALLOCATED.largest_free_run(), 0);
        assert_eq!(Leaf::FREE.largest_free_run(), LEAF_SPAN);
        let leaf = Leaf {
            bitmap: 0b0111_1101_1100,
            big_hint: 0,
        };
        assert_eq!(leaf.largest_free_run(), 5);
    }
}
