//! Radix-tree bitmap block allocator ("blist")
//!
//! Tracks which of a fixed universe of blocks are free and answers, in time
//! proportional to the tree depth:
//!
//! - [`Blist::alloc`] - find `count` contiguous free blocks (at most
//!   [`MAX_ALLOC`] per call)
//! - [`Blist::free`] - mark an arbitrary range free
//! - [`Blist::fill`] - force an arbitrary range allocated
//!
//! ## Layout
//!
//! ```text
//!             [meta]                       radix = 1024, skip = 16
//!     ┌─────┬──┴──┬─────┬── ... ──┐
//!   [leaf][leaf][leaf][term]            radix = 64, one bit per block
//! ```
//!
//! The tree is stored in a single array, root first, each node's children
//! laid out contiguously right after it. Leaves hold a 64-bit bitmap; meta
//! nodes hold an exact free count (`avail`) plus a `big_hint` upper bound
//! on the largest run a child could satisfy, used to prune the search.
//! A meta node whose `avail` is `0` or its full radix is *collapsed*: its
//! children are stale and are only rebuilt when the subtree becomes mixed.
//!
//! A new tree is entirely allocated. Nothing can be handed out until it has
//! been freed.
//!
//! The structure has no internal locking; callers that share it must
//! serialize every call (see [`crate::core::shared::SharedBlist`]).

mod copy;
mod fill;
mod init;
mod leaf;
mod meta;
mod node;

pub(crate) use leaf::Leaf;
pub(crate) use node::{Collapse, Level, Meta, Node};

use crate::allocator::BlockAllocator;
use tracing::{debug, trace};

/// Block number or block count
pub type BlockNo = u64;

/// One leaf's worth of free/allocated bits; a set bit is a free block
pub type Bitmap = u64;

/// Blocks covered by one leaf
pub const LEAF_SPAN: BlockNo = Bitmap::BITS as BlockNo;

/// Children per meta node
pub const META_FAN_OUT: BlockNo = 16;

/// Largest run a single [`Blist::alloc`] call may request
pub const MAX_ALLOC: BlockNo = LEAF_SPAN;

/// Never a valid block number
///
/// Kept for callers that store allocation results in a plain integer;
/// [`Blist::alloc`] itself reports failure as `None`.
pub const NONE: BlockNo = BlockNo::MAX;

/// Hierarchical bitmap allocator over `blocks` blocks
#[derive(Debug, Clone)]
pub struct Blist {
    /// Number of blocks under management
    blocks: BlockNo,

    /// Shape of the whole tree
    level: Level,

    /// Free blocks across the whole tree
    free: BlockNo,

    /// Flat node array, root at index 0
    nodes: Vec<Node>,
}

impl Blist {
    /// Create an allocator for `blocks` blocks, all initially allocated
    ///
    /// # Panics
    ///
    /// Panics if `blocks` cannot be covered without overflowing [`BlockNo`].
    pub fn new(blocks: BlockNo) -> Self {
        let level = Level::covering(blocks);

        let slots = 1 + init::radix_init(None, level, blocks);
        let mut nodes = vec![Node::Terminator; slots];
        init::radix_init(Some(&mut nodes), level, blocks);

        debug!(
            "Created blist: {} blocks, radix {}, skip {}, {} node slots",
            blocks, level.radix, level.skip, slots
        );

        Blist {
            blocks,
            level,
            free: 0,
            nodes,
        }
    }

    /// Release the allocator and its node array
    pub fn destroy(self) {
        debug!(
            "Destroying blist: {} blocks, {} free",
            self.blocks, self.free
        );
    }

    /// Allocate `count` contiguous blocks, returning the first one
    ///
    /// Returns `None` if no run of that length is currently free. A failed
    /// probe may tighten internal hints, so this takes `&mut self` even
    /// when nothing is allocated.
    ///
    /// # Panics
    ///
    /// Panics unless `1 <= count <= MAX_ALLOC`.
    pub fn alloc(&mut self, count: BlockNo) -> Option<BlockNo> {
        assert!(
            (1..=MAX_ALLOC).contains(&count),
            "blist alloc: count {} outside 1..={}",
            count,
            MAX_ALLOC
        );

        let found = if self.level.is_leaf() {
            self.nodes[0].leaf_mut().alloc(0, count)
        } else {
            meta::alloc(&mut self.nodes, 0, count, self.level)
        };

        match found {
            Some(_) => self.free -= count,
            None => trace!("blist alloc of {} failed, {} blocks free", count, self.free),
        }
        found
    }

    /// Mark `[blkno, blkno + count)` free
    ///
    /// The range may span any number of leaves.
    ///
    /// # Panics
    ///
    /// Panics if the range leaves `[0, blocks)` or if any block in it is
    /// already free.
    pub fn free(&mut self, blkno: BlockNo, count: BlockNo) {
        if count == 0 {
            return;
        }
        self.check_range("free", blkno, count);

        if self.level.is_leaf() {
            self.nodes[0].leaf_mut().free(blkno, count);
        } else {
            meta::free(&mut self.nodes, blkno, count, self.level, 0);
        }
        self.free += count;
    }

    /// Mark `[blkno, blkno + count)` allocated regardless of its state
    ///
    /// Returns how many blocks in the range were free before the call.
    ///
    /// # Panics
    ///
    /// Panics if the range leaves `[0, blocks)`.
    pub fn fill(&mut self, blkno: BlockNo, count: BlockNo) -> BlockNo {
        if count == 0 {
            return 0;
        }
        self.check_range("fill", blkno, count);

        let filled = if self.level.is_leaf() {
            self.nodes[0].leaf_mut().fill(blkno, count)
        } else {
            fill::fill(&mut self.nodes, blkno, count, self.level, 0)
        };
        self.free -= filled;
        filled
    }

    /// Rebuild the allocator for `new_count` blocks
    ///
    /// Free state of the first `min(blocks, new_count)` blocks carries over.
    /// When growing, the added blocks start free if `free_new_space` is set
    /// and allocated otherwise. Costs time linear in the old size.
    pub fn resize(&mut self, new_count: BlockNo, free_new_space: bool) {
        let mut resized = Blist::new(new_count);
        let keep = self.blocks.min(new_count);

        copy::copy(&self.nodes, 0, self.level, &mut resized, keep);

        if free_new_space && keep < new_count {
            resized.free(keep, new_count - keep);
        }

        debug!(
            "Resized blist from {} to {} blocks, {} free",
            self.blocks, new_count, resized.free
        );

        let old = std::mem::replace(self, resized);
        old.destroy();
    }

    /// Whether `blkno` is currently free
    ///
    /// # Panics
    ///
    /// Panics if `blkno >= blocks`.
    pub fn is_free(&self, blkno: BlockNo) -> bool {
        self.check_range("is_free", blkno, 1);

        let mut level = self.level;
        let mut base = 0;
        let mut index = 0;

        while !level.is_leaf() {
            match Collapse::of(self.nodes[index].meta().avail, level.radix) {
                Collapse::AllAllocated => return false,
                Collapse::AllFree => return true,
                Collapse::Mixed => {}
            }
            let (slot, child_base) = level.child_index(base, blkno);
            index += slot;
            base = child_base;
            level = level.child();
        }

        self.nodes[index].leaf().bitmap & leaf::range_mask(blkno, 1) != 0
    }

    /// Number of blocks under management
    pub fn blocks(&self) -> BlockNo {
        self.blocks
    }

    /// Blocks spanned by the root; a power of the fan-out times [`LEAF_SPAN`]
    pub fn radix(&self) -> BlockNo {
        self.level.radix
    }

    /// Number of free blocks
    pub fn free_blocks(&self) -> BlockNo {
        self.free
    }

    /// Length of the backing node array
    pub fn node_slots(&self) -> usize {
        self.nodes.len()
    }

    pub(crate) fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub(crate) fn level(&self) -> Level {
        self.level
    }

    #[cfg(test)]
    pub(crate) fn nodes_mut(&mut self) -> &mut [Node] {
        &mut self.nodes
    }

    fn check_range(&self, op: &str, blkno: BlockNo, count: BlockNo) {
        let in_range = blkno
            .checked_add(count)
            .map_or(false, |end| end <= self.blocks);
        assert!(
            in_range,
            "blist {}: range {}+{} outside 0..{}",
            op, blkno, count, self.blocks
        );
    }
}

impl BlockAllocator for Blist {
    fn allocate(&mut self, count: BlockNo) -> Option<BlockNo> {
        self.alloc(count)
    }

    fn free(&mut self, blkno: BlockNo, count: BlockNo) {
        Blist::free(self, blkno, count)
    }

    fn fill(&mut self, blkno: BlockNo, count: BlockNo) -> BlockNo {
        Blist::fill(self, blkno, count)
    }

    fn is_free(&self, blkno: BlockNo) -> bool {
        Blist::is_free(self, blkno)
    }

    fn total_blocks(&self) -> BlockNo {
        self.blocks
    }

    fn free_blocks(&self) -> BlockNo {
        self.free
    }
}
