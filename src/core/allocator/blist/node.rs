//! Node storage and tree geometry
//!
//! The whole tree lives in one flat slice. A meta node at index `0` of a
//! sub-slice has its children at `1`, `1 + next_skip`, `1 + 2 * next_skip`,
//! and so on, each child followed by its own subtree.

use super::leaf::Leaf;
use super::{BlockNo, LEAF_SPAN, META_FAN_OUT};

/// Aggregate over `META_FAN_OUT` equally sized children
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Meta {
    /// Exact number of free blocks in this subtree
    pub(crate) avail: BlockNo,

    /// Upper bound on the largest run any single child could hand out
    pub(crate) big_hint: BlockNo,
}

impl Meta {
    pub(crate) const ALLOCATED: Meta = Meta {
        avail: 0,
        big_hint: 0,
    };

    pub(crate) fn free(radix: BlockNo) -> Meta {
        Meta {
            avail: radix,
            big_hint: radix,
        }
    }
}

/// One slot of the flat node array
///
/// Depth is implied by position; the variant must agree with it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Node {
    Leaf(Leaf),
    Meta(Meta),
    /// No node at or beyond this slot in the parent's child list
    Terminator,
}

impl Node {
    /// Allocation hint, or `None` at a terminator
    pub(crate) fn big_hint(&self) -> Option<BlockNo> {
        match self {
            Node::Leaf(leaf) => Some(leaf.big_hint),
            Node::Meta(meta) => Some(meta.big_hint),
            Node::Terminator => None,
        }
    }

    pub(crate) fn is_terminator(&self) -> bool {
        matches!(self, Node::Terminator)
    }

    pub(crate) fn leaf(&self) -> &Leaf {
        match self {
            Node::Leaf(leaf) => leaf,
            other => panic!("blist: expected leaf node, found {:?}", other),
        }
    }

    pub(crate) fn leaf_mut(&mut self) -> &mut Leaf {
        match self {
            Node::Leaf(leaf) => leaf,
            other => panic!("blist: expected leaf node, found {:?}", other),
        }
    }

    pub(crate) fn meta(&self) -> &Meta {
        match self {
            Node::Meta(meta) => meta,
            other => panic!("blist: expected meta node, found {:?}", other),
        }
    }

    pub(crate) fn meta_mut(&mut self) -> &mut Meta {
        match self {
            Node::Meta(meta) => meta,
            other => panic!("blist: expected meta node, found {:?}", other),
        }
    }
}

/// Uniform-state shortcut of a meta subtree
///
/// In either collapse the children are stale and must not be read; they
/// are rewritten when the subtree goes back to `Mixed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Collapse {
    AllAllocated,
    Mixed,
    AllFree,
}

impl Collapse {
    pub(crate) fn of(avail: BlockNo, radix: BlockNo) -> Collapse {
        if avail == 0 {
            Collapse::AllAllocated
        } else if avail == radix {
            Collapse::AllFree
        } else {
            Collapse::Mixed
        }
    }
}

/// Shape of the subtree rooted at some slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Level {
    /// Blocks spanned by the subtree
    pub(crate) radix: BlockNo,

    /// Slots occupied by the subtree, not counting its root
    pub(crate) skip: usize,
}

impl Level {
    /// Smallest level that spans `blocks`
    ///
    /// # Panics
    ///
    /// Panics if covering `blocks` would overflow `BlockNo`.
    pub(crate) fn covering(blocks: BlockNo) -> Level {
        let mut level = Level {
            radix: LEAF_SPAN,
            skip: 0,
        };

        while level.radix < blocks {
            level.radix = match level.radix.checked_mul(META_FAN_OUT) {
                Some(radix) => radix,
                None => panic!("blist: {} blocks exceeds the addressable range", blocks),
            };
            level.skip = (level.skip + 1) * META_FAN_OUT as usize;
        }
        level
    }

    pub(crate) fn is_leaf(self) -> bool {
        self.radix == LEAF_SPAN
    }

    /// Slot stride between consecutive children
    pub(crate) fn next_skip(self) -> usize {
        self.skip / META_FAN_OUT as usize
    }

    /// Whether this meta level's children are leaves
    pub(crate) fn children_are_leaves(self) -> bool {
        self.next_skip() == 1
    }

    pub(crate) fn child(self) -> Level {
        Level {
            radix: self.radix / META_FAN_OUT,
            skip: self.next_skip() - 1,
        }
    }

    /// Slot offsets of every potential child, left to right
    pub(crate) fn child_slots(self) -> impl Iterator<Item = usize> {
        (1..=self.skip).step_by(self.next_skip().max(1))
    }

    /// Slot offset of the child covering `blkno`, given the subtree starts at `base`
    pub(crate) fn child_index(self, base: BlockNo, blkno: BlockNo) -> (usize, BlockNo) {
        let child_radix = self.radix / META_FAN_OUT;
        let index = (blkno - base) / child_radix;
        (
            index as usize * self.next_skip() + 1,
            base + index * child_radix,
        )
    }

    /// All-free or all-allocated form of one of this level's children
    pub(crate) fn uniform_child(self, free: bool) -> Node {
        match (self.children_are_leaves(), free) {
            (true, true) => Node::Leaf(Leaf::FREE),
            (true, false) => Node::Leaf(Leaf::ALLOCATED),
            (false, true) => Node::Meta(Meta::free(self.child().radix)),
            (false, false) => Node::Meta(Meta::ALLOCATED),
        }
    }
}

/// Rewrite every child of the meta node at `scan[0]` into a uniform state
///
/// Stops at the first terminator. Used when a subtree leaves a collapse.
pub(crate) fn materialize(scan: &mut [Node], level: Level, free: bool) {
    let child = level.uniform_child(free);
    for slot in level.child_slots() {
        match scan.get_mut(slot) {
            Some(node) if !node.is_terminator() => *node = child,
            _ => break,
        }
    }
}
