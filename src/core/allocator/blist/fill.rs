//! Forced allocation of a block range
//!
//! `fill` walks the same decomposition as meta `free`, but tolerates blocks
//! that are already allocated and reports how many actually changed state.
//! Hints are left alone: fill only ever shrinks free space, so a stale hint
//! stays an overestimate and the next failed probe tightens it.

use super::node::{materialize, Collapse, Level, Node};
use super::BlockNo;

/// Mark `[alloc_blk, alloc_blk + count)` allocated below `scan[0]`
///
/// `blk` is the first block covered by this subtree. Returns the number of
/// blocks that went from free to allocated.
///
/// # Panics
///
/// Panics if the range runs past the last node of the tree.
pub(crate) fn fill(
    scan: &mut [Node],
    alloc_blk: BlockNo,
    count: BlockNo,
    level: Level,
    blk: BlockNo,
) -> BlockNo {
    let state = Collapse::of(scan[0].meta().avail, level.radix);

    if count == level.radix || state == Collapse::AllAllocated {
        let meta = scan[0].meta_mut();
        let newly = meta.avail;
        meta.avail = 0;
        meta.big_hint = count;
        return newly;
    }

    if state == Collapse::AllFree {
        materialize(scan, level, true);
    }

    let child = level.child();
    let (mut slot, mut base) = level.child_index(blk, alloc_blk);
    let mut alloc_blk = alloc_blk;
    let mut count = count;
    let mut newly = 0;

    while slot <= level.skip && base < alloc_blk + count {
        let v = (base + child.radix - alloc_blk).min(count);

        if scan.get(slot).map_or(true, Node::is_terminator) {
            panic!(
                "blist meta fill: filling unexpected range {}..{}",
                alloc_blk,
                alloc_blk + count
            );
        }

        newly += if level.children_are_leaves() {
            scan[slot].leaf_mut().fill(alloc_blk, v)
        } else {
            fill(&mut scan[slot..], alloc_blk, v, child, base)
        };

        count -= v;
        alloc_blk += v;
        base += child.radix;
        slot += level.next_skip();
    }

    scan[0].meta_mut().avail -= newly;
    newly
}
