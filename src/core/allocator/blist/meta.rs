//! Meta-node allocation and release
//!
//! Every function here takes the sub-slice rooted at the meta node
//! (`scan[0]`) plus its [`Level`], so child positions are pure index
//! arithmetic and no node ever refers to another.

use super::node::{materialize, Collapse, Level, Node};
use super::BlockNo;

/// Allocate `count` contiguous blocks somewhere below `scan[0]`
///
/// `blk` is the first block covered by this subtree. Children whose hint is
/// below `count` are skipped without being visited.
///
/// # Panics
///
/// Panics if `count` is larger than one child's span.
pub(crate) fn alloc(
    scan: &mut [Node],
    blk: BlockNo,
    count: BlockNo,
    level: Level,
) -> Option<BlockNo> {
    match Collapse::of(scan[0].meta().avail, level.radix) {
        Collapse::AllAllocated => {
            scan[0].meta_mut().big_hint = count;
            return None;
        }
        Collapse::AllFree => materialize(scan, level, true),
        Collapse::Mixed => {}
    }

    let child = level.child();
    if count > child.radix {
        panic!(
            "blist meta alloc: allocation too large ({} blocks, child span {})",
            count, child.radix
        );
    }

    let mut base = blk;
    for slot in level.child_slots() {
        let hint = match scan.get(slot).and_then(Node::big_hint) {
            Some(hint) => hint,
            None => break,
        };

        if count <= hint {
            let found = if level.children_are_leaves() {
                scan[slot].leaf_mut().alloc(base, count)
            } else {
                alloc(&mut scan[slot..], base, count, child)
            };

            if let Some(found) = found {
                let meta = scan[0].meta_mut();
                meta.avail -= count;
                meta.big_hint = meta.big_hint.min(meta.avail);
                return Some(found);
            }
        }
        base += child.radix;
    }

    let meta = scan[0].meta_mut();
    if meta.big_hint >= count {
        meta.big_hint = count - 1;
    }
    None
}

/// Mark `[free_blk, free_blk + count)` free below `scan[0]`
///
/// The range may cover any run of children. `blk` is the first block
/// covered by this subtree.
///
/// # Panics
///
/// Panics on a double free, detected either here as `avail` exceeding the
/// subtree's span or at the leaf as an already-set bit.
pub(crate) fn free(
    scan: &mut [Node],
    free_blk: BlockNo,
    count: BlockNo,
    level: Level,
    blk: BlockNo,
) {
    let state = Collapse::of(scan[0].meta().avail, level.radix);

    let avail = {
        let meta = scan[0].meta_mut();
        if state == Collapse::AllAllocated {
            meta.avail = count;
            meta.big_hint = count;
        } else {
            meta.avail += count;
        }
        meta.avail
    };

    if avail > level.radix {
        panic!(
            "blist meta free: freeing already free blocks ({}) {}/{}",
            count, avail, level.radix
        );
    }

    if avail == level.radix {
        // Children go stale; the next alloc rebuilds them as all-free.
        scan[0].meta_mut().big_hint = level.radix;
        return;
    }

    if state == Collapse::AllAllocated {
        materialize(scan, level, false);
    }

    let child = level.child();
    let (mut slot, mut base) = level.child_index(blk, free_blk);
    let mut free_blk = free_blk;
    let mut count = count;

    while slot <= level.skip && base < free_blk + count {
        let v = (base + child.radix - free_blk).min(count);

        if scan.get(slot).map_or(true, Node::is_terminator) {
            panic!(
                "blist meta free: freeing unexpected range {}..{}",
                free_blk,
                free_blk + count
            );
        }

        let child_hint = if level.children_are_leaves() {
            let leaf = scan[slot].leaf_mut();
            leaf.free(free_blk, v);
            leaf.big_hint
        } else {
            free(&mut scan[slot..], free_blk, v, child, base);
            scan[slot].meta().big_hint
        };

        let meta = scan[0].meta_mut();
        meta.big_hint = meta.big_hint.max(child_hint);

        count -= v;
        free_blk += v;
        base += child.radix;
        slot += level.next_skip();
    }
}
