//! Transplanting free state between trees of different sizes

use super::node::{Collapse, Level, Node};
use super::{Blist, BlockNo, LEAF_SPAN};

/// Free in `dest` every block that is free in the first `count` blocks of
/// the source subtree rooted at `scan[0]`
///
/// `dest` must start out allocated over that range. Uniform subtrees are
/// transferred with a single call; mixed leaves go bit by bit.
pub(crate) fn copy(scan: &[Node], blk: BlockNo, level: Level, dest: &mut Blist, count: BlockNo) {
    if level.is_leaf() {
        let bitmap = scan[0].leaf().bitmap;

        if bitmap == !0 {
            dest.free(blk, count);
        } else if bitmap != 0 {
            for j in 0..count.min(LEAF_SPAN) {
                if bitmap & (1 << j) != 0 {
                    dest.free(blk + j, 1);
                }
            }
        }
        return;
    }

    match Collapse::of(scan[0].meta().avail, level.radix) {
        Collapse::AllAllocated => return,
        Collapse::AllFree => {
            dest.free(blk, count.min(level.radix));
            return;
        }
        Collapse::Mixed => {}
    }

    let child = level.child();
    let mut base = blk;
    let mut count = count;

    for slot in level.child_slots() {
        if count == 0 || scan.get(slot).map_or(true, Node::is_terminator) {
            break;
        }

        let v = count.min(child.radix);
        copy(&scan[slot..], base, child, dest, v);
        count -= v;
        base += child.radix;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_copy_mixed_leaf_bit_by_bit() {
        let mut src = Blist::new(64);
        src.free(3, 2);
        src.free(40, 1);

        let mut dest = Blist::new(64);
        copy(src.nodes(), 0, src.level(), &mut dest, 64);

        assert_eq!(dest.free_blocks(), 3);
        assert!(dest.is_free(3) && dest.is_free(4) && dest.is_free(40));
        assert!(!dest.is_free(5));
    }

    #[test]
    fn test_copy_truncates_to_count() {
        let mut src = Blist::new(1024);
        src.free(0, 1024);

        let mut dest = Blist::new(300);
        copy(src.nodes(), 0, src.level(), &mut dest, 300);

        assert_eq!(dest.free_blocks(), 300);
    }

    #[test]
    fn test_copy_skips_allocated_subtrees() {
        let mut src = Blist::new(5000);
        src.free(2048, 1024);
        src.free(4100, 7);

        let mut dest = Blist::new(5000);
        copy(src.nodes(), 0, src.level(), &mut dest, 5000);

        assert_eq!(dest.free_blocks(), 1031);
        for blkno in 0..5000 {
            assert_eq!(dest.is_free(blkno), src.is_free(blkno), "block {}", blkno);
        }
    }
}
