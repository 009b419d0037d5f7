//! Structural consistency checks for the radix tree
//!
//! Walks every node that is not hidden under a collapse and verifies the
//! invariants the allocator relies on. Meant for tests, fuzzing and
//! post-mortem checks, not for the allocation path.

use crate::allocator::blist::{Blist, BlockNo, Collapse, Level, Node, LEAF_SPAN};
use crate::error::{BlistError, Result};

/// What a subtree contributes to its parent
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Summary {
    /// Free blocks in the subtree
    free: BlockNo,

    /// Longest free run inside any single leaf of the subtree
    largest_run: BlockNo,
}

/// Verify every invariant of `blist`
///
/// # Errors
///
/// Returns `Corrupted` naming the first violation found:
/// - a meta node's `avail` above its radix, or not matching its children
/// - a free block at or beyond `blocks()`
/// - an all-free collapse over a partially populated subtree
/// - a `big_hint` below the largest run a single leaf could hand out
/// - a missing or misplaced terminator
/// - a tracked free count that disagrees with the recount
pub fn check_consistency(blist: &Blist) -> Result<()> {
    let summary = check_subtree(blist.nodes(), 0, blist.level(), blist.blocks())?;

    if summary.free != blist.free_blocks() {
        return Err(corrupted(format!(
            "tracked free count {} but tree holds {}",
            blist.free_blocks(),
            summary.free
        )));
    }
    Ok(())
}

fn check_subtree(scan: &[Node], blk: BlockNo, level: Level, count: BlockNo) -> Result<Summary> {
    let node = scan
        .first()
        .ok_or_else(|| corrupted(format!("node array ends before block {}", blk)))?;

    if level.is_leaf() {
        let leaf = match node {
            Node::Leaf(leaf) => leaf,
            other => return Err(corrupted(format!("block {}: expected leaf, found {:?}", blk, other))),
        };

        if count < LEAF_SPAN && leaf.bitmap >> count != 0 {
            return Err(corrupted(format!(
                "leaf at block {}: blocks past the end are free ({:#018x})",
                blk, leaf.bitmap
            )));
        }

        let summary = Summary {
            free: BlockNo::from(leaf.bitmap.count_ones()),
            largest_run: leaf.largest_free_run(),
        };
        check_hint(blk, leaf.big_hint, summary.largest_run)?;
        return Ok(summary);
    }

    let meta = match node {
        Node::Meta(meta) => meta,
        other => return Err(corrupted(format!("block {}: expected meta, found {:?}", blk, other))),
    };

    if meta.avail > level.radix {
        return Err(corrupted(format!(
            "meta at block {}: avail {} exceeds radix {}",
            blk, meta.avail, level.radix
        )));
    }

    match Collapse::of(meta.avail, level.radix) {
        Collapse::AllAllocated => return Ok(Summary::default()),
        Collapse::AllFree => {
            if count < level.radix {
                return Err(corrupted(format!(
                    "meta at block {}: all free but only {} of {} blocks exist",
                    blk, count, level.radix
                )));
            }
            let summary = Summary {
                free: level.radix,
                largest_run: LEAF_SPAN,
            };
            check_hint(blk, meta.big_hint, summary.largest_run)?;
            return Ok(summary);
        }
        Collapse::Mixed => {}
    }

    let child = level.child();
    let mut total = Summary::default();
    let mut remaining = count;
    let mut base = blk;

    for slot in level.child_slots() {
        let node = scan.get(slot);

        if remaining == 0 {
            // Construction terminates a short child list at the first unused slot.
            if node.map_or(true, Node::is_terminator) {
                break;
            }
            return Err(corrupted(format!(
                "meta at block {}: expected terminator at slot {}",
                blk, slot
            )));
        }
        if node.map_or(true, Node::is_terminator) {
            return Err(corrupted(format!(
                "meta at block {}: terminator at slot {} with {} blocks left",
                blk, slot, remaining
            )));
        }

        let span = remaining.min(child.radix);
        let summary = check_subtree(&scan[slot..], base, child, span)?;
        total.free += summary.free;
        total.largest_run = total.largest_run.max(summary.largest_run);

        remaining -= span;
        base += child.radix;
    }

    if total.free != meta.avail {
        return Err(corrupted(format!(
            "meta at block {}: avail {} but children hold {}",
            blk, meta.avail, total.free
        )));
    }
    check_hint(blk, meta.big_hint, total.largest_run)?;

    Ok(total)
}

fn check_hint(blk: BlockNo, big_hint: BlockNo, largest_run: BlockNo) -> Result<()> {
    if big_hint < largest_run {
        return Err(corrupted(format!(
            "node at block {}: big_hint {} below free run of {}",
            blk, big_hint, largest_run
        )));
    }
    Ok(())
}

fn corrupted(message: String) -> BlistError {
    BlistError::Corrupted(message)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_corrupted(blist: &Blist, needle: &str) {
        match check_consistency(blist) {
            Err(BlistError::Corrupted(message)) => {
                assert!(message.contains(needle), "unexpected message: {}", message)
            }
            other => panic!("expected corruption, got {:?}", other),
        }
    }

    #[test]
    fn test_fresh_trees_are_consistent() {
        for blocks in [0, 1, 64, 100, 1024, 1025, 5000, 70_000] {
            check_consistency(&Blist::new(blocks)).unwrap();
        }
    }

    #[test]
    fn test_consistent_after_operations() {
        let mut blist = Blist::new(5000);
        blist.free(0, 5000);
        blist.alloc(64).unwrap();
        blist.alloc(3).unwrap();
        blist.fill(1000, 1500);
        blist.free(1200, 100);
        // The second leaf is down to 61 free blocks, so 64 comes from the third.
        assert_eq!(blist.alloc(64), Some(128));
        check_consistency(&blist).unwrap();
    }

    #[test]
    fn test_detects_free_count_drift() {
        let mut blist = Blist::new(1000);
        blist.free(0, 10);
        if let Node::Meta(meta) = &mut blist.nodes_mut()[0] {
            meta.avail = 11;
        }
        assert_corrupted(&blist, "children hold 10");
    }

    #[test]
    fn test_detects_free_block_past_end() {
        let mut blist = Blist::new(100);
        blist.free(0, 10);
        if let Node::Leaf(leaf) = &mut blist.nodes_mut()[2] {
            leaf.bitmap |= 1 << 50;
        }
        assert_corrupted(&blist, "past the end");
    }

    #[test]
    fn test_detects_low_hint() {
        let mut blist = Blist::new(1000);
        blist.free(0, 100);
        if let Node::Leaf(leaf) = &mut blist.nodes_mut()[1] {
            leaf.big_hint = 3;
        }
        assert_corrupted(&blist, "big_hint 3");
    }

    #[test]
    fn test_detects_missing_terminator() {
        let mut blist = Blist::new(100);
        blist.free(0, 10);
        let leaf = blist.nodes()[2];
        blist.nodes_mut()[3] = leaf;
        assert_corrupted(&blist, "expected terminator");
    }
}
