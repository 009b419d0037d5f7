//! Sizing and initialization of the node array

use super::leaf::Leaf;
use super::node::{Level, Meta, Node};
use super::BlockNo;

/// Size and optionally initialize the subtree for `count` blocks
///
/// With `scan == None` nothing is written and only the footprint is
/// computed, so the caller can allocate the array once. With a buffer,
/// every node is written in the all-allocated state and a terminator is
/// placed at the first child slot past `count`.
///
/// Returns the index of the last slot the subtree uses; the array needs
/// one more slot than that.
pub(crate) fn radix_init(mut scan: Option<&mut [Node]>, level: Level, count: BlockNo) -> usize {
    if level.is_leaf() {
        if let Some(scan) = scan {
            scan[0] = Node::Leaf(Leaf::ALLOCATED);
        }
        return 0;
    }

    // Meta node. Even a fully covered subtree is walked so the footprint
    // comes out right.
    if let Some(scan) = scan.as_deref_mut() {
        scan[0] = Node::Meta(Meta::ALLOCATED);
    }

    let child = level.child();
    let mut remaining = count;
    let mut last = 0;
    let mut slot = 1;

    while slot <= level.skip {
        let sub = scan.as_deref_mut().map(|s| &mut s[slot..]);

        if remaining >= child.radix {
            last = slot + radix_init(sub, child, child.radix);
            remaining -= child.radix;
        } else if remaining > 0 {
            last = slot + radix_init(sub, child, remaining);
            remaining = 0;
        } else {
            if let Some(sub) = sub {
                sub[0] = Node::Terminator;
            }
            break;
        }
        slot += level.next_skip();
    }

    last.max(slot)
}
