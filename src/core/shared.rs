//! Thread-safe pool over a single [`Blist`]
//!
//! The tree itself has no locking, and even a failed `alloc` updates hints,
//! so there is no reader/writer split: every call goes through one mutex.

use crate::allocator::blist::{Blist, BlockNo, MAX_ALLOC};
use parking_lot::{Mutex, MutexGuard};
use tracing::{debug, warn};

/// A [`Blist`] shared between many requesters
#[derive(Debug)]
pub struct SharedBlist {
    inner: Mutex<Blist>,
}

impl SharedBlist {
    pub fn new(blist: Blist) -> Self {
        SharedBlist {
            inner: Mutex::new(blist),
        }
    }

    /// See [`Blist::alloc`]
    pub fn alloc(&self, count: BlockNo) -> Option<BlockNo> {
        self.inner.lock().alloc(count)
    }

    /// Allocate up to `wanted` contiguous blocks, returning `(start, granted)`
    ///
    /// Without `less_ok` this is a plain allocation that also fails (rather
    /// than panicking) for requests above [`MAX_ALLOC`]. With `less_ok`, an
    /// oversized request is clamped to `MAX_ALLOC`, and if the run still
    /// cannot be placed a single block is tried instead.
    pub fn alloc_slots(&self, wanted: BlockNo, less_ok: bool) -> Option<(BlockNo, BlockNo)> {
        if wanted == 0 {
            return None;
        }

        let mut count = wanted;
        if count > MAX_ALLOC {
            if !less_ok {
                return None;
            }
            count = MAX_ALLOC;
        }

        let mut blist = self.inner.lock();

        if count <= blist.free_blocks() {
            if let Some(start) = blist.alloc(count) {
                debug!("Allocated {} of {} requested blocks at {}", count, wanted, start);
                return Some((start, count));
            }
        }

        if less_ok && count > 1 {
            if let Some(start) = blist.alloc(1) {
                warn!(
                    "No run of {} free blocks, settled for one at {} ({} free)",
                    count,
                    start,
                    blist.free_blocks()
                );
                return Some((start, 1));
            }
        }

        None
    }

    /// See [`Blist::free`]
    pub fn free(&self, blkno: BlockNo, count: BlockNo) {
        self.inner.lock().free(blkno, count)
    }

    /// See [`Blist::fill`]
    pub fn fill(&self, blkno: BlockNo, count: BlockNo) -> BlockNo {
        self.inner.lock().fill(blkno, count)
    }

    /// See [`Blist::resize`]
    pub fn resize(&self, new_count: BlockNo, free_new_space: bool) {
        self.inner.lock().resize(new_count, free_new_space)
    }

    pub fn free_blocks(&self) -> BlockNo {
        self.inner.lock().free_blocks()
    }

    pub fn blocks(&self) -> BlockNo {
        self.inner.lock().blocks()
    }

    /// Hold the lock across several calls
    pub fn lock(&self) -> MutexGuard<'_, Blist> {
        self.inner.lock()
    }

    pub fn into_inner(self) -> Blist {
        self.inner.into_inner()
    }
}

impl From<Blist> for SharedBlist {
    fn from(blist: Blist) -> Self {
        SharedBlist::new(blist)
    }
}
