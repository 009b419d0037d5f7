#![no_main]
use blist_rs::{check_consistency, Blist, BlockAllocator, FlatBitmap, MAX_ALLOC};
use libfuzzer_sys::{arbitrary::{Arbitrary, Unstructured}, fuzz_target};

#[derive(Debug, Arbitrary)]
enum BlistOp {
    Alloc(u8),
    Free { start: u32, len: u16 },
    Fill { start: u32, len: u16 },
}

// Random operation sequences; frees only touch blocks the model says are
// allocated, so every call is valid and the tree must stay consistent.
fuzz_target!(|input: &[u8]| {
    let mut u = Unstructured::new(input);

    let blocks = match u.int_in_range(1..=200_000u64) {
        Ok(blocks) => blocks,
        Err(_) => return,
    };
    let ops: Vec<BlistOp> = match u.arbitrary() {
        Ok(ops) => ops,
        Err(_) => return,
    };

    let mut blist = Blist::new(blocks);
    let mut model = FlatBitmap::new(blocks);

    for op in ops.iter().take(256) {
        match *op {
            BlistOp::Alloc(count) => {
                let count = u64::from(count) % MAX_ALLOC + 1;
                if let Some(start) = blist.alloc(count) {
                    assert_eq!(model.fill(start, count), count, "allocated a busy block");
                }
            }
            BlistOp::Free { start, len } => {
                let start = u64::from(start) % blocks;
                let end = (start + u64::from(len)).min(blocks);
                let mut blkno = start;
                while blkno < end {
                    if model.is_free(blkno) {
                        blkno += 1;
                        continue;
                    }
                    let run_start = blkno;
                    while blkno < end && !model.is_free(blkno) {
                        blkno += 1;
                    }
                    blist.free(run_start, blkno - run_start);
                    model.free(run_start, blkno - run_start);
                }
            }
            BlistOp::Fill { start, len } => {
                let start = u64::from(start) % blocks;
                let len = u64::from(len).min(blocks - start);
                assert_eq!(blist.fill(start, len), model.fill(start, len));
            }
        }
        assert_eq!(blist.free_blocks(), model.free_blocks());
    }

    if let Err(e) = check_consistency(&blist) {
        panic!("inconsistent tree after {} ops: {}", ops.len(), e);
    }
});
