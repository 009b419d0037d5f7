#![no_main]
use blist_rs::{check_consistency, Blist};
use libfuzzer_sys::{arbitrary::{Arbitrary, Unstructured}, fuzz_target};

#[derive(Debug, Arbitrary)]
struct ResizeStep {
    free_start: u32,
    free_len: u16,
    new_blocks: u32,
    free_new_space: bool,
}

fuzz_target!(|input: &[u8]| {
    let mut u = Unstructured::new(input);

    let steps: Vec<ResizeStep> = match u.arbitrary() {
        Ok(steps) => steps,
        Err(_) => return,
    };

    let mut blist = Blist::new(64);

    for step in steps.iter().take(16) {
        // Only ranges that are entirely allocated get freed.
        let blocks = blist.blocks();
        let start = u64::from(step.free_start) % blocks;
        let len = u64::from(step.free_len).min(blocks - start);
        if len > 0 && (start..start + len).all(|b| !blist.is_free(b)) {
            blist.free(start, len);
        }

        let before: Vec<bool> = (0..blocks).map(|b| blist.is_free(b)).collect();
        let new_blocks = u64::from(step.new_blocks) % 300_000 + 1;
        blist.resize(new_blocks, step.free_new_space);

        for blkno in 0..new_blocks.min(blocks) {
            assert_eq!(blist.is_free(blkno), before[blkno as usize]);
        }
        for blkno in blocks..new_blocks {
            assert_eq!(blist.is_free(blkno), step.free_new_space);
        }
    }

    if let Err(e) = check_consistency(&blist) {
        panic!("inconsistent tree after resize: {}", e);
    }
});
