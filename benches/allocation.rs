//! Benchmarks for the radix tree against the flat bitmap baseline

use blist_rs::{Blist, BlockAllocator, BlockNo, FlatBitmap};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

const POOL_SIZES: [BlockNo; 3] = [4 * 1024, 64 * 1024, 1024 * 1024];

fn free_pool<A: BlockAllocator>(mut allocator: A) -> A {
    let blocks = allocator.total_blocks();
    allocator.free(0, blocks);
    allocator
}

/// Leave every other block free except for one 64-block run at the very end
fn fragmented_pool<A: BlockAllocator>(allocator: A) -> A {
    let mut allocator = free_pool(allocator);
    let blocks = allocator.total_blocks();
    for blkno in (0..blocks - 64).step_by(2) {
        allocator.fill(blkno, 1);
    }
    allocator
}

fn benchmark_alloc_free(c: &mut Criterion) {
    let mut group = c.benchmark_group("alloc_free_16");

    for &blocks in POOL_SIZES.iter() {
        group.bench_with_input(BenchmarkId::new("blist", blocks), &blocks, |b, &blocks| {
            let mut blist = free_pool(Blist::new(blocks));
            b.iter(|| {
                let start = blist.alloc(black_box(16)).unwrap();
                blist.free(start, 16);
            });
        });

        group.bench_with_input(BenchmarkId::new("flat", blocks), &blocks, |b, &blocks| {
            let mut flat = free_pool(FlatBitmap::new(blocks));
            b.iter(|| {
                let start = flat.allocate(black_box(16)).unwrap();
                flat.free(start, 16);
            });
        });
    }

    group.finish();
}

fn benchmark_alloc_fragmented(c: &mut Criterion) {
    let mut group = c.benchmark_group("alloc_fragmented_64");
    group.sample_size(20);

    for &blocks in POOL_SIZES.iter() {
        group.bench_with_input(BenchmarkId::new("blist", blocks), &blocks, |b, &blocks| {
            let blist = fragmented_pool(Blist::new(blocks));
            b.iter_batched(
                || blist.clone(),
                |mut blist| black_box(blist.alloc(64)),
                criterion::BatchSize::LargeInput,
            );
        });

        group.bench_with_input(BenchmarkId::new("flat", blocks), &blocks, |b, &blocks| {
            let flat = fragmented_pool(FlatBitmap::new(blocks));
            b.iter_batched(
                || flat.clone(),
                |mut flat| black_box(flat.allocate(64)),
                criterion::BatchSize::LargeInput,
            );
        });
    }

    group.finish();
}

fn benchmark_free_large_range(c: &mut Criterion) {
    let mut group = c.benchmark_group("free_whole_pool");

    for &blocks in POOL_SIZES.iter() {
        group.bench_with_input(BenchmarkId::new("blist", blocks), &blocks, |b, &blocks| {
            b.iter(|| {
                let mut blist = Blist::new(blocks);
                blist.free(0, black_box(blocks));
                blist
            });
        });

        group.bench_with_input(BenchmarkId::new("flat", blocks), &blocks, |b, &blocks| {
            b.iter(|| {
                let mut flat = FlatBitmap::new(blocks);
                flat.free(0, black_box(blocks));
                flat
            });
        });
    }

    group.finish();
}

fn benchmark_fill(c: &mut Criterion) {
    let mut group = c.benchmark_group("fill_half_pool");

    for &blocks in POOL_SIZES.iter() {
        group.bench_with_input(BenchmarkId::new("blist", blocks), &blocks, |b, &blocks| {
            let blist = free_pool(Blist::new(blocks));
            b.iter_batched(
                || blist.clone(),
                |mut blist| black_box(blist.fill(blocks / 4, blocks / 2)),
                criterion::BatchSize::LargeInput,
            );
        });
    }

    group.finish();
}

fn benchmark_resize(c: &mut Criterion) {
    let mut group = c.benchmark_group("resize_double");
    group.sample_size(20);

    for &blocks in POOL_SIZES.iter() {
        group.bench_with_input(BenchmarkId::from_parameter(blocks), &blocks, |b, &blocks| {
            let blist = fragmented_pool(Blist::new(blocks));
            b.iter_batched(
                || blist.clone(),
                |mut blist| {
                    blist.resize(blocks * 2, true);
                    blist
                },
                criterion::BatchSize::LargeInput,
            );
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    benchmark_alloc_free,
    benchmark_alloc_fragmented,
    benchmark_free_large_range,
    benchmark_fill,
    benchmark_resize
);
criterion_main!(benches);
