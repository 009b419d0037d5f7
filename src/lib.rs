//! # blist-rs - Hierarchical Bitmap Block Allocator
//!
//! `blist-rs` tracks which of a fixed number of blocks are free and answers
//! the three questions a paging or swap pool asks, each in time
//! logarithmic in the pool size:
//!
//! - **alloc** `count` contiguous blocks (up to one leaf, [`MAX_ALLOC`])
//! - **free** an arbitrary range
//! - **fill** an arbitrary range, forcing it allocated whatever its state
//!
//! ## Quick Start
//!
//! ```rust
//! use blist_rs::Blist;
//!
//! // A new allocator has every block allocated.
//! let mut blist = Blist::new(64);
//! assert_eq!(blist.alloc(1), None);
//!
//! blist.free(0, 64);
//! assert_eq!(blist.alloc(10), Some(0));
//! assert_eq!(blist.alloc(54), Some(10));
//! assert_eq!(blist.alloc(1), None);
//!
//! // Grow, releasing only the new space.
//! blist.resize(128, true);
//! assert_eq!(blist.free_blocks(), 64);
//! ```
//!
//! ## Shared Pools
//!
//! ```rust
//! use blist_rs::{BlistBuilder, SharedBlist};
//! use std::sync::Arc;
//!
//! # fn main() -> blist_rs::Result<()> {
//! // Block 0 holds a label and never enters the pool.
//! let pool = Arc::new(SharedBlist::new(
//!     BlistBuilder::new().blocks(1 << 16).reserve_prefix(1).build()?,
//! ));
//!
//! let (start, granted) = pool.alloc_slots(200, true).unwrap();
//! assert_eq!((start, granted), (64, 64));
//! pool.free(start, granted);
//! # Ok(())
//! # }
//! ```
//!
//! ## Failure Model
//!
//! Running out of space is ordinary: `alloc` returns `None`. Misuse is not:
//! a double free, a range outside the pool, or an `alloc` above
//! [`MAX_ALLOC`] panics, turning silent corruption into an immediate stop.
//! Recoverable errors ([`BlistError`]) only come from configuration and
//! [`check_consistency`].

pub mod core;
pub mod error;

// Re-export core modules internally so crate:: paths in core still work
#[allow(unused_imports)]
pub(crate) use self::core::{allocator, config, shared, validation};

// Re-export core types that users need
pub use crate::core::{
    allocator::{
        blist::{Bitmap, Blist, BlockNo, LEAF_SPAN, MAX_ALLOC, META_FAN_OUT, NONE},
        flat::FlatBitmap,
        BlockAllocator,
    },
    config::{BlistBuilder, BlistConfig},
    shared::SharedBlist,
    validation::check_consistency,
};
pub use crate::error::{BlistError, Result};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
