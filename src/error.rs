use crate::allocator::blist::BlockNo;
use thiserror::Error;

/// Recoverable errors
///
/// Allocation failure is not an error (`alloc` returns `None`), and misuse
/// such as a double free panics. What remains is configuration and
/// consistency checking.
#[derive(Error, Debug)]
pub enum BlistError {
    #[error("Invalid block count: {0}")]
    InvalidBlockCount(BlockNo),

    #[error("Region {start}..{end} outside 0..{blocks}")]
    RegionOutOfRange {
        start: BlockNo,
        end: BlockNo,
        blocks: BlockNo,
    },

    #[error("Unable to preserve {expected} blocks: only {filled} were free")]
    PreserveFailed { expected: BlockNo, filled: BlockNo },

    #[error("Consistency check failed: {0}")]
    Corrupted(String),

    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, BlistError>;
