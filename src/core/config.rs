//! Building a ready-to-use pool from configuration
//!
//! Mirrors how a swap device is brought online: the tree starts fully
//! allocated, everything from `free_start` on is freed (keeping a reserved
//! prefix such as a label block out of circulation), and an optional run of
//! `preserve` blocks at the start of the free region is taken back with
//! `fill` so it is never handed out.
//!
//! ```toml
//! blocks = 262144
//! free_start = 1
//! preserve = 4096
//! ```

use crate::allocator::blist::{Blist, BlockNo};
use crate::error::{BlistError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Pool layout
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BlistConfig {
    /// Number of blocks under management
    pub blocks: BlockNo,

    /// First block released to the pool; everything below stays allocated
    pub free_start: BlockNo,

    /// Blocks at `free_start` kept allocated after the release
    pub preserve: BlockNo,
}

impl BlistConfig {
    /// Configuration that frees every block
    pub fn new(blocks: BlockNo) -> Self {
        BlistConfig {
            blocks,
            ..Default::default()
        }
    }

    /// Parse a TOML document
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: BlistConfig = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    /// Check that every region fits inside `blocks`
    pub fn validate(&self) -> Result<()> {
        if self.blocks == 0 {
            return Err(BlistError::InvalidBlockCount(self.blocks));
        }

        if self.free_start > self.blocks {
            return Err(BlistError::RegionOutOfRange {
                start: self.free_start,
                end: self.blocks,
                blocks: self.blocks,
            });
        }

        let preserve_end = self
            .free_start
            .checked_add(self.preserve)
            .filter(|&end| end <= self.blocks);
        if preserve_end.is_none() {
            return Err(BlistError::RegionOutOfRange {
                start: self.free_start,
                end: self.free_start.saturating_add(self.preserve),
                blocks: self.blocks,
            });
        }

        Ok(())
    }

    /// Create the allocator this configuration describes
    ///
    /// # Errors
    ///
    /// Returns a validation error, or `PreserveFailed` if the preserved run
    /// was not entirely free after the release.
    pub fn build(&self) -> Result<Blist> {
        self.validate()?;

        let mut blist = Blist::new(self.blocks);
        blist.free(self.free_start, self.blocks - self.free_start);

        if self.preserve > 0 {
            let filled = blist.fill(self.free_start, self.preserve);
            if filled != self.preserve {
                return Err(BlistError::PreserveFailed {
                    expected: self.preserve,
                    filled,
                });
            }
        }

        info!(
            "Built blist pool: {} blocks, {} reserved, {} preserved, {} free",
            self.blocks,
            self.free_start,
            self.preserve,
            blist.free_blocks()
        );
        Ok(blist)
    }
}

/// Builder for [`BlistConfig`]
///
/// # Examples
///
/// ```
/// use blist_rs::BlistBuilder;
///
/// let mut pool = BlistBuilder::new()
///     .blocks(4096)
///     .reserve_prefix(1)
///     .preserve(63)
///     .build()
///     .unwrap();
///
/// assert_eq!(pool.free_blocks(), 4096 - 64);
/// assert_eq!(pool.alloc(64), Some(64));
/// ```
#[derive(Debug, Clone, Default)]
pub struct BlistBuilder {
    config: BlistConfig,
}

impl BlistBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of blocks under management
    pub fn blocks(mut self, blocks: BlockNo) -> Self {
        self.config.blocks = blocks;
        self
    }

    /// Keep the first `blocks` blocks out of the pool
    pub fn reserve_prefix(mut self, blocks: BlockNo) -> Self {
        self.config.free_start = blocks;
        self
    }

    /// Take back `blocks` blocks right after the reserved prefix
    pub fn preserve(mut self, blocks: BlockNo) -> Self {
        self.config.preserve = blocks;
        self
    }

    /// The configuration built so far
    pub fn config(&self) -> &BlistConfig {
        &self.config
    }

    /// Build the allocator
    pub fn build(self) -> Result<Blist> {
        self.config.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_new_frees_everything() {
        let blist = BlistConfig::new(1000).build().unwrap();
        assert_eq!(blist.free_blocks(), 1000);
    }

    #[test]
    fn test_reserved_prefix_stays_allocated() {
        let blist = BlistBuilder::new()
            .blocks(1000)
            .reserve_prefix(8)
            .build()
            .unwrap();

        assert_eq!(blist.free_blocks(), 992);
        assert!(!blist.is_free(7));
        assert!(blist.is_free(8));
    }

    #[test]
    fn test_preserve_is_filled() {
        let blist = BlistBuilder::new()
            .blocks(5000)
            .reserve_prefix(1)
            .preserve(2000)
            .build()
            .unwrap();

        assert_eq!(blist.free_blocks(), 5000 - 2001);
        assert!(!blist.is_free(2000));
        assert!(blist.is_free(2001));
    }

    #[test]
    fn test_parse_toml() {
        let config = BlistConfig::from_toml_str(
            r#"
            blocks = 262144
            free_start = 1
            preserve = 4096
            "#,
        )
        .unwrap();

        assert_eq!(
            config,
            BlistConfig {
                blocks: 262144,
                free_start: 1,
                preserve: 4096,
            }
        );
    }

    #[test]
    fn test_parse_defaults() {
        let config = BlistConfig::from_toml_str("blocks = 10").unwrap();
        assert_eq!(config, BlistConfig::new(10));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let result = BlistConfig::from_toml_str("blocks = 10\nradix = 16");
        assert!(matches!(result, Err(BlistError::Config(_))));
    }

    #[test]
    fn test_validation_errors() {
        assert!(matches!(
            BlistConfig::new(0).validate(),
            Err(BlistError::InvalidBlockCount(0))
        ));

        let config = BlistConfig {
            blocks: 100,
            free_start: 101,
            preserve: 0,
        };
        assert!(matches!(
            config.validate(),
            Err(BlistError::RegionOutOfRange { start: 101, .. })
        ));

        let config = BlistConfig {
            blocks: 100,
            free_start: 10,
            preserve: 91,
        };
        assert!(matches!(
            config.validate(),
            Err(BlistError::RegionOutOfRange { end: 101, .. })
        ));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "blocks = 2048").unwrap();
        writeln!(file, "free_start = 64").unwrap();

        let blist = BlistConfig::from_file(file.path()).unwrap().build().unwrap();
        assert_eq!(blist.free_blocks(), 1984);
    }

    #[test]
    fn test_missing_file() {
        let result = BlistConfig::from_file("/nonexistent/blist.toml");
        assert!(matches!(result, Err(BlistError::Io(_))));
    }
}
