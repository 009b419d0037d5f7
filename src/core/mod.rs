//! Core implementation
//!
//! - [`allocator`] - the radix-tree allocator and the flat reference bitmap
//! - [`validation`] - whole-tree consistency checks
//! - [`config`] - building a pool from a TOML description
//! - [`shared`] - a mutex-guarded pool for concurrent requesters

pub mod allocator;
pub mod config;
pub mod shared;
pub mod validation;
