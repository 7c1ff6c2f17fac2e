//! Unique identifier allocation for sheetdb
//!
//! Produces record identifiers under one of four strategies and keeps
//! them unique against a known set of existing identifiers with a bounded
//! retry loop. The backing store offers no uniqueness constraint of its
//! own, so callers pass in the full existing-identifier set.

pub mod allocator;
pub mod strategy;

pub use allocator::{IdAllocator, DEFAULT_PREFIX, MAX_ATTEMPTS};
pub use strategy::IdStrategy;
