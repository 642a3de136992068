//! Common types shared across the cache-bank model.
//!
//! This module collects the small vocabulary the rest of the crate speaks:
//! 1. **Addresses:** line-granular address newtype ([`LineAddr`]).
//! 2. **Identifiers:** stable integer ids into the tag/data arenas.
//! 3. **Errors:** configuration validation errors ([`ConfigError`]).

/// Line-granular address type and helpers.
pub mod addr;
/// Configuration and construction error types.
pub mod error;

pub use addr::LineAddr;
pub use error::ConfigError;

/// Index of a tag-directory entry. Stable for the lifetime of a bank.
pub type TagId = u32;

/// Index of a data-store slot (simple variant: one physical line;
/// segmented variant: one associative way-row).
pub type SlotId = u32;

/// Index of a segment within a data slot (segmented variant only).
pub type SegmentId = u32;

/// Size of one storage segment in bytes. Compressed lines occupy a whole
/// number of segments, so every encoded size is a multiple of this.
pub const SEGMENT_BYTES: usize = 8;
