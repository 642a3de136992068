//! The access engines.
//!
//! This module ties the arrays, content matching, and timing-graph builders
//! into the two bank variants:
//! 1. **[`DedupBank`]:** deduplication only, with a fingerprint index
//!    ([`dedup`]).
//! 2. **[`DedupBdiBank`]:** deduplication plus BDI size accounting over
//!    segmented rows ([`dedup_bdi`]).
//! 3. **[`SimContext`]:** the per-run collaborators both engines consume
//!    ([`context`]).

/// Simulation context and deferred-writeback outcomes.
pub mod context;
/// Simple deduplicating bank.
pub mod dedup;
/// Segmented deduplicating, compressing bank.
pub mod dedup_bdi;

pub use context::{SimContext, WritebackResume};
pub use dedup::DedupBank;
pub use dedup_bdi::DedupBdiBank;
