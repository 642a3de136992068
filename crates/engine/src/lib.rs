//! Deduplicating cache-bank model library.
//!
//! This crate implements the access engine of a deduplicating (and, in one
//! variant, compressing) cache bank inside a cycle-accurate multicore
//! simulator, with the following:
//! 1. **Arrays:** tag directory, reference-counted data stores, fingerprint
//!    index, and replacement policies.
//! 2. **Content:** approximate-region canonicalization, fingerprinting, and
//!    BDI-style compression sizing.
//! 3. **Banks:** the per-request hit/miss state machines for the simple and
//!    segmented variants.
//! 4. **Timing:** per-request event DAG construction under cycle-causality
//!    constraints, resolvable for verification.
//! 5. **Stats:** weighted running aggregates and outcome counters.

/// Storage arrays and replacement policies.
pub mod arrays;
/// The access engines and their simulation context.
pub mod bank;
/// Common types and constants (addresses, ids, errors).
pub mod common;
/// Bank configuration (defaults, validation, JSON parsing).
pub mod config;
/// Content canonicalization, fingerprinting, and compression.
pub mod content;
/// Memory request model and collaborator contracts.
pub mod mem;
/// Statistics collection.
pub mod stats;
/// Timing-event graph construction.
pub mod timing;

/// Bank geometry and latency configuration; use `BankConfig::default()` or
/// deserialize from JSON.
pub use crate::config::BankConfig;
/// Simple deduplicating bank; construct with `DedupBank::new`.
pub use crate::bank::DedupBank;
/// Segmented deduplicating, compressing bank; construct with
/// `DedupBdiBank::new`.
pub use crate::bank::DedupBdiBank;
/// Per-run collaborators handed to every access.
pub use crate::bank::SimContext;
