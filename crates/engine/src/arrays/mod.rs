//! Storage arrays of a bank.
//!
//! This module provides the four array structures the access engines are
//! built from:
//! 1. **Tag directory:** address-to-storage mapping and sharing-list links
//!    ([`tag`]).
//! 2. **Simple data store:** one reference-counted slot per line ([`data`]).
//! 3. **Segmented data store:** rows of 8-byte segments with compressed-size
//!    accounting ([`bdi`]).
//! 4. **Fingerprint index:** content-hash hints into the simple store
//!    ([`fingerprint`]).
//!
//! Replacement decisions inside every array go through the pluggable
//! [`policies::ReplacementPolicy`] trait.

/// Segmented data store.
pub mod bdi;
/// Simple deduplicated data store.
pub mod data;
/// Fingerprint-to-slot index.
pub mod fingerprint;
/// Replacement policies.
pub mod policies;
/// Tag directory.
pub mod tag;

pub use bdi::BdiDataArray;
pub use data::DedupDataArray;
pub use fingerprint::FingerprintIndex;
pub use policies::ReplacementPolicy;
pub use tag::{TagArray, UnlinkOutcome};
