//! Content matching: canonicalization, fingerprinting, and compression.
//!
//! Deduplication works on *canonical* content: the bytes a request references
//! after an optional lossy transform for approximate floating-point regions.
//! This module provides:
//! 1. **Canonicalization:** deterministic, idempotent, type-driven transform
//!    ([`approx`]).
//! 2. **Fingerprinting:** a content hash used by the simple variant's
//!    fingerprint index to shortcut full compares.
//! 3. **Compression:** the BDI-style content-to-size mapping used by the
//!    segmented variant ([`compress`]).

/// Approximate-region table and the lossy canonicalizer.
pub mod approx;
/// Base-delta-immediate style compression encodings.
pub mod compress;

pub use approx::{canonicalize, RegionTable};
pub use compress::{compress, BdiEncoding};

use serde::Deserialize;

/// Declared element type of the data in an approximate region.
///
/// Only the floating-point types are transformed; integer regions are
/// declared for bookkeeping but canonicalize to themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    /// 32-bit IEEE-754 floats.
    Float32,
    /// 64-bit IEEE-754 floats.
    Float64,
    /// 32-bit integers (exact; no transform).
    Int32,
    /// 64-bit integers (exact; no transform).
    Int64,
}

/// Computes the content fingerprint used by the simple variant's index.
///
/// FNV-1a over the canonical bytes. Two slots may legitimately share a
/// fingerprint; a hit in the index must be confirmed with a full compare.
pub fn fingerprint(content: &[u8]) -> u64 {
    const OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;
    let mut hash = OFFSET_BASIS;
    for &byte in content {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(PRIME);
    }
    hash
}
