//! Approximate regions and the lossy canonicalizer.
//!
//! An approximate region declares that an address range holds error-tolerant
//! data of a known element type. Lines falling *entirely* inside one region
//! are lossily canonicalized before content matching, which raises the
//! deduplication match rate for floating-point data. A line that only
//! partially overlaps a region is treated as exact.
//!
//! The transform itself truncates mantissa bits. Its exact numeric policy is
//! a modeling knob; what the engine relies on is the contract: the transform
//! is deterministic, idempotent, and selected purely by declared type.

use crate::common::LineAddr;
use crate::config::RegionConfig;

use super::DataType;

/// Mantissa bits cleared from each `f32` element.
const F32_DROP_BITS: u32 = 16;
/// Mantissa bits cleared from each `f64` element.
const F64_DROP_BITS: u32 = 32;

/// Ordered table of approximate-region descriptors.
///
/// Consulted once per request. Regions are checked in declaration order and
/// the first fully-containing region wins.
#[derive(Debug, Clone, Default)]
pub struct RegionTable {
    regions: Vec<RegionConfig>,
}

impl RegionTable {
    /// Builds a table from configured region descriptors, preserving order.
    pub fn new(regions: Vec<RegionConfig>) -> Self {
        Self { regions }
    }

    /// Classifies a line: returns the declared type if the line's full byte
    /// range `[first, last]` lies inside a single region, `None` otherwise.
    pub fn classify(&self, addr: LineAddr, line_bytes: usize) -> Option<DataType> {
        let first = addr.byte_addr(line_bytes);
        let last = addr.last_byte_addr(line_bytes);
        self.regions
            .iter()
            .find(|r| first >= r.start && first <= r.end && last >= r.start && last <= r.end)
            .map(|r| r.dtype)
    }

    /// Returns true if no regions are configured.
    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }
}

/// Canonicalizes line content in place for the given declared type.
///
/// Floating-point types have their low mantissa bits cleared element by
/// element; integer types are left untouched. The transform is idempotent:
/// applying it twice yields the same bytes as applying it once.
pub fn canonicalize(content: &mut [u8], dtype: DataType) {
    match dtype {
        DataType::Float32 => truncate_elements::<4>(content, |bits| {
            bits & !((1u64 << F32_DROP_BITS) - 1)
        }),
        DataType::Float64 => truncate_elements::<8>(content, |bits| {
            bits & !((1u64 << F64_DROP_BITS) - 1)
        }),
        DataType::Int32 | DataType::Int64 => {}
    }
}

/// Applies a bit-level transform to each `N`-byte little-endian element.
/// A trailing partial element (line size not a multiple of `N`) is left as-is.
fn truncate_elements<const N: usize>(content: &mut [u8], f: impl Fn(u64) -> u64) {
    for chunk in content.chunks_exact_mut(N) {
        let mut bits = 0u64;
        for (i, &b) in chunk.iter().enumerate() {
            bits |= u64::from(b) << (8 * i);
        }
        let out = f(bits);
        for (i, b) in chunk.iter_mut().enumerate() {
            *b = (out >> (8 * i)) as u8;
        }
    }
}
