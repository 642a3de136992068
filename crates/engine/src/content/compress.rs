//! BDI-style compression: a deterministic content-to-size mapping.
//!
//! The segmented variant never stores compressed bits; it only needs to know
//! how many segments a line would occupy. This module provides that mapping:
//! a base-delta-immediate scheme where a line compresses if all of its
//! fixed-width elements stay within a narrow delta of the first element.
//!
//! Encoded sizes are rounded up to whole segments, bounded by the line size,
//! and identical content always maps to the identical `(encoding, size)`
//! pair. When several encodings yield the same size, a fixed preference
//! order breaks the tie.

use crate::common::SEGMENT_BYTES;

/// Compression encoding assigned to a line.
///
/// `BaseKDeltaD` means the line is viewed as `K`-byte elements, each within
/// a signed `D`-byte delta of the first element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BdiEncoding {
    /// All bytes zero; one segment.
    Zero,
    /// One 8-byte value repeated; one segment.
    Repetitive,
    /// 8-byte elements, 1-byte deltas.
    Base8Delta1,
    /// 8-byte elements, 2-byte deltas.
    Base8Delta2,
    /// 8-byte elements, 4-byte deltas.
    Base8Delta4,
    /// 4-byte elements, 1-byte deltas.
    Base4Delta1,
    /// 4-byte elements, 2-byte deltas.
    Base4Delta2,
    /// 2-byte elements, 1-byte deltas.
    Base2Delta1,
    /// Incompressible; occupies the full line.
    #[default]
    Uncompressed,
}

/// Tie-break order: earlier entries win when encoded sizes are equal.
const PREFERENCE: [BdiEncoding; 8] = [
    BdiEncoding::Zero,
    BdiEncoding::Repetitive,
    BdiEncoding::Base8Delta1,
    BdiEncoding::Base4Delta1,
    BdiEncoding::Base8Delta2,
    BdiEncoding::Base2Delta1,
    BdiEncoding::Base4Delta2,
    BdiEncoding::Base8Delta4,
];

impl BdiEncoding {
    /// Encoded size in bytes for a line of `line_bytes`, rounded up to a
    /// whole number of segments and never larger than the line itself.
    pub fn size_bytes(self, line_bytes: usize) -> u16 {
        let raw = match self {
            Self::Zero | Self::Repetitive => SEGMENT_BYTES,
            Self::Base8Delta1 => 8 + line_bytes / 8,
            Self::Base8Delta2 => 8 + line_bytes / 4,
            Self::Base8Delta4 => 8 + line_bytes / 2,
            Self::Base4Delta1 => 4 + line_bytes / 4,
            Self::Base4Delta2 => 4 + line_bytes / 2,
            Self::Base2Delta1 => 2 + line_bytes / 2,
            Self::Uncompressed => line_bytes,
        };
        let rounded = raw.div_ceil(SEGMENT_BYTES) * SEGMENT_BYTES;
        rounded.min(line_bytes) as u16
    }

    /// Encoded size in whole segments.
    pub fn segments(self, line_bytes: usize) -> u32 {
        u32::from(self.size_bytes(line_bytes)) / SEGMENT_BYTES as u32
    }
}

/// Compresses a line: returns the chosen encoding and its encoded size.
///
/// Deterministic over content. The smallest applicable size wins; equal
/// sizes fall back to the fixed preference order. More-compressible content
/// never yields a larger size than less-compressible content under the same
/// applicable set, and the result is always bounded by the line size.
pub fn compress(content: &[u8]) -> (BdiEncoding, u16) {
    let line_bytes = content.len();
    let mut best = BdiEncoding::Uncompressed;
    let mut best_size = best.size_bytes(line_bytes);
    for enc in PREFERENCE {
        if applies(enc, content) {
            let size = enc.size_bytes(line_bytes);
            if size < best_size {
                best = enc;
                best_size = size;
            }
        }
    }
    (best, best_size)
}

fn applies(enc: BdiEncoding, content: &[u8]) -> bool {
    match enc {
        BdiEncoding::Zero => content.iter().all(|&b| b == 0),
        BdiEncoding::Repetitive => {
            let first = read_le(content, 0, 8);
            (8..content.len())
                .step_by(8)
                .all(|off| read_le(content, off, 8) == first)
        }
        BdiEncoding::Base8Delta1 => deltas_fit(content, 8, 1),
        BdiEncoding::Base8Delta2 => deltas_fit(content, 8, 2),
        BdiEncoding::Base8Delta4 => deltas_fit(content, 8, 4),
        BdiEncoding::Base4Delta1 => deltas_fit(content, 4, 1),
        BdiEncoding::Base4Delta2 => deltas_fit(content, 4, 2),
        BdiEncoding::Base2Delta1 => deltas_fit(content, 2, 1),
        BdiEncoding::Uncompressed => true,
    }
}

/// True if every `elem_bytes`-wide element differs from the first element by
/// a signed delta representable in `delta_bytes` bytes.
fn deltas_fit(content: &[u8], elem_bytes: usize, delta_bytes: usize) -> bool {
    let base = sign_extend(read_le(content, 0, elem_bytes), elem_bytes);
    let bound = 1i64 << (8 * delta_bytes - 1);
    (0..content.len()).step_by(elem_bytes).all(|off| {
        let elem = sign_extend(read_le(content, off, elem_bytes), elem_bytes);
        let delta = elem.wrapping_sub(base);
        delta >= -bound && delta < bound
    })
}

fn read_le(content: &[u8], off: usize, width: usize) -> u64 {
    let mut value = 0u64;
    for i in 0..width {
        value |= u64::from(content[off + i]) << (8 * i);
    }
    value
}

fn sign_extend(value: u64, width: usize) -> i64 {
    if width == 8 {
        value as i64
    } else {
        let shift = 64 - 8 * width as u32;
        ((value << shift) as i64) >> shift
    }
}
