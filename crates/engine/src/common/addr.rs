//! Line-granular address type.
//!
//! The bank operates on cache-line addresses, not byte addresses. This module
//! defines a strong type so the two spaces cannot be mixed by accident:
//! 1. **Type Safety:** a [`LineAddr`] is always a line number, never a byte offset.
//! 2. **Conversion:** explicit helpers produce the byte range a line covers.

/// A line-granular address: the byte address divided by the line size.
///
/// All requests, tag entries, and writeback notifications carry line
/// addresses. Converting to a byte address requires the bank's line size.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LineAddr(pub u64);

impl LineAddr {
    /// Creates a line address from a raw line number.
    #[inline(always)]
    pub fn new(addr: u64) -> Self {
        Self(addr)
    }

    /// Returns the raw line number.
    #[inline(always)]
    pub fn val(&self) -> u64 {
        self.0
    }

    /// Returns the byte address of the first byte of this line.
    #[inline(always)]
    pub fn byte_addr(&self, line_bytes: usize) -> u64 {
        self.0 * line_bytes as u64
    }

    /// Returns the byte address of the last byte of this line.
    #[inline(always)]
    pub fn last_byte_addr(&self, line_bytes: usize) -> u64 {
        self.byte_addr(line_bytes) + line_bytes as u64 - 1
    }
}

impl std::fmt::Display for LineAddr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}
