//! Configuration error types.
//!
//! Invariant violations during simulation abort the process (a cycle-accurate
//! model cannot meaningfully continue past a causality break), but geometry
//! mistakes in a configuration are ordinary, recoverable errors reported
//! through this type at construction time.

use thiserror::Error;

/// Errors raised while validating a bank configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// The line size must be a power of two and at least two segments wide.
    #[error("line size {0} is not a power of two >= 16 bytes")]
    BadLineSize(usize),

    /// An array size does not divide evenly into sets of `ways` lines.
    #[error("{array}: {lines} lines do not divide into ways of {ways}")]
    BadGeometry {
        /// Which array the geometry belongs to (tag, data, or hash).
        array: &'static str,
        /// Total number of lines configured.
        lines: usize,
        /// Configured associativity.
        ways: usize,
    },

    /// A size field that must be non-zero was zero.
    #[error("{0} must be non-zero")]
    Zero(&'static str),

    /// An approximate region descriptor is inverted (end before start).
    #[error("approximate region ends at {end:#x} before it starts at {start:#x}")]
    InvertedRegion {
        /// First byte address of the region.
        start: u64,
        /// Last byte address of the region.
        end: u64,
    },

    /// The configuration could not be parsed from JSON.
    #[error("malformed configuration: {0}")]
    Parse(String),
}
