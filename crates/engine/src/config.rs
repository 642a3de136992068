//! Configuration for a deduplicating cache bank.
//!
//! This module defines the configuration structures used to parameterize a
//! bank. It provides:
//! 1. **Defaults:** baseline geometry and latency constants.
//! 2. **Structures:** bank geometry, latencies, and approximate regions.
//! 3. **Validation:** geometry checks performed before a bank is built.
//!
//! Configuration is supplied as JSON (see [`BankConfig::from_json`]) or built
//! directly; `BankConfig::default()` gives a small LLC-like bank.

use serde::Deserialize;

use crate::common::{ConfigError, SEGMENT_BYTES};
use crate::content::DataType;

/// Default configuration constants for a bank.
mod defaults {
    /// Default cache line size in bytes.
    pub const LINE_BYTES: usize = 64;

    /// Default number of tag-directory entries.
    pub const TAG_LINES: usize = 1024;

    /// Default tag-directory associativity.
    pub const TAG_WAYS: usize = 8;

    /// Default number of physical data lines. Fewer data lines than tag
    /// lines is the point of deduplication: several tags share one line.
    pub const DATA_LINES: usize = 512;

    /// Default data-store associativity (segmented variant: segments per
    /// way-row scale with this).
    pub const DATA_WAYS: usize = 8;

    /// Default number of fingerprint-index entries (simple variant only).
    pub const HASH_LINES: usize = 256;

    /// Default fingerprint-index associativity.
    pub const HASH_WAYS: usize = 4;

    /// Default array access latency in cycles.
    pub const ACC_LATENCY: u64 = 9;

    /// Default invalidation latency in cycles.
    pub const INV_LATENCY: u64 = 4;
}

/// Replacement policy selection for the tag directory and data store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplacementPolicyKind {
    /// Least Recently Used.
    #[default]
    Lru,
    /// First In, First Out.
    Fifo,
}

/// One approximate-region descriptor: a byte-address range within which line
/// content is lossily canonicalized before content matching.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RegionConfig {
    /// First byte address covered by the region.
    pub start: u64,
    /// Last byte address covered by the region (inclusive).
    pub end: u64,
    /// Declared element type of the data in the region.
    pub dtype: DataType,
}

/// Geometry and timing of one deduplicating cache bank.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BankConfig {
    /// Human-readable bank name used in traces and panics.
    pub name: String,
    /// Cache line size in bytes; must be a power of two and at least
    /// two segments wide.
    pub line_bytes: usize,
    /// Number of tag-directory entries.
    pub tag_lines: usize,
    /// Tag-directory associativity.
    pub tag_ways: usize,
    /// Number of physical data lines.
    pub data_lines: usize,
    /// Data-store associativity. In the segmented variant this is also the
    /// number of lines' worth of segments in one way-row.
    pub data_ways: usize,
    /// Fingerprint-index entries (simple variant only).
    pub hash_lines: usize,
    /// Fingerprint-index associativity.
    pub hash_ways: usize,
    /// Array access latency in cycles.
    pub acc_latency: u64,
    /// Invalidation latency in cycles.
    pub inv_latency: u64,
    /// Replacement policy used by the tag directory and data store.
    pub policy: ReplacementPolicyKind,
    /// Approximate regions consulted for lossy canonicalization.
    pub regions: Vec<RegionConfig>,
}

impl Default for BankConfig {
    fn default() -> Self {
        Self {
            name: "dedup-bank".to_string(),
            line_bytes: defaults::LINE_BYTES,
            tag_lines: defaults::TAG_LINES,
            tag_ways: defaults::TAG_WAYS,
            data_lines: defaults::DATA_LINES,
            data_ways: defaults::DATA_WAYS,
            hash_lines: defaults::HASH_LINES,
            hash_ways: defaults::HASH_WAYS,
            acc_latency: defaults::ACC_LATENCY,
            inv_latency: defaults::INV_LATENCY,
            policy: ReplacementPolicyKind::default(),
            regions: Vec::new(),
        }
    }
}

impl BankConfig {
    /// Parses a configuration from a JSON document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] on malformed JSON and any geometry
    /// error [`validate`](Self::validate) would report.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that the configured geometry is internally consistent.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] describing the first inconsistency found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.line_bytes.is_power_of_two() || self.line_bytes < 2 * SEGMENT_BYTES {
            return Err(ConfigError::BadLineSize(self.line_bytes));
        }
        for (array, lines, ways) in [
            ("tag", self.tag_lines, self.tag_ways),
            ("data", self.data_lines, self.data_ways),
            ("hash", self.hash_lines, self.hash_ways),
        ] {
            if lines == 0 || ways == 0 {
                return Err(ConfigError::Zero(array));
            }
            if lines % ways != 0 {
                return Err(ConfigError::BadGeometry { array, lines, ways });
            }
        }
        if self.acc_latency == 0 {
            return Err(ConfigError::Zero("acc_latency"));
        }
        for region in &self.regions {
            if region.end < region.start {
                return Err(ConfigError::InvertedRegion {
                    start: region.start,
                    end: region.end,
                });
            }
        }
        Ok(())
    }

    /// Number of segments in one data way-row of the segmented variant.
    pub fn segments_per_row(&self) -> usize {
        self.data_ways * self.line_bytes / SEGMENT_BYTES
    }
}
