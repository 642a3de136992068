//! Memory request model.
//!
//! This module defines the request vocabulary between the coherence
//! controller and a cache bank:
//! 1. **Access types:** read, exclusive read, and writeback flavors.
//! 2. **Requests:** the per-access envelope ([`MemReq`]).
//! 3. **Collaborator contracts:** the coherence controller and line-content
//!    source traits ([`coherence`]).

/// Coherence controller and line source contracts.
pub mod coherence;

pub use coherence::{CoherenceController, LineSource};

use crate::common::LineAddr;

/// Kind of a memory access reaching the bank.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessType {
    /// Read for shared state.
    GetS,
    /// Read for exclusive state (write intent).
    GetX,
    /// Clean writeback; surrenders a line without new content.
    PutS,
    /// Dirty writeback; carries content that may differ from the stored copy.
    PutX,
}

impl AccessType {
    /// True for demand fetches (the request kinds that refresh recency).
    #[inline]
    pub fn is_demand(self) -> bool {
        matches!(self, Self::GetS | Self::GetX)
    }

    /// Short name for traces and panic messages.
    pub fn name(self) -> &'static str {
        match self {
            Self::GetS => "GETS",
            Self::GetX => "GETX",
            Self::PutS => "PUTS",
            Self::PutX => "PUTX",
        }
    }
}

/// One memory request as the bank sees it.
///
/// The coherence controller may rewrite `kind` during `start_access` when the
/// request races with in-flight state, which is why banks take `&mut MemReq`.
#[derive(Debug, Clone, Copy)]
pub struct MemReq {
    /// Target line.
    pub line_addr: LineAddr,
    /// Access flavor.
    pub kind: AccessType,
    /// Issuing thread/core id; selects the event recorder.
    pub src_id: u32,
    /// Arrival cycle at this bank.
    pub cycle: u64,
}
