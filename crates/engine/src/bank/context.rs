//! Per-run simulation context handed to the access engines.
//!
//! The engines own their arrays but nothing else; everything ambient (the
//! coherence controller, the event recorder of the issuing thread, the
//! approximate-region table, the line-content source, and the optional
//! real-address remap) enters through this context, scoped to one enclosing
//! simulation run.

use std::collections::HashMap;

use crate::common::LineAddr;
use crate::content::RegionTable;
use crate::mem::{CoherenceController, LineSource};
use crate::timing::EventRecorder;

/// Everything an access needs besides the bank's own arrays.
pub struct SimContext<'a> {
    /// Coherence controller bracketing and resolving the access.
    pub cc: &'a mut dyn CoherenceController,
    /// Event recorder of the issuing thread.
    pub recorder: &'a mut EventRecorder,
    /// Approximate-region table, consulted once per request.
    pub regions: &'a RegionTable,
    /// Source of line content.
    pub memory: &'a dyn LineSource,
    /// Optional simulated-to-real address remap, applied before region
    /// classification and content fetch.
    pub real_addrs: Option<&'a HashMap<u64, u64>>,
}

impl SimContext<'_> {
    /// Applies the real-address remap, if one is installed and covers `addr`.
    pub fn resolve_addr(&self, addr: LineAddr) -> LineAddr {
        match self.real_addrs {
            Some(map) => map.get(&addr.val()).map_or(addr, |&a| LineAddr(a)),
            None => addr,
        }
    }

    /// Reads the line content behind `addr` (after remapping).
    pub fn read_line(&self, addr: LineAddr, buf: &mut [u8]) {
        self.memory.read_line(self.resolve_addr(addr), buf);
    }
}

/// Outcome of one attempt to retire a deferred hit writeback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WritebackResume {
    /// A storage port was free; the writeback retired at this cycle.
    Done(u64),
    /// All ports busy; retry at this cycle (one later than the attempt).
    Retry(u64),
}
