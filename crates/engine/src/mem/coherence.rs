//! External collaborator contracts.
//!
//! The bank never arbitrates MESI state or fetches content itself; it drives
//! these two traits:
//! 1. **[`CoherenceController`]:** brackets every access, resolves fills and
//!    evictions, and reports their completion cycles. Calls that recurse into
//!    lower levels may deposit a nested timing record in the recorder passed
//!    alongside.
//! 2. **[`LineSource`]:** supplies the byte content a request refers to,
//!    standing in for the instrumentation layer that snoops real memory.

use crate::common::{LineAddr, TagId};
use crate::timing::EventRecorder;

use super::MemReq;

/// Coherence controller contract consumed by the access engine.
///
/// The engine serializes requests per bank: `start_access` is called exactly
/// once at entry and `end_access` exactly once at exit, with everything else
/// in between. `start_access` returning `true` means the request races with
/// in-flight state and the engine must skip all directory/store mutation.
pub trait CoherenceController {
    /// Brackets the start of an access; may rewrite `req.kind`.
    /// Returns `true` if the access must be skipped.
    fn start_access(&mut self, req: &mut MemReq) -> bool;

    /// True if a missing line should be allocated for this request.
    fn should_allocate(&self, req: &MemReq) -> bool;

    /// Evicts `wb_addr` (held by tag `victim`) starting at `cycle`; returns
    /// the completion cycle, never before `cycle`. May push a timing record.
    fn process_eviction(
        &mut self,
        req: &MemReq,
        wb_addr: LineAddr,
        victim: TagId,
        cycle: u64,
        rec: &mut EventRecorder,
    ) -> u64;

    /// Resolves the access itself (fill on a miss, state upgrade on a hit)
    /// starting at `cycle`; returns the response cycle and writes the cycle
    /// the line data was obtained into `done_cycle`. May push a timing
    /// record.
    fn process_access(
        &mut self,
        req: &MemReq,
        tag: TagId,
        cycle: u64,
        done_cycle: &mut u64,
        rec: &mut EventRecorder,
    ) -> u64;

    /// Brackets the end of an access.
    fn end_access(&mut self, req: &MemReq);
}

/// Source of line content for an address.
pub trait LineSource {
    /// Fills `buf` (one line) with the content at `addr`.
    fn read_line(&self, addr: LineAddr, buf: &mut [u8]);
}
