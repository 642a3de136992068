//! Per-request timing records.

use crate::common::LineAddr;
use crate::mem::AccessType;

use super::event::EventId;

/// The causal window and event endpoints of one processed request.
///
/// A record is created fresh while a request resolves, handed to the
/// [`EventRecorder`](super::EventRecorder) when done, and consumed by the
/// caller that spliced this request into its own graph. It never outlives
/// the processing of the enclosing request.
#[derive(Debug, Clone, Copy)]
pub struct TimingRecord {
    /// Line the request targeted.
    pub addr: LineAddr,
    /// Cycle the request arrived.
    pub req_cycle: u64,
    /// Cycle the response became available; never before `req_cycle`.
    pub resp_cycle: u64,
    /// Kind of the request.
    pub kind: AccessType,
    /// First event of the request's DAG.
    pub start: EventId,
    /// Event whose completion makes the response visible.
    pub end: EventId,
}
