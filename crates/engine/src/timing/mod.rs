//! Timing-event graph construction.
//!
//! This module builds the per-request DAG the discrete-event scheduler
//! consumes. It provides:
//! 1. **Arena and nodes:** value-typed events with explicit minimum start
//!    cycles ([`event`]).
//! 2. **Records:** the causal window and endpoints of a finished request
//!    ([`record`]).
//! 3. **Recorder:** arena ownership and the nested-record handoff
//!    ([`recorder`]).
//! 4. **Builders:** [`connect`] for splicing nested records between two
//!    events, and the miss/hit graph shapes shared by both bank variants.
//!
//! The cardinal rule throughout: an event's minimum start cycle is set
//! before edges are added, and no event may be scheduled before the cycle at
//! which its last causal predecessor's effect is visible.

/// Event nodes, arena, and schedule resolution.
pub mod event;
/// Per-request timing records.
pub mod record;
/// Arena owner and nested-record handoff.
pub mod recorder;

pub use event::{EventArena, EventId, EventKind, EventNode, ResolvedEvent};
pub use record::TimingRecord;
pub use recorder::EventRecorder;

/// A writeback discovered while resolving a request: the optional nested
/// record produced by the eviction, and the cycle window it occupied.
#[derive(Debug, Clone, Copy)]
pub struct WritebackSplice {
    /// Sub-graph of the eviction, when the lower level produced one.
    pub record: Option<TimingRecord>,
    /// Cycle the eviction began.
    pub start_cycle: u64,
    /// Cycle the eviction completed; never before `start_cycle`.
    pub end_cycle: u64,
}

/// Ties two events together through an optional nested timing record.
///
/// With a record, its `[req_cycle, resp_cycle]` window must lie within
/// `[start_cycle, end_cycle]`; the gap on either side is filled with explicit
/// delay nodes. Without one, a single delay node (or a direct edge for a
/// zero-length gap) bridges the two events.
///
/// # Panics
///
/// Panics if the cycle windows are inverted or the nested record falls
/// outside the outer window; both are causality violations.
pub fn connect(
    rec: &mut EventRecorder,
    inner: Option<&TimingRecord>,
    start_ev: EventId,
    end_ev: EventId,
    start_cycle: u64,
    end_cycle: u64,
) {
    assert!(
        start_cycle <= end_cycle,
        "connect: start {start_cycle} > end {end_cycle}"
    );
    if let Some(r) = inner {
        assert!(
            start_cycle <= r.req_cycle && r.resp_cycle <= end_cycle,
            "nested record [{}, {}] outside window [{start_cycle}, {end_cycle}]",
            r.req_cycle,
            r.resp_cycle,
        );
        let up_lat = r.req_cycle - start_cycle;
        let down_lat = end_cycle - r.resp_cycle;

        if up_lat > 0 {
            let d_up = rec.alloc(EventKind::Delay, up_lat);
            rec.set_min_start_cycle(d_up, start_cycle);
            let d_up = rec.add_child(start_ev, d_up);
            let _ = rec.add_child(d_up, r.start);
        } else {
            let _ = rec.add_child(start_ev, r.start);
        }

        if down_lat > 0 {
            let d_down = rec.alloc(EventKind::Delay, down_lat);
            rec.set_min_start_cycle(d_down, r.resp_cycle);
            let d_down = rec.add_child(r.end, d_down);
            let _ = rec.add_child(d_down, end_ev);
        } else {
            let _ = rec.add_child(r.end, end_ev);
        }
    } else if start_cycle == end_cycle {
        let _ = rec.add_child(start_ev, end_ev);
    } else {
        let d = rec.alloc(EventKind::Delay, end_cycle - start_cycle);
        rec.set_min_start_cycle(d, start_cycle);
        let d = rec.add_child(start_ev, d);
        let _ = rec.add_child(d, end_ev);
    }
}

/// Builds the miss-path DAG: start and response events bridged by the fill
/// access, a writeback event gated on the tag eviction, and every data
/// eviction spliced in as a sibling hanging off the response event.
///
/// Returns `(start, response)` for the request's own timing record.
#[allow(clippy::too_many_arguments)]
pub fn build_miss_graph(
    rec: &mut EventRecorder,
    acc_lat: u64,
    req_cycle: u64,
    resp_cycle: u64,
    tag_ev_done: u64,
    wb_min_start: u64,
    access: Option<&TimingRecord>,
    tag_writeback: Option<&TimingRecord>,
    writebacks: &[WritebackSplice],
) -> (EventId, EventId) {
    let mse = rec.alloc(EventKind::MissStart, acc_lat);
    let mre = rec.alloc(EventKind::MissResponse, 0);
    let mwe = rec.alloc(EventKind::MissWriteback, acc_lat);

    rec.set_min_start_cycle(mse, req_cycle);
    rec.set_min_start_cycle(mre, resp_cycle);
    rec.set_min_start_cycle(mwe, wb_min_start);

    connect(rec, access, mse, mre, req_cycle + acc_lat, resp_cycle);
    for wb in writebacks {
        let del = rec.alloc(EventKind::Delay, wb.start_cycle - resp_cycle);
        rec.set_min_start_cycle(del, resp_cycle);
        let del = rec.add_child(mre, del);
        connect(rec, wb.record.as_ref(), del, mwe, wb.start_cycle, wb.end_cycle);
    }
    let _ = rec.add_child(mre, mwe);
    if tag_ev_done > 0 {
        connect(
            rec,
            tag_writeback,
            mse,
            mwe,
            req_cycle + acc_lat,
            tag_ev_done,
        );
    }
    (mse, mre)
}

/// Builds the hit-path DAG: a single hit event and, when the hit caused
/// evictions (content-changing writes), a writeback event fed by each
/// eviction splice.
///
/// Returns the hit event, which serves as both start and end of the record.
pub fn build_hit_graph(
    rec: &mut EventRecorder,
    acc_lat: u64,
    req_cycle: u64,
    resp_cycle: u64,
    writeback: Option<(u64, &[WritebackSplice])>,
) -> EventId {
    let he = rec.alloc(EventKind::Hit, resp_cycle - req_cycle);
    rec.set_min_start_cycle(he, req_cycle);
    if let Some((wb_min_start, writebacks)) = writeback {
        let hwe = rec.alloc(EventKind::HitWriteback, resp_cycle - req_cycle);
        rec.set_min_start_cycle(hwe, wb_min_start);
        for wb in writebacks {
            let del = rec.alloc(EventKind::Delay, wb.start_cycle - (req_cycle + acc_lat));
            rec.set_min_start_cycle(del, req_cycle + acc_lat);
            let del = rec.add_child(he, del);
            connect(rec, wb.record.as_ref(), del, hwe, wb.start_cycle, wb.end_cycle);
        }
        let _ = rec.add_child(he, hwe);
    }
    he
}
