//! Timing-Graph Unit Tests.
//!
//! Verifies schedule resolution, the record handoff protocol, and the
//! splicing rules of `connect` and the miss/hit graph builders.

use dedupsim_core::common::LineAddr;
use dedupsim_core::mem::AccessType;
use dedupsim_core::timing::{
    build_hit_graph, build_miss_graph, connect, EventArena, EventKind, EventRecorder,
    TimingRecord, WritebackSplice,
};
use pretty_assertions::assert_eq;

use crate::common::harness::assert_causal;

// ══════════════════════════════════════════════════════════
// 1. Arena resolution
// ══════════════════════════════════════════════════════════

#[test]
fn a_chain_resolves_in_sequence() {
    let mut arena = EventArena::new();
    let a = arena.alloc(EventKind::MissStart, 5);
    let b = arena.alloc(EventKind::Delay, 2);
    arena.set_min_start_cycle(a, 10);
    let _ = arena.add_child(a, b);

    let resolved = arena.resolve();
    assert_eq!(resolved[a.index()].start, 10);
    assert_eq!(resolved[a.index()].end, 15);
    assert_eq!(resolved[b.index()].start, 15);
    assert_eq!(resolved[b.index()].end, 17);
}

#[test]
fn min_start_cycle_dominates_an_early_parent() {
    let mut arena = EventArena::new();
    let a = arena.alloc(EventKind::MissStart, 1);
    let b = arena.alloc(EventKind::MissResponse, 0);
    arena.set_min_start_cycle(b, 100);
    let _ = arena.add_child(a, b);

    let resolved = arena.resolve();
    assert_eq!(resolved[b.index()].start, 100);
}

#[test]
fn diamond_joins_wait_for_the_slowest_parent() {
    let mut arena = EventArena::new();
    let top = arena.alloc(EventKind::MissStart, 0);
    let fast = arena.alloc(EventKind::Delay, 1);
    let slow = arena.alloc(EventKind::Delay, 9);
    let join = arena.alloc(EventKind::MissResponse, 0);
    let _ = arena.add_child(top, fast);
    let _ = arena.add_child(top, slow);
    let _ = arena.add_child(fast, join);
    let _ = arena.add_child(slow, join);

    let resolved = arena.resolve();
    assert_eq!(resolved[join.index()].start, 9);
    assert_causal(&arena);
}

#[test]
#[should_panic(expected = "cycle")]
fn resolving_a_cyclic_graph_panics() {
    let mut arena = EventArena::new();
    let a = arena.alloc(EventKind::Delay, 1);
    let b = arena.alloc(EventKind::Delay, 1);
    let _ = arena.add_child(a, b);
    let _ = arena.add_child(b, a);
    let _ = arena.resolve();
}

// ══════════════════════════════════════════════════════════
// 2. Recorder handoff
// ══════════════════════════════════════════════════════════

fn dummy_record(rec: &mut EventRecorder, req: u64, resp: u64) -> TimingRecord {
    let ev = rec.alloc(EventKind::Delay, resp - req);
    rec.set_min_start_cycle(ev, req);
    TimingRecord {
        addr: LineAddr(0x40),
        req_cycle: req,
        resp_cycle: resp,
        kind: AccessType::GetS,
        start: ev,
        end: ev,
    }
}

#[test]
fn records_hand_off_one_at_a_time() {
    let mut rec = EventRecorder::new();
    assert!(!rec.has_record());

    let record = dummy_record(&mut rec, 5, 9);
    rec.push_record(record);
    assert!(rec.has_record());

    let popped = rec.pop_record().expect("record pending");
    assert_eq!(popped.resp_cycle, 9);
    assert!(rec.pop_record().is_none());
}

#[test]
#[should_panic(expected = "unconsumed")]
fn pushing_over_a_pending_record_panics() {
    let mut rec = EventRecorder::new();
    let first = dummy_record(&mut rec, 0, 1);
    let second = dummy_record(&mut rec, 2, 3);
    rec.push_record(first);
    rec.push_record(second);
}

// ══════════════════════════════════════════════════════════
// 3. connect
// ══════════════════════════════════════════════════════════

#[test]
fn connect_bridges_a_gap_with_a_delay() {
    let mut rec = EventRecorder::new();
    let s = rec.alloc(EventKind::MissStart, 0);
    let e = rec.alloc(EventKind::MissResponse, 0);
    rec.set_min_start_cycle(s, 10);
    connect(&mut rec, None, s, e, 10, 25);

    let resolved = rec.arena().resolve();
    assert_eq!(resolved[e.index()].start, 25);
    assert_causal(rec.arena());
}

#[test]
fn connect_splices_a_nested_record_with_padding() {
    let mut rec = EventRecorder::new();
    let inner = dummy_record(&mut rec, 12, 15);
    let s = rec.alloc(EventKind::MissStart, 0);
    let e = rec.alloc(EventKind::MissResponse, 0);
    rec.set_min_start_cycle(s, 10);
    connect(&mut rec, Some(&inner), s, e, 10, 20);

    let resolved = rec.arena().resolve();
    assert_eq!(resolved[inner.start.index()].start, 12);
    assert_eq!(resolved[inner.end.index()].end, 15);
    assert_eq!(resolved[e.index()].start, 20);
    assert_causal(rec.arena());
}

#[test]
#[should_panic(expected = "connect: start")]
fn connect_rejects_an_inverted_window() {
    let mut rec = EventRecorder::new();
    let s = rec.alloc(EventKind::MissStart, 0);
    let e = rec.alloc(EventKind::MissResponse, 0);
    connect(&mut rec, None, s, e, 5, 3);
}

#[test]
#[should_panic(expected = "outside window")]
fn connect_rejects_a_record_outside_its_window() {
    let mut rec = EventRecorder::new();
    let inner = dummy_record(&mut rec, 2, 30);
    let s = rec.alloc(EventKind::MissStart, 0);
    let e = rec.alloc(EventKind::MissResponse, 0);
    connect(&mut rec, Some(&inner), s, e, 10, 20);
}

// ══════════════════════════════════════════════════════════
// 4. Graph builders
// ══════════════════════════════════════════════════════════

#[test]
fn miss_graph_orders_response_and_writebacks() {
    let mut rec = EventRecorder::new();
    let splice = WritebackSplice {
        record: None,
        start_cycle: 113,
        end_cycle: 120,
    };
    let (mse, mre) = build_miss_graph(&mut rec, 3, 100, 110, 0, 120, None, None, &[splice]);

    let resolved = rec.arena().resolve();
    assert_eq!(resolved[mse.index()].start, 100);
    assert_eq!(resolved[mre.index()].start, 110);
    assert_causal(rec.arena());
}

#[test]
fn miss_graph_gates_the_writeback_on_the_tag_eviction() {
    let mut rec = EventRecorder::new();
    let tag_wb = dummy_record(&mut rec, 103, 115);
    let (_, mre) = build_miss_graph(&mut rec, 3, 100, 110, 115, 115, None, Some(&tag_wb), &[]);

    let resolved = rec.arena().resolve();
    assert_eq!(resolved[mre.index()].start, 110);
    // Every writeback-side event starts at or after the tag eviction's
    // completion window began.
    assert_causal(rec.arena());
}

#[test]
fn hit_graph_without_writeback_is_one_event() {
    let mut rec = EventRecorder::new();
    let before = rec.arena().len();
    let he = build_hit_graph(&mut rec, 3, 100, 106, None);

    assert_eq!(rec.arena().len(), before + 1);
    let resolved = rec.arena().resolve();
    assert_eq!(resolved[he.index()].start, 100);
    assert_eq!(resolved[he.index()].end, 106);
}

#[test]
fn hit_graph_writeback_waits_for_its_gate() {
    let mut rec = EventRecorder::new();
    let splice = WritebackSplice {
        record: None,
        start_cycle: 106,
        end_cycle: 112,
    };
    let he = build_hit_graph(&mut rec, 3, 100, 106, Some((112, &[splice])));

    let resolved = rec.arena().resolve();
    assert_eq!(resolved[he.index()].end, 106);
    // The hit writeback event is gated on both the hit and its minimum
    // start cycle; with the gate at 112 it cannot start earlier.
    let hwe_start = rec
        .arena()
        .iter()
        .filter(|(_, n)| n.kind == EventKind::HitWriteback)
        .map(|(id, _)| resolved[id.index()].start)
        .next()
        .expect("hit writeback event");
    assert!(hwe_start >= 112);
    assert_causal(rec.arena());
}
